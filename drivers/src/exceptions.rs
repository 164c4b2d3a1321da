//! CPU exception reporting.
//!
//! There is no recovery story for faults yet: the handler names the
//! exception, dumps the interrupted state, and parks the CPU. Faulting
//! instructions are never retried.

use vesper_abi::arch::x86::trap::TrapFrame;
use vesper_lib::{cpu, klog_error};

/// Architectural name for an exception vector.
pub fn exception_name(vector: u8) -> &'static str {
    match vector {
        0 => "Division Error",
        1 => "Debug",
        2 => "Non-Maskable Interrupt",
        3 => "Breakpoint",
        4 => "Overflow",
        5 => "Bound Range Exceeded",
        6 => "Invalid Opcode",
        7 => "Device Not Available",
        8 => "Double Fault",
        9 => "Coprocessor Segment Overrun",
        10 => "Invalid TSS",
        11 => "Segment Not Present",
        12 => "Stack-Segment Fault",
        13 => "General Protection Fault",
        14 => "Page Fault",
        16 => "x87 Floating-Point Exception",
        17 => "Alignment Check",
        18 => "Machine Check",
        19 => "SIMD Floating-Point Exception",
        20 => "Virtualization Exception",
        21 => "Control Protection Exception",
        _ => "Reserved",
    }
}

/// Report a fault and park the CPU. Never returns.
pub fn handle(frame: &TrapFrame) -> ! {
    klog_error!(
        "exception: {} (vector {}, error code {:#010x})",
        exception_name(frame.vector as u8),
        frame.vector,
        frame.error_code
    );
    klog_error!(
        "  eip={:#010x} cs={:#06x} eflags={:#010x}",
        frame.eip,
        frame.cs,
        frame.eflags
    );
    klog_error!(
        "  eax={:#010x} ebx={:#010x} ecx={:#010x} edx={:#010x}",
        frame.eax,
        frame.ebx,
        frame.ecx,
        frame.edx
    );
    klog_error!(
        "  esi={:#010x} edi={:#010x} ebp={:#010x} esp={:#010x}",
        frame.esi,
        frame.edi,
        frame.ebp,
        frame.esp
    );
    cpu::halt_loop()
}
