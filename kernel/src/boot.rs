//! Bare-metal entry seam.
//!
//! Everything in here requires real ring-0 x86 hardware: the per-vector
//! trampoline stubs, the static kernel cell, the serial console sink, and
//! the `lidt`/`sti` path. Nothing here is reachable from host builds.

use core::cell::UnsafeCell;

use spin::Mutex;

use vesper_abi::arch::x86::idt::{EXCEPTION_VECTORS, IRQ_LINES, StubTable};
use vesper_abi::arch::x86::ports::Port;
use vesper_abi::arch::x86::trap::TrapFrame;
use vesper_drivers::exceptions;
use vesper_drivers::pit::Pit;
use vesper_drivers::serial::SerialPort;
use vesper_lib::io::HwPorts;
use vesper_lib::{cpu, klog, klog_info};

use crate::{DEFAULT_TIMER_HZ, Kernel};

/// Physical placement of the heap arena: 1 MiB starting at the 16 MiB mark,
/// clear of the kernel image and the legacy low-memory holes.
const HEAP_BASE: usize = 0x0100_0000;
const HEAP_SIZE: usize = 0x0010_0000;

// Per-vector trampolines. Vectors whose bit is set in 0x227D00 (8, 10..=14,
// 17, 21) arrive with a CPU-pushed error code; the rest push a zero so the
// frame layout is uniform. The common tail saves the interrupted register
// state in TrapFrame order, switches to kernel data segments, and hands the
// frame pointer to `vesper_trap_entry`.
core::arch::global_asm!(
    r#"
    .altmacro

    .macro trap_stub vec
        .global vesper_trap_stub_\vec
    vesper_trap_stub_\vec:
        .if ((0x227D00 >> \vec) & 1) == 0
        push 0
        .endif
        push \vec
        jmp vesper_trap_common
    .endm

    .macro trap_stub_ref vec
        .long vesper_trap_stub_\vec
    .endm

    .text
    .set vector, 0
    .rept 48
        trap_stub %vector
        .set vector, vector + 1
    .endr

    vesper_trap_common:
        pusha
        push ds
        mov ax, 0x10
        mov ds, ax
        mov es, ax
        mov fs, ax
        mov gs, ax
        push esp
        call vesper_trap_entry
        add esp, 4
        pop eax
        mov ds, ax
        mov es, ax
        mov fs, ax
        mov gs, ax
        popa
        add esp, 8
        iretd

    .section .rodata
    .global VESPER_TRAP_STUBS
    .balign 4
    VESPER_TRAP_STUBS:
    .set vector, 0
    .rept 48
        trap_stub_ref %vector
        .set vector, vector + 1
    .endr
    .text
    "#,
    options(raw)
);

unsafe extern "C" {
    /// Stub entry addresses emitted by the trampoline block, vectors 0..=47.
    static VESPER_TRAP_STUBS: [u32; EXCEPTION_VECTORS + IRQ_LINES];
}

fn stub_table() -> StubTable {
    let mut exceptions = [0u32; EXCEPTION_VECTORS];
    let mut irqs = [0u32; IRQ_LINES];
    // SAFETY: the symbol is a fully initialized read-only table.
    let stubs = unsafe { &VESPER_TRAP_STUBS };
    exceptions.copy_from_slice(&stubs[..EXCEPTION_VECTORS]);
    irqs.copy_from_slice(&stubs[EXCEPTION_VECTORS..]);
    StubTable::new(exceptions, irqs)
}

/// Home of the one kernel context.
///
/// Interrupt entries need to reach the context from an `extern "C"` path,
/// so it lives in a static cell. Single CPU, and every gate is an interrupt
/// gate (IF clear on entry), so exactly one reference is live at a time.
struct KernelCell {
    cell: UnsafeCell<Option<Kernel<'static, HwPorts>>>,
}

unsafe impl Sync for KernelCell {}

static KERNEL: KernelCell = KernelCell {
    cell: UnsafeCell::new(None),
};

static PIT: Pit = Pit::new();

static CONSOLE: Mutex<SerialPort<HwPorts>> = Mutex::new(SerialPort::new(
    Port::COM1,
    // SAFETY: this module only exists in the ring-0 kernel image.
    unsafe { HwPorts::new() },
));

fn console_sink(byte: u8) {
    CONSOLE.lock().write_byte(byte);
}

#[unsafe(no_mangle)]
extern "C" fn vesper_trap_entry(frame: *mut TrapFrame) {
    // SAFETY: the trampoline passes the frame it just built on this stack.
    let frame = unsafe { &mut *frame };
    if frame.vector < EXCEPTION_VECTORS as u32 {
        exceptions::handle(frame);
    }
    // SAFETY: single CPU and IF is clear, so no other reference is live.
    if let Some(kernel) = unsafe { (*KERNEL.cell.get()).as_mut() } {
        kernel.dispatch_irq(frame);
    }
}

/// Kernel entry: bring up the hardware core and idle.
///
/// Expects the bootloader's flat GDT (code 0x08, data 0x10), protected
/// mode, interrupts disabled.
pub fn start() -> ! {
    CONSOLE.lock().init();
    klog::klog_attach(console_sink);
    klog_info!("vesper: boot");

    let stubs = stub_table();
    // SAFETY: ring-0 entry contract.
    let ports = unsafe { HwPorts::new() };
    // SAFETY: the arena region is identity-mapped RAM reserved for the
    // heap; nothing else references it.
    let arena = unsafe { core::slice::from_raw_parts_mut(HEAP_BASE as *mut u8, HEAP_SIZE) };

    let kernel = Kernel::init(ports, &stubs, &PIT, DEFAULT_TIMER_HZ, arena);
    // SAFETY: interrupts are still disabled; no trap entry can race this.
    unsafe {
        *KERNEL.cell.get() = Some(kernel);
    }

    // SAFETY: the context is in its final home; the borrow really is 'static.
    if let Some(kernel) = unsafe { (*KERNEL.cell.get()).as_ref() } {
        // SAFETY: the table was populated from the trampoline stubs above
        // and will never move out of the static cell.
        unsafe {
            kernel.idt().load();
        }
    }

    klog_info!("vesper: enabling interrupts");
    cpu::enable_interrupts();
    loop {
        cpu::hlt();
    }
}
