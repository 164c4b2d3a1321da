//! Kernel context.
//!
//! One object owns every boot-time structure: the port I/O capability, the
//! trap table, the IRQ routing table, the timer, and the heap. Boot is a
//! single `Kernel::init` call that brings them up in dependency order;
//! everything after boot flows through this context instead of global
//! state.

#![no_std]

#[cfg(test)]
extern crate std;

#[cfg(target_arch = "x86")]
pub mod boot;

use vesper_abi::arch::x86::idt::StubTable;
use vesper_abi::arch::x86::ports::PIT_IRQ_LINE;
use vesper_abi::arch::x86::trap::TrapFrame;
use vesper_drivers::idt::Idt;
use vesper_drivers::irq::{IrqDispatcher, IrqHandler};
use vesper_drivers::pic;
use vesper_drivers::pit::Pit;
use vesper_lib::io::PortIo;
use vesper_lib::klog_info;
use vesper_mm::KernelHeap;

/// Default timer tick rate.
pub const DEFAULT_TIMER_HZ: u32 = 100;

pub struct Kernel<'a, P: PortIo> {
    ports: P,
    idt: Idt,
    irq: IrqDispatcher<'a>,
    pit: &'a Pit,
    heap: KernelHeap<'a>,
}

impl<'a, P: PortIo> Kernel<'a, P> {
    /// Bring up the hardware core.
    ///
    /// Order matters and matches the dependency chain: the trap table must
    /// exist before the controllers can deliver anything, the controllers
    /// must be remapped before the timer's line means what we think it
    /// means, and the heap comes last because nothing before it allocates.
    ///
    /// Interrupts are NOT enabled here. On real hardware the caller loads
    /// the IDT and issues `sti` as its final step; on a host this whole
    /// sequence runs against fake ports.
    pub fn init(
        mut ports: P,
        stubs: &StubTable,
        pit: &'a Pit,
        frequency_hz: u32,
        arena: &'a mut [u8],
    ) -> Self {
        let mut idt = Idt::new();
        idt.init(stubs);
        klog_info!("kernel: trap table ready");

        pic::remap(&mut ports);
        klog_info!("kernel: interrupt controllers remapped");

        let mut irq = IrqDispatcher::new();
        pit.init(frequency_hz, &mut ports);
        irq.install_handler(PIT_IRQ_LINE, pit);

        let mut heap = KernelHeap::new(arena);
        heap.init();
        let stats = heap.stats();
        klog_info!("kernel: heap ready, {} bytes", stats.total_bytes);

        Self {
            ports,
            idt,
            irq,
            pit,
            heap,
        }
    }

    /// Route one hardware interrupt frame and acknowledge the controller.
    pub fn dispatch_irq(&mut self, frame: &mut TrapFrame) {
        self.irq.dispatch(frame, &mut self.ports);
    }

    pub fn install_handler(&mut self, line: u8, handler: &'a dyn IrqHandler) {
        self.irq.install_handler(line, handler);
    }

    pub fn idt(&self) -> &Idt {
        &self.idt
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn pit(&self) -> &'a Pit {
        self.pit
    }

    pub fn heap(&mut self) -> &mut KernelHeap<'a> {
        &mut self.heap
    }
}
