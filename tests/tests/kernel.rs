//! Full-boot integration tests: one `Kernel::init` against recording fake
//! ports, then assertions over everything the boot sequence is contracted
//! to produce.

use vesper_abi::arch::x86::idt::{EXCEPTION_VECTORS, IRQ_LINES, StubTable};
use vesper_abi::arch::x86::ports::{PIC_EOI, Port};
use vesper_abi::arch::x86::trap::TrapFrame;
use vesper_drivers::irq::IrqHandler;
use vesper_drivers::pit::Pit;
use vesper_kernel::{DEFAULT_TIMER_HZ, Kernel};
use vesper_lib::testing::RecordingPorts;
use vesper_mm::FreeStatus;

fn synthetic_stubs() -> StubTable {
    let mut exceptions = [0u32; EXCEPTION_VECTORS];
    let mut irqs = [0u32; IRQ_LINES];
    for (i, stub) in exceptions.iter_mut().enumerate() {
        *stub = 0x0010_0000 + (i as u32) * 8;
    }
    for (i, stub) in irqs.iter_mut().enumerate() {
        *stub = 0x0011_0000 + (i as u32) * 8;
    }
    StubTable::new(exceptions, irqs)
}

fn boot<'a>(arena: &'a mut [u8], pit: &'a Pit) -> Kernel<'a, RecordingPorts> {
    Kernel::init(
        RecordingPorts::new(),
        &synthetic_stubs(),
        pit,
        DEFAULT_TIMER_HZ,
        arena,
    )
}

#[test]
fn boot_populates_the_trap_table() {
    let pit = Pit::new();
    let mut arena = [0u8; 512];
    let kernel = boot(&mut arena, &pit);

    for vector in 0..=255u8 {
        let present = kernel.idt().gate(vector).is_present();
        assert_eq!(present, (vector as usize) < EXCEPTION_VECTORS + IRQ_LINES);
    }
    assert_eq!(kernel.idt().gate(0).handler(), 0x0010_0000);
    assert_eq!(kernel.idt().gate(47).handler(), 0x0011_0000 + 15 * 8);
}

#[test]
fn boot_emits_both_pic_sequences_and_the_pit_program() {
    let pit = Pit::new();
    let mut arena = [0u8; 512];
    let mut kernel = boot(&mut arena, &pit);

    let writes: Vec<(u16, u8)> = {
        let mut frame = TrapFrame::for_vector(32);
        kernel.dispatch_irq(&mut frame);
        // Everything written from init plus one EOI.
        kernel_writes(&kernel)
    };

    let master_data: Vec<u8> = filter_port(&writes, Port::PIC1_DATA);
    assert_eq!(master_data, [0x20, 0x04, 0x01, 0x00]);
    let slave_data: Vec<u8> = filter_port(&writes, Port::PIC2_DATA);
    assert_eq!(slave_data, [0x28, 0x02, 0x01, 0x00]);

    // 1_193_180 / 100 = 11931 = 0x2E9B, low byte first.
    let pit_data: Vec<u8> = filter_port(&writes, Port::PIT_CHANNEL0);
    assert_eq!(pit_data, [0x9B, 0x2E]);
    let pit_command: Vec<u8> = filter_port(&writes, Port::PIT_COMMAND);
    assert_eq!(pit_command, [0x36]);

    // The dispatched tick ended with a master EOI.
    let master_command: Vec<u8> = filter_port(&writes, Port::PIC1_COMMAND);
    assert_eq!(master_command.first(), Some(&0x11));
    assert_eq!(master_command.last(), Some(&PIC_EOI));
}

#[test]
fn timer_counts_dispatched_frames_and_reports_uptime() {
    let pit = Pit::new();
    let mut arena = [0u8; 512];
    let mut kernel = boot(&mut arena, &pit);

    for _ in 0..(DEFAULT_TIMER_HZ * 3) {
        let mut frame = TrapFrame::for_vector(32);
        kernel.dispatch_irq(&mut frame);
    }
    assert_eq!(kernel.pit().get_ticks(), u64::from(DEFAULT_TIMER_HZ) * 3);
    assert_eq!(kernel.pit().get_seconds(), 3);
}

#[test]
fn non_timer_lines_do_not_advance_the_clock() {
    let pit = Pit::new();
    let mut arena = [0u8; 512];
    let mut kernel = boot(&mut arena, &pit);

    let mut frame = TrapFrame::for_vector(33);
    kernel.dispatch_irq(&mut frame);
    assert_eq!(kernel.pit().get_ticks(), 0);
}

#[test]
fn heap_survives_a_boot_and_tracks_allocations() {
    let pit = Pit::new();
    let mut arena = [0u8; 512];
    let mut kernel = boot(&mut arena, &pit);

    let heap = kernel.heap();
    assert_eq!(heap.stats().total_bytes, 512);

    let a = heap.alloc(64).expect("arena has room");
    heap.payload_mut(a).expect("live block").fill(0x5A);
    assert_eq!(heap.free(a), FreeStatus::Freed);
    assert_eq!(heap.stats().used_bytes, 0);
}

#[test]
fn a_late_handler_can_share_a_line_boot_installed() {
    struct Spy(core::sync::atomic::AtomicUsize);
    impl IrqHandler for Spy {
        fn handle(&self, _frame: &mut TrapFrame) {
            self.0.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
        }
    }

    let pit = Pit::new();
    let spy = Spy(core::sync::atomic::AtomicUsize::new(0));
    let mut arena = [0u8; 512];
    let mut kernel = boot(&mut arena, &pit);

    kernel.install_handler(1, &spy);
    let mut frame = TrapFrame::for_vector(33);
    kernel.dispatch_irq(&mut frame);
    assert_eq!(spy.0.load(core::sync::atomic::Ordering::Relaxed), 1);
}

fn kernel_writes(kernel: &Kernel<'_, RecordingPorts>) -> Vec<(u16, u8)> {
    kernel.ports().writes().to_vec()
}

fn filter_port(writes: &[(u16, u8)], port: Port) -> Vec<u8> {
    writes
        .iter()
        .filter(|(p, _)| *p == port.number())
        .map(|(_, v)| *v)
        .collect()
}
