//! 8259 interrupt controller bridge.
//!
//! The legacy controllers power up delivering IRQs on vectors 8..=15, on
//! top of the CPU exception range. `remap` walks both controllers through
//! the four-word initialization sequence that moves them to 32..=47 and
//! unmasks every line. `end_of_interrupt` is the per-IRQ acknowledgement;
//! without it the controller never raises that line again.

use vesper_abi::arch::x86::idt::IRQ_LINES;
use vesper_abi::arch::x86::ports::{
    PIC1_ICW3_CASCADE, PIC1_VECTOR_OFFSET, PIC2_ICW3_CASCADE, PIC2_VECTOR_OFFSET, PIC_EOI,
    PIC_ICW1_INIT, PIC_ICW4_8086, PIC_MASK_NONE, Port,
};
use vesper_lib::io::PortIo;
use vesper_lib::klog_debug;

/// IRQ lines handled by the slave controller.
const SLAVE_FIRST_LINE: u8 = 8;

fn init_controller<P: PortIo>(
    ports: &mut P,
    command: Port,
    data: Port,
    vector_offset: u8,
    cascade: u8,
) {
    // ICW1 on the command port starts the sequence; the controller then
    // expects ICW2..ICW4 on the data port, one byte each, in order.
    ports.write_byte(command, PIC_ICW1_INIT);
    ports.delay();
    ports.write_byte(data, vector_offset);
    ports.delay();
    ports.write_byte(data, cascade);
    ports.delay();
    ports.write_byte(data, PIC_ICW4_8086);
    ports.delay();
    ports.write_byte(data, PIC_MASK_NONE);
}

/// Reprogram both controllers to deliver IRQs 0..=15 on vectors 32..=47,
/// then unmask every line.
///
/// Interrupts stay disabled at the CPU; enabling them is the caller's last
/// boot step, after a trap table is in place.
pub fn remap<P: PortIo>(ports: &mut P) {
    init_controller(
        ports,
        Port::PIC1_COMMAND,
        Port::PIC1_DATA,
        PIC1_VECTOR_OFFSET,
        PIC1_ICW3_CASCADE,
    );
    init_controller(
        ports,
        Port::PIC2_COMMAND,
        Port::PIC2_DATA,
        PIC2_VECTOR_OFFSET,
        PIC2_ICW3_CASCADE,
    );
    klog_debug!(
        "pic: remapped to vectors {:#04x}/{:#04x}, all lines unmasked",
        PIC1_VECTOR_OFFSET,
        PIC2_VECTOR_OFFSET
    );
}

/// Acknowledge a serviced IRQ.
///
/// Lines 8..=15 arrive through the slave, which must be acknowledged
/// before the master; the master always gets one because it forwarded the
/// cascade. Lines past 15 are acknowledged to the master only, the safe
/// answer for a spurious vector.
pub fn end_of_interrupt<P: PortIo>(ports: &mut P, line: u8) {
    if (SLAVE_FIRST_LINE..IRQ_LINES as u8).contains(&line) {
        ports.write_byte(Port::PIC2_COMMAND, PIC_EOI);
    }
    ports.write_byte(Port::PIC1_COMMAND, PIC_EOI);
}
