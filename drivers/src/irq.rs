//! Hardware IRQ dispatch.
//!
//! The trampoline stubs funnel every remapped vector into a single entry
//! point; this module routes it to the handler registered for the line and
//! acknowledges the interrupt controller afterwards. One handler slot per
//! line, no chaining.

use vesper_abi::arch::x86::idt::{IRQ_BASE_VECTOR, IRQ_LINES};
use vesper_abi::arch::x86::trap::TrapFrame;
use vesper_lib::io::PortIo;
use vesper_lib::{klog_trace, klog_warn};

use crate::pic;

/// A hardware interrupt handler.
///
/// Runs with interrupts disabled, before the controller is acknowledged.
/// Implementations must not block, allocate, or install handlers; update
/// state and return.
pub trait IrqHandler: Sync {
    fn handle(&self, frame: &mut TrapFrame);
}

/// Routing table for the 16 legacy IRQ lines.
pub struct IrqDispatcher<'a> {
    lines: [Option<&'a dyn IrqHandler>; IRQ_LINES],
}

impl<'a> IrqDispatcher<'a> {
    pub const fn new() -> Self {
        Self {
            lines: [None; IRQ_LINES],
        }
    }

    /// Register `handler` for `line`, replacing any previous registration.
    /// Lines past 15 do not exist; the request is logged and dropped.
    pub fn install_handler(&mut self, line: u8, handler: &'a dyn IrqHandler) {
        let Some(slot) = self.lines.get_mut(line as usize) else {
            klog_warn!("irq: ignoring handler install for invalid line {line}");
            return;
        };
        *slot = Some(handler);
    }

    pub fn handler_installed(&self, line: u8) -> bool {
        matches!(self.lines.get(line as usize), Some(Some(_)))
    }

    /// Service one hardware interrupt.
    ///
    /// The frame's vector is translated to an IRQ line. Exception vectors
    /// are not ours and are logged and dropped without an EOI; vectors past
    /// the remapped window still get an EOI so the controller is never left
    /// waiting. A line with no handler is acknowledged silently.
    pub fn dispatch<P: PortIo>(&self, frame: &mut TrapFrame, ports: &mut P) {
        let Some(line) = frame.vector.checked_sub(IRQ_BASE_VECTOR as u32) else {
            klog_warn!(
                "irq: exception vector {} reached the irq path, dropping",
                frame.vector
            );
            return;
        };
        if line >= IRQ_LINES as u32 {
            klog_warn!("irq: vector {} is outside the remapped window", frame.vector);
            pic::end_of_interrupt(ports, line as u8);
            return;
        }
        if let Some(handler) = self.lines[line as usize] {
            handler.handle(frame);
        } else {
            klog_trace!("irq: no handler for line {line}");
        }
        pic::end_of_interrupt(ports, line as u8);
    }
}

impl Default for IrqDispatcher<'_> {
    fn default() -> Self {
        Self::new()
    }
}
