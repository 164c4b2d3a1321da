//! Port I/O capability.
//!
//! Every hardware-touching component takes a `PortIo` value instead of
//! issuing IN/OUT directly, so the exact byte sequences written to the
//! interrupt controllers, the timer, and the UART can be asserted against a
//! recording fake (see [`crate::testing::RecordingPorts`]). The real
//! implementation, [`HwPorts`], is a zero-sized wrapper over the IN/OUT
//! instructions and only exists on x86 targets.

use vesper_abi::arch::x86::ports::Port;

/// Byte-wide port access capability.
pub trait PortIo {
    fn read_byte(&mut self, port: Port) -> u8;
    fn write_byte(&mut self, port: Port, value: u8);

    /// ~1us delay via a write to the POST diagnostic port. Some controllers
    /// need settle time between initialization command words.
    fn delay(&mut self) {
        self.write_byte(Port::POST_DELAY, 0);
    }
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    #[inline]
    fn read_byte(&mut self, port: Port) -> u8 {
        (**self).read_byte(port)
    }

    #[inline]
    fn write_byte(&mut self, port: Port, value: u8) {
        (**self).write_byte(port, value)
    }
}

/// Real port I/O over the IN/OUT instructions.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Debug)]
pub struct HwPorts(());

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl HwPorts {
    /// # Safety
    /// The caller asserts ring-0 execution; port I/O has arbitrary side
    /// effects on hardware state.
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for HwPorts {
    #[inline(always)]
    fn read_byte(&mut self, port: Port) -> u8 {
        let value: u8;
        // SAFETY: constructing HwPorts asserted ring-0 execution.
        unsafe {
            core::arch::asm!(
                "in al, dx",
                out("al") value,
                in("dx") port.number(),
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    #[inline(always)]
    fn write_byte(&mut self, port: Port, value: u8) {
        // SAFETY: constructing HwPorts asserted ring-0 execution.
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port.number(),
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}
