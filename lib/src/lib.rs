#![no_std]

pub mod cpu {
    //! CPU control intrinsics.
    //!
    //! On non-x86 hosts these degrade to hints/no-ops so the rest of the
    //! workspace stays buildable and testable off target.

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    use core::arch::asm;

    /// Low-power wait for the next interrupt.
    #[inline(always)]
    pub fn hlt() {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        core::hint::spin_loop();
    }

    #[inline(always)]
    pub fn pause() {
        core::hint::spin_loop();
    }

    /// Set the interrupt flag. Must not run before the trap table and the
    /// interrupt controllers are programmed.
    #[inline(always)]
    pub fn enable_interrupts() {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        unsafe {
            asm!("sti", options(nomem, nostack));
        }
    }

    #[inline(always)]
    pub fn disable_interrupts() {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
    }

    /// Park the CPU forever.
    #[inline(always)]
    pub fn halt_loop() -> ! {
        loop {
            hlt();
        }
    }
}

pub mod init_flag;
pub mod io;
pub mod klog;
pub mod testing;

pub use init_flag::InitFlag;
pub use io::PortIo;
pub use klog::KlogLevel;

/// Align `value` up to the nearest multiple of `align`.
/// `align` must be a power of two.
#[inline(always)]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Align `value` down to the nearest multiple of `align`.
/// `align` must be a power of two.
#[inline(always)]
pub const fn align_down(value: usize, align: usize) -> usize {
    value & !(align - 1)
}
