//! Atomic initialization flags for kernel subsystems.
//!
//! `InitFlag` is the canonical way to implement init-once semantics in
//! VesperOS: the arena allocator, the trap table, and the boot seam each
//! transition uninitialized -> initialized exactly once and never back.

use core::sync::atomic::{AtomicBool, Ordering};

/// Atomic flag for tracking initialization state.
#[repr(transparent)]
pub struct InitFlag {
    flag: AtomicBool,
}

impl InitFlag {
    /// Create a new unset flag.
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Atomically attempt to initialize.
    ///
    /// Returns `true` if this call performed the initialization (flag was
    /// previously unset). Returns `false` if already initialized.
    ///
    /// Uses `SeqCst` ordering so the transition is globally visible.
    #[inline]
    pub fn init_once(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Check if the flag is set.
    ///
    /// `Acquire` ordering: side effects published before the matching
    /// `init_once`/`mark_set` are visible after this returns `true`.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Check if the flag is set (relaxed ordering), for logging guards and
    /// early-exit fast paths.
    #[inline]
    pub fn is_set_relaxed(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Explicitly set the flag, publishing prior initialization side effects.
    #[inline]
    pub fn mark_set(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl Default for InitFlag {
    fn default() -> Self {
        Self::new()
    }
}
