//! Interrupt Descriptor Table (IDT) definitions.
//!
//! This module provides the 32-bit gate descriptor layout, the table
//! descriptor handed to `lidt`, gate flag bits, and the vector ranges
//! VesperOS installs at boot.

use bitflags::bitflags;

/// Number of entries in the IDT (256 vectors).
pub const IDT_ENTRIES: usize = 256;

/// CPU exceptions occupy vectors 0..=31.
pub const EXCEPTION_VECTORS: usize = 32;

/// Base vector for hardware IRQs (IRQ0 maps to this vector).
/// Hardware IRQs are remapped to start at vector 32 to avoid conflicts
/// with CPU exceptions (vectors 0-31).
pub const IRQ_BASE_VECTOR: u8 = 32;

/// Number of legacy IRQ lines behind the two cascaded 8259s.
pub const IRQ_LINES: usize = 16;

/// Flat kernel code segment selector (GDT entry 1).
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;

/// Flat kernel data segment selector (GDT entry 2).
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;

bitflags! {
    /// Gate descriptor flags byte.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct GateFlags: u8 {
        /// Segment present.
        const PRESENT = 0x80;
        /// Descriptor privilege level 3 (both bits set).
        const DPL_USER = 0x60;
        /// 32-bit interrupt gate. Clears IF on entry.
        const GATE_INTERRUPT_32 = 0x0E;
        /// 32-bit trap gate. Does not clear IF on entry.
        const GATE_TRAP_32 = 0x0F;
    }
}

impl GateFlags {
    /// Flags for a ring-0 32-bit interrupt gate (0x8E).
    pub const KERNEL_INTERRUPT: Self = Self::PRESENT.union(Self::GATE_INTERRUPT_32);
}

/// x86 (32-bit) IDT gate descriptor.
///
/// Layout must match the hardware-defined format: handler offset split into
/// low/high 16-bit halves around the selector, a reserved byte, and the
/// flags byte.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GateDescriptor {
    pub offset_low: u16,
    pub selector: u16,
    pub reserved: u8,
    pub flags: u8,
    pub offset_high: u16,
}

impl GateDescriptor {
    /// An absent gate: every field zero, present bit clear.
    pub const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            reserved: 0,
            flags: 0,
            offset_high: 0,
        }
    }

    /// Build a gate for `handler` with the given selector and flags.
    pub const fn new(handler: u32, selector: u16, flags: GateFlags) -> Self {
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            reserved: 0,
            flags: flags.bits(),
            offset_high: (handler >> 16) as u16,
        }
    }

    #[inline]
    pub const fn is_present(&self) -> bool {
        self.flags & GateFlags::PRESENT.bits() != 0
    }

    /// Reassemble the handler address from its split halves.
    #[inline]
    pub const fn handler(&self) -> u32 {
        ((self.offset_high as u32) << 16) | self.offset_low as u32
    }
}

/// Descriptor handed to `lidt`: table byte size minus one, plus base address.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug)]
pub struct IdtDescriptor {
    pub limit: u16,
    pub base: u32,
}

/// Entry addresses of the low-level trampoline stubs.
///
/// The boot seam fills this from the addresses of its per-vector assembly
/// stubs; tests substitute synthetic addresses. Either way, `Idt::init`
/// wires vectors 0..=31 to `exceptions` and 32..=47 to `irqs`.
#[derive(Copy, Clone, Debug)]
pub struct StubTable {
    pub exceptions: [u32; EXCEPTION_VECTORS],
    pub irqs: [u32; IRQ_LINES],
}

impl StubTable {
    pub const fn new(exceptions: [u32; EXCEPTION_VECTORS], irqs: [u32; IRQ_LINES]) -> Self {
        Self { exceptions, irqs }
    }
}
