//! Trap table builder.
//!
//! Owns the 256-entry interrupt descriptor table. Written once at boot:
//! `init` wires the exception and IRQ vector ranges to the low-level
//! trampoline stubs, `load` hands the table to the CPU. There is no runtime
//! error path here; a malformed table manifests as a triple fault long
//! before any error could be reported.

use vesper_abi::arch::x86::idt::{
    EXCEPTION_VECTORS, GateDescriptor, GateFlags, IDT_ENTRIES, IRQ_BASE_VECTOR, IRQ_LINES,
    IdtDescriptor, KERNEL_CODE_SELECTOR, StubTable,
};

#[repr(C, align(8))]
pub struct Idt {
    entries: [GateDescriptor; IDT_ENTRIES],
}

impl Idt {
    /// A table of absent gates.
    pub const fn new() -> Self {
        Self {
            entries: [GateDescriptor::missing(); IDT_ENTRIES],
        }
    }

    /// Write one gate. `vector` is trusted; `u8` makes the range total.
    pub fn set_gate(&mut self, vector: u8, handler: u32, selector: u16, flags: GateFlags) {
        self.entries[vector as usize] = GateDescriptor::new(handler, selector, flags);
    }

    /// Install the boot gates: vectors 0..=31 point at the per-vector
    /// exception stubs, 32..=47 at the IRQ stubs. Every other gate stays
    /// absent so a stray vector faults instead of jumping into nothing.
    pub fn init(&mut self, stubs: &StubTable) {
        for (vector, &stub) in stubs.exceptions.iter().enumerate() {
            self.set_gate(
                vector as u8,
                stub,
                KERNEL_CODE_SELECTOR,
                GateFlags::KERNEL_INTERRUPT,
            );
        }
        for (line, &stub) in stubs.irqs.iter().enumerate() {
            self.set_gate(
                IRQ_BASE_VECTOR + line as u8,
                stub,
                KERNEL_CODE_SELECTOR,
                GateFlags::KERNEL_INTERRUPT,
            );
        }
    }

    pub fn gate(&self, vector: u8) -> &GateDescriptor {
        &self.entries[vector as usize]
    }

    /// Descriptor for the privileged table-load instruction:
    /// {table byte size - 1, base address}.
    pub fn descriptor(&self) -> IdtDescriptor {
        IdtDescriptor {
            limit: (core::mem::size_of::<[GateDescriptor; IDT_ENTRIES]>() - 1) as u16,
            base: self.entries.as_ptr() as usize as u32,
        }
    }

    /// Load the table into the CPU.
    ///
    /// # Safety
    /// The stub addresses installed by `init` must be valid code, and the
    /// table must never move or be mutated afterwards (`&'static self`
    /// enforces both for safe callers).
    #[cfg(target_arch = "x86")]
    pub unsafe fn load(&'static self) {
        let descriptor = self.descriptor();
        unsafe {
            core::arch::asm!(
                "lidt [{0}]",
                in(reg) &descriptor,
                options(readonly, nostack, preserves_flags)
            );
        }
    }
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of vectors `init` populates (exceptions plus IRQ lines).
pub const INSTALLED_VECTORS: usize = EXCEPTION_VECTORS + IRQ_LINES;

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_stubs() -> StubTable {
        let mut exceptions = [0u32; EXCEPTION_VECTORS];
        let mut irqs = [0u32; IRQ_LINES];
        for (i, stub) in exceptions.iter_mut().enumerate() {
            *stub = 0x0010_0000 + (i as u32) * 16;
        }
        for (i, stub) in irqs.iter_mut().enumerate() {
            *stub = 0x0020_0000 + (i as u32) * 16;
        }
        StubTable::new(exceptions, irqs)
    }

    #[test]
    fn init_populates_exactly_the_trampoline_ranges() {
        let mut idt = Idt::new();
        idt.init(&synthetic_stubs());

        for vector in 0..=255u8 {
            let gate = idt.gate(vector);
            if (vector as usize) < INSTALLED_VECTORS {
                assert!(gate.is_present(), "vector {vector} should be present");
            } else {
                assert!(!gate.is_present(), "vector {vector} should be absent");
            }
        }
    }

    #[test]
    fn gates_split_the_handler_address() {
        let mut idt = Idt::new();
        idt.set_gate(0x40, 0xDEAD_BEEF, 0x08, GateFlags::KERNEL_INTERRUPT);
        let gate = idt.gate(0x40);
        assert_eq!(gate.offset_low, 0xBEEF);
        assert_eq!(gate.offset_high, 0xDEAD);
        assert_eq!(gate.selector, 0x08);
        assert_eq!(gate.reserved, 0);
        assert_eq!(gate.flags, 0x8E);
        assert_eq!(gate.handler(), 0xDEAD_BEEF);
    }

    #[test]
    fn init_wires_each_vector_to_its_own_stub() {
        let stubs = synthetic_stubs();
        let mut idt = Idt::new();
        idt.init(&stubs);
        assert_eq!(idt.gate(0).handler(), stubs.exceptions[0]);
        assert_eq!(idt.gate(31).handler(), stubs.exceptions[31]);
        assert_eq!(idt.gate(32).handler(), stubs.irqs[0]);
        assert_eq!(idt.gate(47).handler(), stubs.irqs[15]);
    }

    #[test]
    fn descriptor_reports_byte_size_minus_one() {
        let idt = Idt::new();
        let limit = idt.descriptor().limit;
        assert_eq!(limit, 256 * 8 - 1);
    }
}
