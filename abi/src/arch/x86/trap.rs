//! Saved CPU state at interrupt entry.

/// Register snapshot captured by the trap trampolines.
///
/// Field order matches the entry stubs: the stubs push a (possibly zero)
/// error code and the vector number on top of the CPU-pushed interrupt
/// frame, then `pusha` and the data segment. The snapshot is passed by
/// reference to the dispatcher and restored to the CPU on return.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct TrapFrame {
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    /// Vector number that fired.
    pub vector: u32,
    /// CPU-pushed error code; zero for hardware interrupts.
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub user_esp: u32,
    pub ss: u32,
}

impl TrapFrame {
    /// A zeroed frame carrying only a vector number.
    ///
    /// Hardware interrupts have no error code, so this is also the shape a
    /// dispatched IRQ frame takes in tests.
    pub const fn for_vector(vector: u32) -> Self {
        Self {
            ds: 0,
            edi: 0,
            esi: 0,
            ebp: 0,
            esp: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            vector,
            error_code: 0,
            eip: 0,
            cs: 0,
            eflags: 0,
            user_esp: 0,
            ss: 0,
        }
    }
}
