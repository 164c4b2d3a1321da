pub mod idt;
pub mod ports;
pub mod trap;
