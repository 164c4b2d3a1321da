#![no_std]

#[cfg(test)]
extern crate std;

pub mod exceptions;
pub mod idt;
pub mod irq;
pub mod pic;
pub mod pit;
pub mod serial;
