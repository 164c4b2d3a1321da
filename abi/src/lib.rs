#![no_std]

pub mod arch;
