#![no_std]

#[cfg(test)]
extern crate std;

pub mod heap;

pub use heap::{FreeStatus, HeapPtr, HeapStats, KernelHeap};
