//! Interrupt bring-up for a 32-bit x86 kernel.
//!
//! Builds a flat segment table and a 48-vector interrupt table, remaps the
//! chained 8259 PICs above the CPU exceptions, and routes every vector into a
//! single dispatcher that reports the vector, services the keyboard and
//! acknowledges hardware interrupts.

#![cfg_attr(not(test), no_std)]

pub mod klog;

pub mod cpu;
pub mod drivers;
pub mod error;
pub mod interrupts;
pub mod kernel;
pub mod ports;

#[cfg(test)]
mod test_support;

pub use error::{BootError, PicError, TableError};
pub use kernel::{init_interrupts, BootConfig};
