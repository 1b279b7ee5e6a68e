//! # Interrupt Handling Module
//!
//! - **descriptor**: bit layout of segment and gate descriptors
//! - **gdt**: flat three-entry segment table
//! - **idt**: 48-vector interrupt table
//! - **pic**: 8259 remapping, masking and EOI
//! - **dispatch**: the common handler every vector funnels into
//!
//! ## Interrupt Vector Layout
//!
//! | Vector | Type                 | Gate      |
//! |--------|----------------------|-----------|
//! | 0      | Divide error         | interrupt |
//! | 1      | Debug                | interrupt |
//! | 2-31   | CPU exceptions       | absent    |
//! | 32     | Timer (IRQ0)         | interrupt |
//! | 33     | Keyboard (IRQ1)      | interrupt |
//! | 34-47  | Remaining IRQs       | absent    |

pub mod descriptor;
pub mod dispatch;
#[cfg(target_arch = "x86")]
pub mod entry;
pub mod gdt;
pub mod idt;
pub mod pic;

/// Vectors that get a gate at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptIndex {
    DivideError,
    Debug,
    Timer,
    Keyboard,
}

impl InterruptIndex {
    pub const BOOT: [InterruptIndex; 4] = [
        InterruptIndex::DivideError,
        InterruptIndex::Debug,
        InterruptIndex::Timer,
        InterruptIndex::Keyboard,
    ];

    /// Vector number, with IRQs placed relative to the PIC's `remap_base`.
    pub const fn vector(self, remap_base: u8) -> u8 {
        match self {
            InterruptIndex::DivideError => 0,
            InterruptIndex::Debug => 1,
            InterruptIndex::Timer => remap_base,
            InterruptIndex::Keyboard => remap_base.wrapping_add(1),
        }
    }

    pub fn from_vector(vector: u32, remap_base: u8) -> Option<Self> {
        Self::BOOT
            .into_iter()
            .find(|index| u32::from(index.vector(remap_base)) == vector)
    }

    pub const fn as_usize(self) -> usize {
        self as usize
    }
}

/// Entry stub addresses for the boot vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerTable([u32; 4]);

impl HandlerTable {
    pub const fn new(divide_error: u32, debug: u32, timer: u32, keyboard: u32) -> Self {
        Self([divide_error, debug, timer, keyboard])
    }

    pub const fn get(&self, index: InterruptIndex) -> u32 {
        self.0[index.as_usize()]
    }
}
