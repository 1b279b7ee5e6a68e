use crate::interrupts::pic::{IrqMask, PIC_1_OFFSET};
use crate::klog::Level;

/// Boot-time interrupt configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// Vector IRQ0 is remapped to. IRQ8 lands eight vectors later.
    pub remap_base: u8,
    /// Lines allowed to signal once boot completes.
    pub irq_mask: IrqMask,
    pub log_level: Level,
}

impl BootConfig {
    /// Remap to 0x20, keyboard only, `Info` logging.
    pub const DEFAULT: Self = Self {
        remap_base: PIC_1_OFFSET,
        irq_mask: IrqMask::KEYBOARD_ONLY,
        log_level: Level::Info,
    };

    /// Also let the timer (IRQ0) through.
    pub const fn with_timer(self) -> Self {
        Self { irq_mask: self.irq_mask.unmask(0), ..self }
    }

    pub const fn with_irq_mask(self, irq_mask: IrqMask) -> Self {
        Self { irq_mask, ..self }
    }

    pub const fn with_log_level(self, log_level: Level) -> Self {
        Self { log_level, ..self }
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
