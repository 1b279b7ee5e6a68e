//! Byte-wide x86 port I/O.
//!
//! Everything that talks to the PIC or the PS/2 controller goes through
//! [`PortIo`], so the same driver code runs against real ports on the target
//! and against a recording fake in host tests.

/// Keyboard controller data port.
pub const PS2_DATA: u16 = 0x60;

pub trait PortIo {
    /// Write one byte to `port`.
    ///
    /// # Safety
    /// Writing to an I/O port can have arbitrary side effects on hardware.
    unsafe fn write_u8(&mut self, port: u16, value: u8);

    /// Read one byte from `port`.
    ///
    /// # Safety
    /// Reading some ports consumes device state (e.g. the PS/2 output buffer).
    unsafe fn read_u8(&mut self, port: u16) -> u8;
}

/// Real port access via `in`/`out`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwarePorts;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for HardwarePorts {
    #[inline]
    unsafe fn write_u8(&mut self, port: u16, value: u8) {
        core::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
    }

    #[inline]
    unsafe fn read_u8(&mut self, port: u16) -> u8 {
        let value: u8;
        core::arch::asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
        value
    }
}
