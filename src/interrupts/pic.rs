//! # Programmable Interrupt Controller (8259 PIC)
//!
//! Reprograms the two cascaded legacy 8259 chips so hardware IRQs land above
//! the CPU exception vectors.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   PIC 1     │◀────│   PIC 2     │
//! │  (Master)   │ IR2 │  (Slave)    │
//! │ IRQ 0-7     │     │ IRQ 8-15    │
//! └─────────────┘     └─────────────┘
//!       │
//!       ▼
//!      CPU
//! ```
//!
//! ## Vector Remapping
//!
//! | Controller | IRQs | Vectors (default) |
//! |------------|------|-------------------|
//! | Master     | 0-7  | 0x20-0x27         |
//! | Slave      | 8-15 | 0x28-0x2F         |
//!
//! The ICW sequence must run to completion on both chips before any mask is
//! written; [`ChainedPics::write_masks`] refuses to run earlier.

use spin::Mutex;

use crate::error::PicError;
use crate::ports::PortIo;

pub const PIC_1_OFFSET: u8 = 0x20;
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

/// Edge triggered, cascaded, ICW4 follows.
const ICW1_INIT: u8 = 0x11;
/// Slave hangs off the master's IR2.
const ICW3_MASTER: u8 = 1 << 2;
/// Slave cascade identity.
const ICW3_SLAVE: u8 = 2;
/// 8086 mode, master.
const ICW4_MASTER: u8 = 0x05;
/// 8086 mode.
const ICW4_SLAVE: u8 = 0x01;

pub const PIC_EOI: u8 = 0x20;

/// Number of IRQ lines across both chips.
pub const IRQ_LINES: u8 = 16;

/// One mask byte per chip; a set bit silences that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqMask {
    pub master: u8,
    pub slave: u8,
}

impl IrqMask {
    pub const ALL_MASKED: Self = Self { master: 0xFF, slave: 0xFF };

    /// Only the keyboard (IRQ1) may signal.
    pub const KEYBOARD_ONLY: Self = Self::ALL_MASKED.unmask(1);

    /// Lines past IRQ15 do not exist and leave the mask unchanged.
    pub const fn unmask(self, line: u8) -> Self {
        if line < 8 {
            Self { master: self.master & !(1 << line), slave: self.slave }
        } else if line < IRQ_LINES {
            Self { master: self.master, slave: self.slave & !(1 << (line - 8)) }
        } else {
            self
        }
    }

    pub const fn is_unmasked(self, line: u8) -> bool {
        if line < 8 {
            self.master & (1 << line) == 0
        } else if line < IRQ_LINES {
            self.slave & (1 << (line - 8)) == 0
        } else {
            false
        }
    }

    /// Lines that would be allowed to signal, lowest first.
    pub fn unmasked_lines(self) -> impl Iterator<Item = u8> {
        (0..IRQ_LINES).filter(move |&line| self.is_unmasked(line))
    }
}

#[derive(Debug, Clone, Copy)]
struct Pic {
    offset: u8,
    command: u16,
    data: u16,
}

impl Pic {
    const fn handles_interrupt(&self, vector: u32) -> bool {
        self.offset as u32 <= vector && vector < self.offset as u32 + 8
    }

    unsafe fn end_of_interrupt<P: PortIo>(&self, ports: &mut P) {
        ports.write_u8(self.command, PIC_EOI);
    }

    unsafe fn read_mask<P: PortIo>(&self, ports: &mut P) -> u8 {
        ports.read_u8(self.data)
    }

    unsafe fn write_mask<P: PortIo>(&self, ports: &mut P, mask: u8) {
        ports.write_u8(self.data, mask)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PicState {
    Uninitialized,
    Initialized,
}

/// The master/slave pair.
#[derive(Debug)]
pub struct ChainedPics {
    pics: [Pic; 2],
    state: PicState,
}

/// The interrupt path locks this too, so it must only be locked with
/// interrupts disabled.
pub(crate) static PICS: Mutex<ChainedPics> = Mutex::new(ChainedPics::remapped());

impl ChainedPics {
    /// Pair remapped to [`PIC_1_OFFSET`]/[`PIC_2_OFFSET`].
    pub const fn remapped() -> Self {
        Self::with_offset(PIC_1_OFFSET)
    }

    /// Pair remapped so IRQ0 arrives at `master_offset` and IRQ8 eight
    /// vectors later.
    pub const fn new(master_offset: u8) -> Result<Self, PicError> {
        if master_offset % 8 != 0 {
            return Err(PicError::MisalignedBase(master_offset));
        }
        if master_offset < 0x20 {
            return Err(PicError::BaseOverlapsExceptions(master_offset));
        }
        if master_offset > u8::MAX - (IRQ_LINES - 1) {
            return Err(PicError::BaseTooHigh(master_offset));
        }
        Ok(Self::with_offset(master_offset))
    }

    const fn with_offset(master_offset: u8) -> Self {
        Self {
            pics: [
                Pic { offset: master_offset, command: PIC1_COMMAND, data: PIC1_DATA },
                Pic { offset: master_offset + 8, command: PIC2_COMMAND, data: PIC2_DATA },
            ],
            state: PicState::Uninitialized,
        }
    }

    /// Every vector either chip can raise must have a slot in a table of
    /// `entries` gates.
    pub const fn fits_table(&self, entries: usize) -> Result<(), PicError> {
        if self.master_offset() as usize + IRQ_LINES as usize > entries {
            return Err(PicError::BaseBeyondTable(self.master_offset()));
        }
        Ok(())
    }

    pub const fn master_offset(&self) -> u8 {
        self.pics[0].offset
    }

    pub const fn slave_offset(&self) -> u8 {
        self.pics[1].offset
    }

    pub fn is_initialized(&self) -> bool {
        self.state == PicState::Initialized
    }

    /// Run ICW1..ICW4 on both chips. Masks are left for [`Self::write_masks`].
    ///
    /// # Safety
    /// Reprograms interrupt routing; interrupts must be disabled.
    pub unsafe fn initialize<P: PortIo>(&mut self, ports: &mut P) {
        let [master, slave] = self.pics;

        // ICW1
        ports.write_u8(master.command, ICW1_INIT);
        ports.write_u8(slave.command, ICW1_INIT);

        // ICW2
        ports.write_u8(master.data, master.offset);
        ports.write_u8(slave.data, slave.offset);

        // ICW3
        ports.write_u8(master.data, ICW3_MASTER);
        ports.write_u8(slave.data, ICW3_SLAVE);

        // ICW4
        ports.write_u8(master.data, ICW4_MASTER);
        ports.write_u8(slave.data, ICW4_SLAVE);

        self.state = PicState::Initialized;
    }

    /// # Safety
    /// Unmasking a line whose vector has no gate faults on the next IRQ.
    pub unsafe fn write_masks<P: PortIo>(&mut self, ports: &mut P, mask: IrqMask) -> Result<(), PicError> {
        if self.state != PicState::Initialized {
            return Err(PicError::NotInitialized);
        }
        self.pics[0].write_mask(ports, mask.master);
        self.pics[1].write_mask(ports, mask.slave);
        Ok(())
    }

    /// # Safety
    /// Reads controller registers.
    pub unsafe fn read_masks<P: PortIo>(&self, ports: &mut P) -> IrqMask {
        IrqMask { master: self.pics[0].read_mask(ports), slave: self.pics[1].read_mask(ports) }
    }

    /// True for every vector either chip can raise.
    pub fn handles_interrupt(&self, vector: u32) -> bool {
        self.pics.iter().any(|p| p.handles_interrupt(vector))
    }

    /// IRQ line behind `vector`, if it is one of ours.
    pub fn irq_line(&self, vector: u32) -> Option<u8> {
        if self.handles_interrupt(vector) {
            Some((vector - u32::from(self.master_offset())) as u8)
        } else {
            None
        }
    }

    /// Acknowledge the interrupt being serviced on both chips.
    ///
    /// # Safety
    /// Call exactly once per serviced hardware interrupt, after handling.
    pub unsafe fn notify_end_of_interrupt<P: PortIo>(&self, ports: &mut P) {
        self.pics[0].end_of_interrupt(ports);
        self.pics[1].end_of_interrupt(ports);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PortOp, RecordingPorts};

    #[test]
    fn default_bases_are_cascade_aligned() {
        let pics = ChainedPics::remapped();
        assert_eq!(pics.master_offset(), 0x20);
        assert_eq!(pics.slave_offset(), 0x28);
        assert_eq!(pics.slave_offset() - pics.master_offset(), 8);
        assert_eq!(pics.master_offset() % 8, 0);
        assert_eq!(pics.slave_offset() % 8, 0);
    }

    #[test]
    fn new_rejects_bad_bases() {
        assert_eq!(ChainedPics::new(0x24).err(), Some(PicError::MisalignedBase(0x24)));
        assert_eq!(ChainedPics::new(0x08).err(), Some(PicError::BaseOverlapsExceptions(0x08)));
        assert_eq!(ChainedPics::new(0xF8).err(), Some(PicError::BaseTooHigh(0xF8)));

        let pics = ChainedPics::new(0xF0).expect("highest usable base");
        assert_eq!(pics.slave_offset(), 0xF8);
    }

    #[test]
    fn initialize_writes_icw_sequence_in_order() {
        let mut pics = ChainedPics::remapped();
        let mut ports = RecordingPorts::default();
        unsafe { pics.initialize(&mut ports) };

        assert_eq!(
            ports.writes(),
            vec![
                (0x20, 0x11),
                (0xA0, 0x11),
                (0x21, 0x20),
                (0xA1, 0x28),
                (0x21, 0x04),
                (0xA1, 0x02),
                (0x21, 0x05),
                (0xA1, 0x01),
            ]
        );
        assert!(pics.is_initialized());
    }

    #[test]
    fn masks_follow_initialization() {
        let mut pics = ChainedPics::remapped();
        let mut ports = RecordingPorts::default();

        assert_eq!(
            unsafe { pics.write_masks(&mut ports, IrqMask::KEYBOARD_ONLY) },
            Err(PicError::NotInitialized)
        );
        assert!(ports.ops.is_empty());

        unsafe {
            pics.initialize(&mut ports);
            pics.write_masks(&mut ports, IrqMask::KEYBOARD_ONLY).unwrap();
        }
        let writes = ports.writes();
        assert_eq!(&writes[8..], &[(0x21, 0xFD), (0xA1, 0xFF)]);
    }

    #[test]
    fn eoi_goes_to_both_command_ports() {
        let pics = ChainedPics::remapped();
        let mut ports = RecordingPorts::default();
        unsafe { pics.notify_end_of_interrupt(&mut ports) };

        assert_eq!(ports.ops, vec![PortOp::Write(0x20, 0x20), PortOp::Write(0xA0, 0x20)]);
    }

    #[test]
    fn read_masks_reads_both_data_ports() {
        let pics = ChainedPics::remapped();
        let mut ports = RecordingPorts::with_reads(&[0xFD, 0xFF]);
        let mask = unsafe { pics.read_masks(&mut ports) };

        assert_eq!(mask, IrqMask::KEYBOARD_ONLY);
        assert_eq!(ports.ops, vec![PortOp::Read(0x21), PortOp::Read(0xA1)]);
    }

    #[test]
    fn handled_range_is_sixteen_vectors() {
        let pics = ChainedPics::remapped();
        assert!(!pics.handles_interrupt(0x1F));
        assert!(pics.handles_interrupt(0x20));
        assert!(pics.handles_interrupt(0x2F));
        assert!(!pics.handles_interrupt(0x30));
        assert_eq!(pics.irq_line(0x21), Some(1));
        assert_eq!(pics.irq_line(0x2C), Some(12));
        assert_eq!(pics.irq_line(0x01), None);
    }

    #[test]
    fn mask_helpers() {
        assert_eq!(IrqMask::KEYBOARD_ONLY, IrqMask { master: 0xFD, slave: 0xFF });
        assert_eq!(IrqMask::KEYBOARD_ONLY.unmask(0).master, 0xFC);
        assert_eq!(IrqMask::ALL_MASKED.unmask(12).slave, 0xEF);

        let lines: Vec<u8> = IrqMask::KEYBOARD_ONLY.unmask(0).unmask(12).unmasked_lines().collect();
        assert_eq!(lines, vec![0, 1, 12]);
        assert!(!IrqMask::ALL_MASKED.is_unmasked(16));
    }

    #[test]
    fn unmasking_a_nonexistent_line_is_a_no_op() {
        assert_eq!(IrqMask::ALL_MASKED.unmask(16), IrqMask::ALL_MASKED);
        assert_eq!(IrqMask::KEYBOARD_ONLY.unmask(u8::MAX), IrqMask::KEYBOARD_ONLY);
        assert_eq!(IrqMask::ALL_MASKED.unmask(15).slave, 0x7F);
    }

    #[test]
    fn irq_range_must_fit_the_interrupt_table() {
        assert_eq!(ChainedPics::remapped().fits_table(48), Ok(()));
        assert_eq!(ChainedPics::new(0x28).unwrap().fits_table(48), Err(PicError::BaseBeyondTable(0x28)));
        assert_eq!(ChainedPics::new(0x30).unwrap().fits_table(48), Err(PicError::BaseBeyondTable(0x30)));
        assert_eq!(ChainedPics::new(0x30).unwrap().fits_table(64), Ok(()));
    }
}
