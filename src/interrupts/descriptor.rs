//! Bit-exact encoding of 32-bit segment and gate descriptors.
//!
//! Descriptors are packed by hand into a `u64` with shifts and masks. Nothing
//! here relies on Rust struct layout except [`TablePointer`], which the
//! processor reads directly and is therefore `repr(C, packed)`.
//!
//! ```text
//! segment descriptor
//!  63      56 55  52 51  48 47      40 39      16 15       0
//! ┌──────────┬──────┬──────┬──────────┬──────────┬──────────┐
//! │ base hi  │flags │lim hi│  access  │ base lo  │  lim lo  │
//! └──────────┴──────┴──────┴──────────┴──────────┴──────────┘
//!
//! interrupt gate
//!  63      48 47  44 43  40 39    32 31      16 15       0
//! ┌──────────┬──────┬──────┬────────┬──────────┬──────────┐
//! │offset hi │ attr │ type │  zero  │ selector │offset lo │
//! └──────────┴──────┴──────┴────────┴──────────┴──────────┘
//! ```

use bitflags::bitflags;
use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

/// Both descriptor kinds are 8 bytes.
pub const DESCRIPTOR_SIZE: usize = 8;

/// Largest encodable segment limit (20 bits).
pub const MAX_LIMIT: u32 = 0xF_FFFF;

bitflags! {
    /// Access byte of a segment descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u8 {
        const ACCESSED = 1 << 0;
        /// Readable for code, writable for data.
        const READ_WRITE = 1 << 1;
        /// Conforming for code, grows-down for data.
        const DIRECTION_CONFORMING = 1 << 2;
        const EXECUTABLE = 1 << 3;
        /// Set for code/data segments, clear for system segments.
        const SEGMENT = 1 << 4;
        const DPL_LOW = 1 << 5;
        const DPL_HIGH = 1 << 6;
        const PRESENT = 1 << 7;
    }
}

bitflags! {
    /// High nibble of byte 6 of a segment descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u8 {
        const AVAILABLE = 1 << 0;
        const LONG_MODE = 1 << 1;
        /// 32-bit default operand size.
        const SIZE_32 = 1 << 2;
        /// Limit counts 4 KiB pages instead of bytes.
        const GRANULARITY = 1 << 3;
    }
}

impl AccessFlags {
    pub const KERNEL_CODE: Self = Self::PRESENT
        .union(Self::SEGMENT)
        .union(Self::EXECUTABLE)
        .union(Self::READ_WRITE);

    pub const KERNEL_DATA: Self = Self::PRESENT.union(Self::SEGMENT).union(Self::READ_WRITE);

    /// Present code/data segment at `dpl` with the given type bits.
    pub const fn with_dpl(self, dpl: PrivilegeLevel) -> Self {
        let cleared = self.bits() & !(Self::DPL_LOW.bits() | Self::DPL_HIGH.bits());
        Self::from_bits_retain(cleared | ((dpl as u8 & 0b11) << 5))
    }

    pub const fn dpl(self) -> PrivilegeLevel {
        privilege_from_bits((self.bits() >> 5) & 0b11)
    }
}

impl SegmentFlags {
    pub const FLAT_32: Self = Self::GRANULARITY.union(Self::SIZE_32);
}

const fn privilege_from_bits(bits: u8) -> PrivilegeLevel {
    match bits & 0b11 {
        0 => PrivilegeLevel::Ring0,
        1 => PrivilegeLevel::Ring1,
        2 => PrivilegeLevel::Ring2,
        _ => PrivilegeLevel::Ring3,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SegmentDescriptor(u64);

impl SegmentDescriptor {
    /// Entry 0. The processor rejects any access through selector 0.
    pub const NULL: Self = Self(0);

    pub const fn new(base: u32, limit: u32, access: AccessFlags, flags: SegmentFlags) -> Self {
        let base = base as u64;
        let limit = (limit & MAX_LIMIT) as u64;

        let raw = (limit & 0xFFFF)
            | (base & 0xFF_FFFF) << 16
            | (access.bits() as u64) << 40
            | (limit >> 16) << 48
            | ((flags.bits() & 0x0F) as u64) << 52
            | (base >> 24) << 56;
        Self(raw)
    }

    /// Flat ring 0 code segment: base 0, 4 GiB, execute/read, 32-bit.
    pub const fn kernel_code() -> Self {
        Self::new(0, MAX_LIMIT, AccessFlags::KERNEL_CODE, SegmentFlags::FLAT_32)
    }

    /// Flat ring 0 data segment: base 0, 4 GiB, read/write, 32-bit.
    pub const fn kernel_data() -> Self {
        Self::new(0, MAX_LIMIT, AccessFlags::KERNEL_DATA, SegmentFlags::FLAT_32)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn to_bytes(self) -> [u8; DESCRIPTOR_SIZE] {
        self.0.to_le_bytes()
    }

    pub const fn base(self) -> u32 {
        (((self.0 >> 16) & 0xFF_FFFF) | ((self.0 >> 56) & 0xFF) << 24) as u32
    }

    /// Raw 20-bit limit field.
    pub const fn limit(self) -> u32 {
        ((self.0 & 0xFFFF) | ((self.0 >> 48) & 0x0F) << 16) as u32
    }

    /// Last addressable byte offset, accounting for granularity.
    pub const fn effective_limit(self) -> u64 {
        let limit = self.limit() as u64;
        if self.flags().contains(SegmentFlags::GRANULARITY) {
            (limit + 1) * 4096 - 1
        } else {
            limit
        }
    }

    pub const fn access(self) -> AccessFlags {
        AccessFlags::from_bits_retain((self.0 >> 40) as u8)
    }

    pub const fn flags(self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(((self.0 >> 52) & 0x0F) as u8)
    }

    pub const fn dpl(self) -> PrivilegeLevel {
        self.access().dpl()
    }

    pub const fn is_present(self) -> bool {
        self.access().contains(AccessFlags::PRESENT)
    }

    pub const fn is_executable(self) -> bool {
        self.access().contains(AccessFlags::EXECUTABLE)
    }

    pub const fn is_writable(self) -> bool {
        !self.is_executable() && self.access().contains(AccessFlags::READ_WRITE)
    }
}

impl core::fmt::Debug for SegmentDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SegmentDescriptor")
            .field("base", &format_args!("{:#x}", self.base()))
            .field("limit", &format_args!("{:#x}", self.limit()))
            .field("access", &self.access())
            .field("flags", &self.flags())
            .finish()
    }
}

/// Whether the processor clears IF when entering through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateKind {
    /// IF cleared on entry. Used for every hardware vector.
    Interrupt = 0,
    /// IF left as it was.
    Trap = 1,
}

impl GateKind {
    /// 32-bit gate type nibble: 0xE for interrupt, 0xF for trap.
    pub const fn type_bits(self) -> u8 {
        0b1110 | self as u8
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct GateDescriptor(u64);

impl GateDescriptor {
    /// An absent vector. Delivering it raises a fault.
    pub const MISSING: Self = Self(0);

    const PRESENT_NIBBLE: u8 = 0b1000;

    pub const fn new(handler: u32, selector: SegmentSelector, kind: GateKind, dpl: PrivilegeLevel) -> Self {
        let handler = handler as u64;
        let attributes = Self::PRESENT_NIBBLE | ((dpl as u8 & 0b11) << 1);
        let type_attr = (kind.type_bits() & 0x0F) | (attributes << 4);

        let raw = (handler & 0xFFFF)
            | (selector.0 as u64) << 16
            | (type_attr as u64) << 40
            | (handler >> 16) << 48;
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn to_bytes(self) -> [u8; DESCRIPTOR_SIZE] {
        self.0.to_le_bytes()
    }

    pub const fn offset(self) -> u32 {
        ((self.0 & 0xFFFF) | ((self.0 >> 48) & 0xFFFF) << 16) as u32
    }

    pub const fn selector(self) -> SegmentSelector {
        SegmentSelector((self.0 >> 16) as u16)
    }

    const fn type_attr(self) -> u8 {
        (self.0 >> 40) as u8
    }

    pub const fn is_present(self) -> bool {
        self.type_attr() & 0x80 != 0
    }

    pub const fn dpl(self) -> PrivilegeLevel {
        privilege_from_bits(self.type_attr() >> 5)
    }

    /// `None` for absent gates and for type nibbles this kernel never writes.
    pub const fn kind(self) -> Option<GateKind> {
        if !self.is_present() {
            return None;
        }
        match self.type_attr() & 0x0F {
            0xE => Some(GateKind::Interrupt),
            0xF => Some(GateKind::Trap),
            _ => None,
        }
    }
}

impl core::fmt::Debug for GateDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GateDescriptor")
            .field("offset", &format_args!("{:#x}", self.offset()))
            .field("selector", &format_args!("{:#x}", self.selector().0))
            .field("kind", &self.kind())
            .field("dpl", &self.dpl())
            .finish()
    }
}

/// Operand of `lgdt`/`lidt`. Built fresh for every load.
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct TablePointer {
    pub limit: u16,
    pub base: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: SegmentSelector = SegmentSelector::new(1, PrivilegeLevel::Ring0);

    #[test]
    fn kernel_segments_encode_to_exact_bytes() {
        assert_eq!(
            SegmentDescriptor::kernel_code().to_bytes(),
            [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x9A, 0xCF, 0x00]
        );
        assert_eq!(
            SegmentDescriptor::kernel_data().to_bytes(),
            [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x92, 0xCF, 0x00]
        );
        assert_eq!(SegmentDescriptor::NULL.to_bytes(), [0; 8]);
    }

    #[test]
    fn base_and_limit_are_split_across_the_record() {
        let access = AccessFlags::KERNEL_DATA;
        let desc = SegmentDescriptor::new(0x1234_5678, 0xA_BCDE, access, SegmentFlags::SIZE_32);

        assert_eq!(desc.to_bytes(), [0xDE, 0xBC, 0x78, 0x56, 0x34, 0x92, 0x4A, 0x12]);
        assert_eq!(desc.base(), 0x1234_5678);
        assert_eq!(desc.limit(), 0xA_BCDE);
        assert_eq!(desc.effective_limit(), 0xA_BCDE);
    }

    #[test]
    fn fields_are_truncated_to_their_width() {
        let desc = SegmentDescriptor::new(0, 0xFFF_FFFF, AccessFlags::KERNEL_DATA, SegmentFlags::from_bits_retain(0xFC));
        assert_eq!(desc.limit(), MAX_LIMIT);
        assert_eq!(desc.flags(), SegmentFlags::FLAT_32);
        assert_eq!(desc.base(), 0);
    }

    #[test]
    fn granularity_scales_limit_by_pages() {
        let paged = SegmentDescriptor::new(0, 0x0_0001, AccessFlags::KERNEL_DATA, SegmentFlags::FLAT_32);
        assert_eq!(paged.effective_limit(), 2 * 4096 - 1);
        assert_eq!(SegmentDescriptor::kernel_code().effective_limit(), 0xFFFF_FFFF);
    }

    #[test]
    fn dpl_round_trips_through_access_byte() {
        let user = AccessFlags::KERNEL_DATA.with_dpl(PrivilegeLevel::Ring3);
        assert_eq!(user.bits(), 0xF2);
        assert_eq!(user.dpl(), PrivilegeLevel::Ring3);
        assert_eq!(user.with_dpl(PrivilegeLevel::Ring0), AccessFlags::KERNEL_DATA);
    }

    #[test]
    fn interrupt_gate_encodes_type_and_attributes() {
        let gate = GateDescriptor::new(0xC010_2030, CODE, GateKind::Interrupt, PrivilegeLevel::Ring0);

        assert_eq!(gate.to_bytes(), [0x30, 0x20, 0x08, 0x00, 0x00, 0x8E, 0x10, 0xC0]);
        assert_eq!(gate.offset(), 0xC010_2030);
        assert_eq!(gate.selector(), CODE);
        assert_eq!(gate.kind(), Some(GateKind::Interrupt));
        assert!(gate.is_present());
    }

    #[test]
    fn trap_gate_at_ring3() {
        let gate = GateDescriptor::new(0x1000, CODE, GateKind::Trap, PrivilegeLevel::Ring3);

        assert_eq!(gate.to_bytes()[5], 0xEF);
        assert_eq!(gate.kind(), Some(GateKind::Trap));
        assert_eq!(gate.dpl(), PrivilegeLevel::Ring3);
    }

    #[test]
    fn missing_gate_is_absent() {
        assert!(!GateDescriptor::MISSING.is_present());
        assert_eq!(GateDescriptor::MISSING.kind(), None);
    }

    #[test]
    fn table_pointer_is_six_bytes() {
        assert_eq!(core::mem::size_of::<TablePointer>(), 6);
    }
}
