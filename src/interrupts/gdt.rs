// gdt.rs
use spin::Mutex;
use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

use crate::cpu::Cpu;
use crate::error::TableError;
use crate::interrupts::descriptor::{SegmentDescriptor, TablePointer, DESCRIPTOR_SIZE};
use crate::klog_info;

pub const GDT_ENTRIES: usize = 3;

const KERNEL_CODE_INDEX: u16 = 1;
const KERNEL_DATA_INDEX: u16 = 2;

/// 0x08
pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(KERNEL_CODE_INDEX, PrivilegeLevel::Ring0);
/// 0x10
pub const KERNEL_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(KERNEL_DATA_INDEX, PrivilegeLevel::Ring0);

#[derive(Debug, Clone)]
#[repr(C, align(8))]
pub struct SegmentTable {
    entries: [SegmentDescriptor; GDT_ENTRIES],
}

static GDT: Mutex<SegmentTable> = Mutex::new(SegmentTable::empty());

impl SegmentTable {
    pub const fn empty() -> Self {
        Self { entries: [SegmentDescriptor::NULL; GDT_ENTRIES] }
    }

    /// Null, flat kernel code, flat kernel data.
    pub const fn flat() -> Self {
        let mut table = Self::empty();
        table.entries[KERNEL_CODE_INDEX as usize] = SegmentDescriptor::kernel_code();
        table.entries[KERNEL_DATA_INDEX as usize] = SegmentDescriptor::kernel_data();
        table
    }

    pub fn set_entry(&mut self, index: usize, descriptor: SegmentDescriptor) -> Result<(), TableError> {
        let slot = self.entries.get_mut(index).ok_or(TableError::IndexOutOfRange(index))?;
        *slot = descriptor;
        Ok(())
    }

    pub fn entries(&self) -> &[SegmentDescriptor; GDT_ENTRIES] {
        &self.entries
    }

    /// Descriptor a selector refers to. The null entry never resolves.
    pub fn resolve(&self, selector: SegmentSelector) -> Option<SegmentDescriptor> {
        match selector.index() as usize {
            0 => None,
            i => self.entries.get(i).copied(),
        }
    }

    /// Limit is the full byte count of the three entries.
    pub fn pointer(&self) -> TablePointer {
        TablePointer {
            limit: (GDT_ENTRIES * DESCRIPTOR_SIZE) as u16,
            base: self.entries.as_ptr() as usize as u32,
        }
    }

    /// Load this table and switch every segment register onto it.
    ///
    /// # Safety
    /// `self` must stay at its current address for as long as the processor
    /// uses it.
    pub unsafe fn activate<C: Cpu>(&self, cpu: &mut C) {
        let pointer = self.pointer();
        cpu.load_gdt(&pointer);
        cpu.reload_segments(KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR);
    }
}

pub fn build_and_activate<C: Cpu>(cpu: &mut C) {
    let mut gdt = GDT.lock();
    *gdt = SegmentTable::flat();

    // The table is a static and is never rebuilt after this point.
    unsafe { gdt.activate(cpu) };

    let pointer = gdt.pointer();
    let limit = pointer.limit;
    klog_info!(
        "GDT: loaded {} entries (limit {:#x}), cs={:#x} ds={:#x}",
        GDT_ENTRIES,
        limit,
        KERNEL_CODE_SELECTOR.0,
        KERNEL_DATA_SELECTOR.0
    );
}

/// Look a selector up in the live table.
pub fn resolve(selector: SegmentSelector) -> Option<SegmentDescriptor> {
    GDT.lock().resolve(selector)
}
