use spin::Mutex;
use x86_64::PrivilegeLevel;

use crate::cpu::Cpu;
use crate::error::TableError;
use crate::interrupts::descriptor::{GateDescriptor, GateKind, TablePointer, DESCRIPTOR_SIZE};
use crate::interrupts::gdt::KERNEL_CODE_SELECTOR;
use crate::interrupts::{HandlerTable, InterruptIndex};
use crate::klog_info;

/// 32 exception vectors plus 16 remapped IRQs.
pub const IDT_ENTRIES: usize = 48;

#[derive(Debug, Clone)]
#[repr(C, align(8))]
pub struct InterruptTable {
    entries: [GateDescriptor; IDT_ENTRIES],
}

static IDT: Mutex<InterruptTable> = Mutex::new(InterruptTable::new());

impl InterruptTable {
    pub const fn new() -> Self {
        Self { entries: [GateDescriptor::MISSING; IDT_ENTRIES] }
    }

    /// Point `vector` at `handler` through the kernel code segment.
    pub fn set_vector(
        &mut self,
        vector: usize,
        handler: u32,
        kind: GateKind,
        dpl: PrivilegeLevel,
    ) -> Result<(), TableError> {
        let slot = self.entries.get_mut(vector).ok_or(TableError::VectorOutOfRange(vector))?;
        *slot = GateDescriptor::new(handler, KERNEL_CODE_SELECTOR, kind, dpl);
        Ok(())
    }

    pub fn gate(&self, vector: usize) -> Option<GateDescriptor> {
        self.entries.get(vector).copied()
    }

    pub fn is_installed(&self, vector: usize) -> bool {
        self.gate(vector).is_some_and(GateDescriptor::is_present)
    }

    /// The two diagnostic exceptions plus timer and keyboard, every one an
    /// interrupt gate at ring 0. All other vectors stay absent.
    pub fn install_boot_vectors(&mut self, handlers: &HandlerTable, remap_base: u8) -> Result<(), TableError> {
        for index in InterruptIndex::BOOT {
            let vector = usize::from(index.vector(remap_base));
            self.set_vector(vector, handlers.get(index), GateKind::Interrupt, PrivilegeLevel::Ring0)?;
        }
        Ok(())
    }

    /// Limit is the offset of the last valid byte.
    pub fn pointer(&self) -> TablePointer {
        TablePointer {
            limit: (IDT_ENTRIES * DESCRIPTOR_SIZE - 1) as u16,
            base: self.entries.as_ptr() as usize as u32,
        }
    }

    /// # Safety
    /// `self` must stay at its current address for as long as the processor
    /// uses it, and every installed gate must point at a valid entry stub.
    pub unsafe fn load<C: Cpu>(&self, cpu: &mut C) {
        let pointer = self.pointer();
        cpu.load_idt(&pointer);
    }
}

impl Default for InterruptTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the boot vectors into the global table and load it. The segment
/// table must already be active, since every gate names [`KERNEL_CODE_SELECTOR`].
pub fn init<C: Cpu>(cpu: &mut C, handlers: &HandlerTable, remap_base: u8) -> Result<(), TableError> {
    let mut idt = IDT.lock();
    *idt = InterruptTable::new();
    idt.install_boot_vectors(handlers, remap_base)?;

    unsafe { idt.load(cpu) };

    let pointer = idt.pointer();
    let limit = pointer.limit;
    klog_info!("IDT: loaded {} vectors (limit {:#x})", IDT_ENTRIES, limit);
    for index in InterruptIndex::BOOT {
        klog_info!("IDT:   vector {:#04x} -> {:?}", index.vector(remap_base), index);
    }
    Ok(())
}

/// Whether the live table has a present gate for `vector`.
pub fn is_installed(vector: usize) -> bool {
    IDT.lock().is_installed(vector)
}
