//! Privileged processor operations used during boot.
//!
//! The table builders never execute `lgdt`/`lidt` themselves; they hand a
//! [`TablePointer`] to a [`Cpu`]. On i686 that is [`HardwareCpu`].

use x86_64::structures::gdt::SegmentSelector;

use crate::interrupts::descriptor::TablePointer;

pub trait Cpu {
    /// Load the segment table register.
    ///
    /// # Safety
    /// `pointer` must describe a valid, permanently live segment table.
    unsafe fn load_gdt(&mut self, pointer: &TablePointer);

    /// Reload CS with `code` and every data segment register with `data`.
    ///
    /// # Safety
    /// Both selectors must reference present descriptors of the loaded table.
    unsafe fn reload_segments(&mut self, code: SegmentSelector, data: SegmentSelector);

    /// Load the interrupt table register.
    ///
    /// # Safety
    /// `pointer` must describe a valid, permanently live interrupt table.
    unsafe fn load_idt(&mut self, pointer: &TablePointer);

    fn enable_interrupts(&mut self);

    fn disable_interrupts(&mut self);
}

/// The real processor. Only meaningful in 32-bit protected mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwareCpu;

#[cfg(target_arch = "x86")]
impl Cpu for HardwareCpu {
    unsafe fn load_gdt(&mut self, pointer: &TablePointer) {
        core::arch::asm!("lgdt [{}]", in(reg) pointer as *const TablePointer, options(readonly, nostack, preserves_flags));
    }

    unsafe fn reload_segments(&mut self, code: SegmentSelector, data: SegmentSelector) {
        // CS can only be changed by a far transfer.
        core::arch::asm!(
            "push {code:e}",
            "lea {tmp}, [2f]",
            "push {tmp}",
            "retf",
            "2:",
            "mov ds, {data:x}",
            "mov es, {data:x}",
            "mov fs, {data:x}",
            "mov gs, {data:x}",
            "mov ss, {data:x}",
            code = in(reg) u32::from(code.0),
            data = in(reg) data.0,
            tmp = out(reg) _,
            options(preserves_flags),
        );
    }

    unsafe fn load_idt(&mut self, pointer: &TablePointer) {
        core::arch::asm!("lidt [{}]", in(reg) pointer as *const TablePointer, options(readonly, nostack, preserves_flags));
    }

    fn enable_interrupts(&mut self) {
        unsafe { core::arch::asm!("sti", options(nomem, nostack)) };
    }

    fn disable_interrupts(&mut self) {
        unsafe { core::arch::asm!("cli", options(nomem, nostack)) };
    }
}
