//! Entry stubs for the installed vectors.
//!
//! Each stub pushes a zero error code and its vector number, saves the
//! general purpose registers with `pushad`, and hands a pointer to the
//! resulting frame to `interrupt_dispatch`. The frame layout is
//! [`SavedContext`](super::dispatch::SavedContext).

use core::arch::global_asm;

use crate::interrupts::HandlerTable;

global_asm!(
    r#"
.section .text

.macro ISR_NOERR name num
    .global \name
\name:
    push 0                  // error code
    push \num               // vector
    jmp isr_common
.endm

ISR_NOERR isr_stub_0, 0
ISR_NOERR isr_stub_1, 1
ISR_NOERR isr_stub_32, 32
ISR_NOERR isr_stub_33, 33

isr_common:
    pushad
    cld
    push esp                // &SavedContext
    call interrupt_dispatch
    add esp, 4
    popad
    add esp, 8              // vector, error code
    iretd
"#
);

extern "C" {
    fn isr_stub_0();
    fn isr_stub_1();
    fn isr_stub_32();
    fn isr_stub_33();
}

impl HandlerTable {
    /// Addresses of the stubs above. They are hard-wired to the default
    /// remap base.
    pub fn trampolines() -> Self {
        HandlerTable::new(
            isr_stub_0 as usize as u32,
            isr_stub_1 as usize as u32,
            isr_stub_32 as usize as u32,
            isr_stub_33 as usize as u32,
        )
    }
}
