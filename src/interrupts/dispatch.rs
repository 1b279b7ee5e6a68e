//! Common interrupt dispatch.
//!
//! Every installed vector enters here through its entry stub with a
//! [`SavedContext`] on the interrupted stack. Routing is a fixed match on
//! [`InterruptIndex`]; hardware vectors are acknowledged exactly once, after
//! handling, and nothing else is.
//!
//! Runs with IF clear (all gates are interrupt gates) and must not block.

use crate::drivers::ps2_keyboard::{KeyDirection, ScancodeQueue};
use crate::interrupts::pic::ChainedPics;
use crate::interrupts::InterruptIndex;
use crate::klog::DiagnosticSink;
use crate::ports::{PortIo, PS2_DATA};

/// General purpose registers in `pushad` order.
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct Registers {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
}

/// Pushed by the entry stub.
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct VectorInfo {
    pub vector: u32,
    pub error_code: u32,
}

/// Pushed by the processor on entry.
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct StackState {
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct SavedContext {
    pub registers: Registers,
    pub info: VectorInfo,
    pub stack: StackState,
}

impl SavedContext {
    pub fn for_vector(vector: u32) -> Self {
        Self { info: VectorInfo { vector, error_code: 0 }, ..Self::default() }
    }

    pub fn vector(&self) -> u32 {
        self.info.vector
    }
}

/// What one dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub vector: u32,
    pub scancode: Option<u8>,
    pub direction: Option<KeyDirection>,
    pub acknowledged: bool,
}

pub fn dispatch<P: PortIo, S: DiagnosticSink>(
    ctx: &SavedContext,
    ports: &mut P,
    pics: &ChainedPics,
    scancodes: &ScancodeQueue,
    sink: &mut S,
) -> DispatchOutcome {
    let vector = ctx.vector();
    let mut outcome = DispatchOutcome { vector, scancode: None, direction: None, acknowledged: false };

    sink.write_line(format_args!("interrupt handler number: {}", vector));

    match InterruptIndex::from_vector(vector, pics.master_offset()) {
        Some(InterruptIndex::Keyboard) => {
            let scancode = unsafe { ports.read_u8(PS2_DATA) };
            sink.write_line(format_args!("interrupt number {}, key: {:#04x}", vector, scancode));
            scancodes.push(scancode);

            outcome.scancode = Some(scancode);
            outcome.direction = KeyDirection::from_scancode(scancode);
            if let Some(direction) = outcome.direction {
                sink.write_line(format_args!("{}", direction.as_str()));
            }
        }
        _ => sink.write_line(format_args!("interrupt number not in list")),
    }

    if pics.handles_interrupt(vector) {
        unsafe { pics.notify_end_of_interrupt(ports) };
        outcome.acknowledged = true;
    }

    outcome
}

/// Called by the entry stubs with a pointer to the frame they built.
#[cfg(target_arch = "x86")]
#[no_mangle]
pub extern "C" fn interrupt_dispatch(ctx: &SavedContext) {
    use crate::drivers::ps2_keyboard::SCANCODES;
    use crate::interrupts::pic::PICS;
    use crate::klog::KernelLog;
    use crate::ports::HardwarePorts;

    let pics = PICS.lock();
    dispatch(ctx, &mut HardwarePorts, &pics, &SCANCODES, &mut KernelLog);
}
