//! Kernel logging.
//!
//! Every line goes to each registered backend, e.g. a serial port and a text
//! console at the same time. Backends are
//! plain `fn` pointers held in atomics, so logging from inside an interrupt
//! handler never waits on a lock held by the code it preempted. With no
//! backend registered, lines are dropped.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {
    /// Whether a line at `level` passes when `self` is the threshold.
    pub fn allows(self, level: Level) -> bool {
        level <= self
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

/// Writes one formatted line. The backend supplies the line terminator.
pub type Backend = fn(fmt::Arguments<'_>);

pub const MAX_BACKENDS: usize = 4;

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static BACKENDS: [AtomicPtr<()>; MAX_BACKENDS] = [EMPTY_SLOT; MAX_BACKENDS];

/// Add an output. Returns `false` when every slot is taken.
pub fn register_backend(backend: Backend) -> bool {
    let ptr = backend as *mut ();
    BACKENDS.iter().any(|slot| {
        slot.compare_exchange(core::ptr::null_mut(), ptr, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    })
}

pub fn set_level(level: Level) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn level() -> Level {
    Level::from_raw(CURRENT_LEVEL.load(Ordering::Relaxed))
}

pub fn is_enabled(level: Level) -> bool {
    self::level().allows(level)
}

pub fn log_args(level: Level, args: fmt::Arguments<'_>) {
    if !is_enabled(level) {
        return;
    }
    for slot in BACKENDS.iter() {
        let ptr = slot.load(Ordering::Acquire);
        if ptr.is_null() {
            continue;
        }
        // Only `register_backend` stores into the slots, and it only stores
        // `Backend` pointers.
        let backend: Backend = unsafe { core::mem::transmute::<*mut (), Backend>(ptr) };
        backend(args);
    }
}

/// Consumer of pre-formatted diagnostic lines.
pub trait DiagnosticSink {
    fn write_line(&mut self, line: fmt::Arguments<'_>);
}

/// Sink that forwards to the registered backends at [`Level::Info`].
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelLog;

impl DiagnosticSink for KernelLog {
    fn write_line(&mut self, line: fmt::Arguments<'_>) {
        log_args(Level::Info, line);
    }
}

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::klog::log_args($level, ::core::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::Level::Error, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::Level::Warn, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::Level::Info, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::Level::Debug, ::core::format_args!($($arg)*))
    };
}
