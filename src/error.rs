use core::fmt;

use crate::kernel::status::BootStage;

/// Out-of-range write into one of the fixed descriptor tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    IndexOutOfRange(usize),
    VectorOutOfRange(usize),
}

impl TableError {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableError::IndexOutOfRange(_) => "segment table index out of range",
            TableError::VectorOutOfRange(_) => "interrupt vector out of range",
        }
    }
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::IndexOutOfRange(i) | TableError::VectorOutOfRange(i) => {
                write!(f, "{} ({})", self.as_str(), i)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicError {
    /// Each controller covers 8 vectors, so its base must be 8-aligned.
    MisalignedBase(u8),
    /// Bases below 0x20 would alias CPU exception vectors.
    BaseOverlapsExceptions(u8),
    /// Not enough room above the base for both controllers.
    BaseTooHigh(u8),
    /// IRQ vectors would run past the end of the interrupt table.
    BaseBeyondTable(u8),
    /// Mask written before the ICW sequence completed.
    NotInitialized,
}

impl PicError {
    pub fn as_str(&self) -> &'static str {
        match self {
            PicError::MisalignedBase(_) => "PIC remap base is not a multiple of 8",
            PicError::BaseOverlapsExceptions(_) => "PIC remap base overlaps CPU exceptions",
            PicError::BaseTooHigh(_) => "PIC remap base leaves no room for the slave",
            PicError::BaseBeyondTable(_) => "PIC vectors do not fit the interrupt table",
            PicError::NotInitialized => "PIC mask written before initialization",
        }
    }
}

impl fmt::Display for PicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PicError::MisalignedBase(b)
            | PicError::BaseOverlapsExceptions(b)
            | PicError::BaseTooHigh(b)
            | PicError::BaseBeyondTable(b) => {
                write!(f, "{} ({:#x})", self.as_str(), b)
            }
            PicError::NotInitialized => f.write_str(self.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    Table(TableError),
    Pic(PicError),
    /// An IRQ line would be unmasked with no gate installed for its vector.
    UnservicedLine(u8),
    OutOfOrder { expected: BootStage, found: BootStage },
    /// A stage was started again after boot finished it.
    AlreadyComplete(BootStage),
}

impl BootError {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootError::Table(e) => e.as_str(),
            BootError::Pic(e) => e.as_str(),
            BootError::UnservicedLine(_) => "IRQ line unmasked without an installed gate",
            BootError::OutOfOrder { .. } => "boot stage run out of order",
            BootError::AlreadyComplete(_) => "boot stage already complete",
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Table(e) => fmt::Display::fmt(e, f),
            BootError::Pic(e) => fmt::Display::fmt(e, f),
            BootError::UnservicedLine(line) => write!(f, "{} (IRQ{})", self.as_str(), line),
            BootError::OutOfOrder { expected, found } => {
                write!(f, "{}: expected {}, got {}", self.as_str(), expected, found)
            }
            BootError::AlreadyComplete(stage) => write!(f, "{} ({})", self.as_str(), stage),
        }
    }
}

impl From<TableError> for BootError {
    fn from(e: TableError) -> Self {
        BootError::Table(e)
    }
}

impl From<PicError> for BootError {
    fn from(e: PicError) -> Self {
        BootError::Pic(e)
    }
}
