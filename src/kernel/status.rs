use core::fmt;

use spin::Mutex;

use crate::error::BootError;

/// Kernel initialization status tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed(&'static str),
}

/// Interrupt bring-up phases, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    SegmentTable,
    InterruptTable,
    InterruptController,
    InterruptsEnabled,
}

impl BootStage {
    pub const ALL: [BootStage; 4] = [
        BootStage::SegmentTable,
        BootStage::InterruptTable,
        BootStage::InterruptController,
        BootStage::InterruptsEnabled,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            BootStage::SegmentTable => "Segment Table",
            BootStage::InterruptTable => "Interrupt Table",
            BootStage::InterruptController => "Interrupt Controller",
            BootStage::InterruptsEnabled => "Interrupt Enable",
        }
    }

    /// 1-based position, for progress output.
    pub const fn ordinal(self) -> usize {
        self as usize + 1
    }
}

/// Per-stage status for one boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootProgress {
    statuses: [InitStatus; 4],
}

static BOOT_STATUS: Mutex<BootProgress> = Mutex::new(BootProgress::new());

impl BootProgress {
    pub const fn new() -> Self {
        Self { statuses: [InitStatus::NotStarted; 4] }
    }

    pub fn status(&self, stage: BootStage) -> InitStatus {
        self.statuses[stage as usize]
    }

    /// First stage that has not completed.
    pub fn next_stage(&self) -> Option<BootStage> {
        BootStage::ALL
            .into_iter()
            .find(|&stage| self.status(stage) != InitStatus::Completed)
    }

    /// Mark `stage` as running. Every earlier stage must have completed.
    pub fn begin(&mut self, stage: BootStage) -> Result<(), BootError> {
        match self.next_stage() {
            None => Err(BootError::AlreadyComplete(stage)),
            Some(_) if self.status(stage) == InitStatus::Completed => Err(BootError::AlreadyComplete(stage)),
            Some(expected) if expected != stage => Err(BootError::OutOfOrder { expected, found: stage }),
            Some(_) => {
                self.statuses[stage as usize] = InitStatus::InProgress;
                Ok(())
            }
        }
    }

    pub fn complete(&mut self, stage: BootStage) {
        self.statuses[stage as usize] = InitStatus::Completed;
    }

    pub fn fail(&mut self, stage: BootStage, reason: &'static str) {
        self.statuses[stage as usize] = InitStatus::Failed(reason);
    }

    pub fn all_complete(&self) -> bool {
        self.next_stage().is_none()
    }
}

impl Default for BootProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Publish the state of the running boot.
pub fn record(progress: &BootProgress) {
    *BOOT_STATUS.lock() = *progress;
}

/// Last published boot state.
pub fn snapshot() -> BootProgress {
    *BOOT_STATUS.lock()
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStatus::NotStarted => write!(f, "Not Started"),
            InitStatus::InProgress => write!(f, "In Progress"),
            InitStatus::Completed => write!(f, "Completed"),
            InitStatus::Failed(err) => write!(f, "Failed: {}", err),
        }
    }
}

impl fmt::Display for BootStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
