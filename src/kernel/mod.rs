/// Boot sequencing for the interrupt system
pub mod config;
pub mod init;
pub mod status;

pub use config::BootConfig;
#[cfg(target_arch = "x86")]
pub use init::init_hardware;
pub use init::init_interrupts;
pub use status::{BootProgress, BootStage, InitStatus};
