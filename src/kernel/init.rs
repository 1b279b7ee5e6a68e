//! Interrupt bring-up.
//!
//! Interrupts stay disabled until the last stage, so no vector can be
//! delivered into a half-built table.

use crate::cpu::Cpu;
use crate::error::BootError;
use crate::interrupts::pic::{ChainedPics, PICS};
use crate::interrupts::idt::IDT_ENTRIES;
use crate::interrupts::{gdt, idt, HandlerTable};
use crate::kernel::config::BootConfig;
use crate::kernel::status::{self, BootProgress, BootStage};
use crate::ports::PortIo;
use crate::{klog, klog_error, klog_info};

/// Build and load the GDT and IDT, program the PIC, then enable interrupts.
pub fn init_interrupts<C: Cpu, P: PortIo>(
    cpu: &mut C,
    ports: &mut P,
    handlers: &HandlerTable,
    config: &BootConfig,
) -> Result<(), BootError> {
    // Reject a bad remap base before touching any hardware.
    let pics = ChainedPics::new(config.remap_base)?;
    pics.fits_table(IDT_ENTRIES)?;

    klog::set_level(config.log_level);
    cpu.disable_interrupts();

    let mut progress = BootProgress::new();
    klog_info!("Initializing interrupt system");

    init_phase(&mut progress, BootStage::SegmentTable, || {
        gdt::build_and_activate(cpu);
        Ok(())
    })?;

    init_phase(&mut progress, BootStage::InterruptTable, || {
        idt::init(cpu, handlers, config.remap_base)?;
        Ok(())
    })?;

    init_phase(&mut progress, BootStage::InterruptController, || init_pic(ports, pics, config))?;

    init_phase(&mut progress, BootStage::InterruptsEnabled, || {
        cpu.enable_interrupts();
        Ok(())
    })?;

    klog_info!("Interrupt system ready");
    Ok(())
}

fn init_pic<P: PortIo>(ports: &mut P, remapped: ChainedPics, config: &BootConfig) -> Result<(), BootError> {
    let mut pics = PICS.lock();
    *pics = remapped;
    unsafe { pics.initialize(ports) };

    for line in config.irq_mask.unmasked_lines() {
        let vector = usize::from(config.remap_base) + usize::from(line);
        if !idt::is_installed(vector) {
            return Err(BootError::UnservicedLine(line));
        }
    }
    unsafe { pics.write_masks(ports, config.irq_mask)? };

    klog_info!(
        "PIC: remapped to {:#x}/{:#x}, mask {:#04x}/{:#04x}",
        pics.master_offset(),
        pics.slave_offset(),
        config.irq_mask.master,
        config.irq_mask.slave
    );
    Ok(())
}

fn init_phase(
    progress: &mut BootProgress,
    stage: BootStage,
    init_fn: impl FnOnce() -> Result<(), BootError>,
) -> Result<(), BootError> {
    progress.begin(stage)?;
    status::record(progress);
    klog_info!("[{}/{}] Initializing {}...", stage.ordinal(), BootStage::ALL.len(), stage);

    let result = init_fn();
    match result {
        Ok(()) => {
            progress.complete(stage);
            klog_info!("    {} initialized", stage);
        }
        Err(e) => {
            progress.fail(stage, e.as_str());
            klog_error!("    {} failed: {}", stage, e);
        }
    }
    status::record(progress);
    result
}

/// Bring-up on real hardware with the built-in entry stubs.
#[cfg(target_arch = "x86")]
pub fn init_hardware() -> Result<(), BootError> {
    use crate::cpu::HardwareCpu;
    use crate::ports::HardwarePorts;

    init_interrupts(&mut HardwareCpu, &mut HardwarePorts, &HandlerTable::trampolines(), &BootConfig::DEFAULT)
}
