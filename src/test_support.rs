//! Recording fakes for host tests.

use core::fmt;
use std::collections::VecDeque;

use x86_64::structures::gdt::SegmentSelector;

use crate::cpu::Cpu;
use crate::interrupts::descriptor::TablePointer;
use crate::klog::DiagnosticSink;
use crate::ports::PortIo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOp {
    Write(u16, u8),
    Read(u16),
}

/// Logs every port access. Reads are answered from a script, then zero.
#[derive(Debug, Default)]
pub struct RecordingPorts {
    pub ops: Vec<PortOp>,
    reads: VecDeque<u8>,
}

impl RecordingPorts {
    pub fn with_reads(reads: &[u8]) -> Self {
        Self { ops: Vec::new(), reads: reads.iter().copied().collect() }
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                PortOp::Write(port, value) => Some((port, value)),
                PortOp::Read(_) => None,
            })
            .collect()
    }
}

impl PortIo for RecordingPorts {
    unsafe fn write_u8(&mut self, port: u16, value: u8) {
        self.ops.push(PortOp::Write(port, value));
    }

    unsafe fn read_u8(&mut self, port: u16) -> u8 {
        self.ops.push(PortOp::Read(port));
        self.reads.pop_front().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuOp {
    LoadGdt { limit: u16 },
    ReloadSegments { code: u16, data: u16 },
    LoadIdt { limit: u16 },
    EnableInterrupts,
    DisableInterrupts,
}

#[derive(Debug, Default)]
pub struct RecordingCpu {
    pub ops: Vec<CpuOp>,
}

impl Cpu for RecordingCpu {
    unsafe fn load_gdt(&mut self, pointer: &TablePointer) {
        let limit = pointer.limit;
        self.ops.push(CpuOp::LoadGdt { limit });
    }

    unsafe fn reload_segments(&mut self, code: SegmentSelector, data: SegmentSelector) {
        self.ops.push(CpuOp::ReloadSegments { code: code.0, data: data.0 });
    }

    unsafe fn load_idt(&mut self, pointer: &TablePointer) {
        let limit = pointer.limit;
        self.ops.push(CpuOp::LoadIdt { limit });
    }

    fn enable_interrupts(&mut self) {
        self.ops.push(CpuOp::EnableInterrupts);
    }

    fn disable_interrupts(&mut self) {
        self.ops.push(CpuOp::DisableInterrupts);
    }
}

/// Collects diagnostic lines as strings.
#[derive(Debug, Default)]
pub struct LineSink {
    pub lines: Vec<String>,
}

impl DiagnosticSink for LineSink {
    fn write_line(&mut self, line: fmt::Arguments<'_>) {
        self.lines.push(line.to_string());
    }
}
