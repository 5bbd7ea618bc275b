use std::fmt;

use crate::{device::DeviceKind, stats::TrimmedStats};

const GIB: f64 = (1u64 << 30) as f64;

#[derive(Debug, Clone)]
pub struct KernelReport {
    pub time: TrimmedStats,
    pub global_size: usize,
    pub group_size: usize,
    /// Billions of additions per second.
    pub gflops: f64,
    /// Device memory traffic (2 reads, 1 write per element) in GiB/s.
    pub vram_gib_s: f64,
}

impl KernelReport {
    pub fn new(time: TrimmedStats, n: usize, global_size: usize, group_size: usize) -> Self {
        // f64: 3 * u32::MAX bytes overflows a 32-bit usize.
        let bytes = 3.0 * n as f64 * size_of::<f32>() as f64;
        Self {
            time,
            global_size,
            group_size,
            gflops: time.rate(n as f64, 1e9),
            vram_gib_s: time.rate(bytes, GIB),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferReport {
    pub time: TrimmedStats,
    /// Device to host bandwidth in GiB/s.
    pub gib_s: f64,
}

impl TransferReport {
    pub fn new(time: TrimmedStats, n: usize) -> Self {
        let bytes = n as f64 * size_of::<f32>() as f64;
        Self { time, gib_s: time.rate(bytes, GIB) }
    }
}

/// One stdout line group, emitted as soon as its phase is done.
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    DeviceSelected { kind: DeviceKind, name: &'a str },
    DataGenerated { n: usize },
    /// Non-blank compiler output of a successful build.
    BuildLog(&'a str),
    Kernel(&'a KernelReport),
    Transfer(&'a TransferReport),
    Verified { n: usize },
}

impl fmt::Display for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Progress::DeviceSelected { kind, name } => write!(f, "Using {kind} device: {name}"),
            Progress::DataGenerated { n } => write!(f, "Data generated for n={n}!"),
            Progress::BuildLog(log) => write!(f, "Log:\n{}", log.trim_end()),
            Progress::Kernel(k) => {
                writeln!(f, "Kernel average time: {}+-{} s", k.time.mean, k.time.std)?;
                writeln!(f, "GFlops: {}", k.gflops)?;
                write!(f, "VRAM bandwidth: {} GB/s", k.vram_gib_s)
            }
            Progress::Transfer(t) => {
                writeln!(f, "Result data transfer time: {}+-{} s", t.time.mean, t.time.std)?;
                write!(f, "VRAM -> RAM bandwidth: {} GB/s", t.gib_s)
            }
            Progress::Verified { n } => write!(f, "CPU and GPU results match for all {n} elements"),
        }
    }
}

/// Outcome of a verified run.
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub device_name: String,
    pub device_kind: DeviceKind,
    pub n: usize,
    /// Compiler output, only when it has something to say.
    pub build_log: Option<String>,
    pub kernel: KernelReport,
    pub transfer: TransferReport,
}

impl BenchReport {
    /// The lines of this run in the order they are printed.
    pub fn progress(&self) -> Vec<Progress<'_>> {
        let mut lines = vec![
            Progress::DeviceSelected { kind: self.device_kind, name: &self.device_name },
            Progress::DataGenerated { n: self.n },
        ];
        lines.extend(self.build_log.as_deref().map(Progress::BuildLog));
        lines.push(Progress::Kernel(&self.kernel));
        lines.push(Progress::Transfer(&self.transfer));
        lines.push(Progress::Verified { n: self.n });
        lines
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.progress().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{line}")?;
        }
        Ok(())
    }
}
