//! Vector-addition benchmark on an OpenCL device: pick a device, stage two
//! random input arrays, build and time the `aplusb` kernel, time the readback
//! and verify the sums on the host.

// ─── Feature modules ─────────────────────────────────────────────────
#[cfg(feature = "metrics")]
pub mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::summary;

#[cfg(feature = "memtrace")]
pub mod memtracer;
#[cfg(feature = "memtrace")]
pub use memtracer::{CopyToken, Dir, flush_csv, start};

// ─── Pipeline ────────────────────────────────────────────────────────
pub mod backend;
pub mod bench;
pub mod buffer;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod opencl;
pub mod report;
pub mod stats;
pub mod verify;

pub use backend::{AccessKind, Backend, Completion, NdRange};
pub use bench::{load_source, run, run_observed, run_on, run_on_observed};
pub use buffer::{DeviceBuffer, ReadOnly, WriteOnly};
pub use config::{BenchConfig, ENTRY_POINT};
pub use device::{DeviceDescriptor, DeviceKind, select_device};
pub use error::{BenchError, Resource, Stage, Status};
pub use opencl::OpenCl;
pub use report::{BenchReport, KernelReport, Progress, TransferReport};
pub use stats::{LapTimer, TrimWindow, TrimmedStats};
pub use verify::verify;
