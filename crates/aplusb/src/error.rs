use std::{fmt, io, path::PathBuf};

// ─── Driver status ───────────────────────────────────────────────────

/// Raw status code reported by the compute driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub i32);

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenCL error code {}", self.0)
    }
}

impl From<opencl3::error_codes::ClError> for Status {
    #[inline]
    fn from(err: opencl3::error_codes::ClError) -> Self {
        Status(err.0)
    }
}

impl From<i32> for Status {
    #[inline]
    fn from(code: i32) -> Self {
        Status(code)
    }
}

// ─── What failed ─────────────────────────────────────────────────────

/// Device-side resource whose creation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Context,
    Queue,
    Buffer(&'static str),
    Program,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Context => f.write_str("context"),
            Resource::Queue => f.write_str("command queue"),
            Resource::Buffer(name) => write!(f, "buffer `{name}`"),
            Resource::Program => f.write_str("program"),
        }
    }
}

/// Step of a timed loop that reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SetArgs,
    Enqueue,
    Wait,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::SetArgs => "argument binding",
            Stage::Enqueue => "enqueue",
            Stage::Wait => "completion wait",
        })
    }
}

// ─── Error type ──────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("can't init OpenCL driver ({status})")]
    DriverInit { status: Status },

    #[error("no GPU or CPU device found ({scanned} devices scanned)")]
    NoDevice { scanned: usize },

    #[error("failed to create {resource} ({status})")]
    ResourceCreation { resource: Resource, status: Status },

    #[error("kernel source {} is empty, is the working directory configured properly?", .path.display())]
    ResourceReadEmpty { path: PathBuf },

    #[error("failed to read kernel source {}", .path.display())]
    ResourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build OpenCL program ({status})\nbuild log:\n{log}")]
    Build { status: Status, log: String },

    #[error("kernel entry point `{name}` not found in program ({status})")]
    EntryPoint { name: String, status: Status },

    #[error("kernel execution failed during {stage} ({status})")]
    Dispatch { stage: Stage, status: Status },

    #[error("result read failed during {stage} ({status})")]
    Transfer { stage: Stage, status: Status },

    #[error("CPU and GPU results differ at index {index}: expected {expected}, got {actual}")]
    Verification { index: usize, expected: f32, actual: f32 },
}

impl BenchError {
    pub(crate) fn creation(resource: Resource) -> impl FnOnce(Status) -> Self {
        move |status| BenchError::ResourceCreation { resource, status }
    }

    pub(crate) fn dispatch(stage: Stage) -> impl FnOnce(Status) -> Self {
        move |status| BenchError::Dispatch { stage, status }
    }

    pub(crate) fn transfer(stage: Stage) -> impl FnOnce(Status) -> Self {
        move |status| BenchError::Transfer { stage, status }
    }
}
