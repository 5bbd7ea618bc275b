//! Seam between the benchmark pipeline and a compute driver.
//!
//! Every associated handle type owns its driver object and releases it on
//! drop. The pipeline keeps them as locals, so acquisition order fixes the
//! (reverse) release order on every exit path.

use crate::{device::DeviceDescriptor, error::Status};

/// Access mode of a device buffer, seen from the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    ReadOnly,
    WriteOnly,
}

/// 1-D index space of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdRange {
    pub global: usize,
    pub local: usize,
}

impl NdRange {
    /// Smallest range of `local`-sized groups that covers `n` work items.
    pub fn covering(n: usize, local: usize) -> Self {
        Self { global: n.div_ceil(local) * local, local }
    }

    /// Number of work groups launched.
    pub fn groups(&self) -> usize {
        self.global / self.local
    }
}

/// An enqueued operation that has to be waited on.
pub trait Completion {
    /// Blocks until the operation finished.
    fn wait(self) -> Result<(), Status>;
}

pub trait Backend {
    type Device;
    type Context;
    type Queue;
    type Buffer;
    type Program;
    type Kernel;
    type Pending: Completion;

    /// Every device of every platform, in enumeration order.
    fn devices(&self) -> Result<Vec<DeviceDescriptor<Self::Device>>, Status>;

    fn create_context(&self, device: &Self::Device) -> Result<Self::Context, Status>;

    /// In-order queue on `device` inside `context`.
    fn create_queue(&self, context: &Self::Context, device: &Self::Device)
        -> Result<Self::Queue, Status>;

    /// Buffer of `len` floats. `init` is copied in at creation when given.
    fn create_buffer(
        &self,
        context: &Self::Context,
        access: AccessKind,
        len: usize,
        init: Option<&[f32]>,
    ) -> Result<Self::Buffer, Status>;

    fn create_program(&self, context: &Self::Context, source: &str)
        -> Result<Self::Program, Status>;

    fn build_program(&self, program: &mut Self::Program, device: &Self::Device)
        -> Result<(), Status>;

    fn build_log(&self, program: &Self::Program, device: &Self::Device) -> Result<String, Status>;

    fn create_kernel(&self, program: &Self::Program, name: &str) -> Result<Self::Kernel, Status>;

    /// Binds `(a, b, c, n)` in kernel argument order.
    fn set_args(
        &self,
        kernel: &mut Self::Kernel,
        a: &Self::Buffer,
        b: &Self::Buffer,
        c: &Self::Buffer,
        n: u32,
    ) -> Result<(), Status>;

    fn enqueue_kernel(&self, queue: &Self::Queue, kernel: &Self::Kernel, range: NdRange)
        -> Result<Self::Pending, Status>;

    /// Blocking copy of the whole buffer into `host`.
    fn enqueue_read(&self, queue: &Self::Queue, buffer: &Self::Buffer, host: &mut [f32])
        -> Result<Self::Pending, Status>;
}
