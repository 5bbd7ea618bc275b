use std::marker::PhantomData;

use crate::backend::{AccessKind, Backend};
use crate::error::{BenchError, Resource};

#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

// ─── Access markers ──────────────────────────────────────────────────
mod sealed {
    pub trait Sealed {}
}

/// Kernel-side access mode, fixed at the type level.
pub trait Access: sealed::Sealed {
    const KIND: AccessKind;
}

/// Kernel input, filled from host memory at creation.
pub struct ReadOnly;
impl sealed::Sealed for ReadOnly {}
impl Access for ReadOnly {
    const KIND: AccessKind = AccessKind::ReadOnly;
}

/// Kernel output, the only kind that can be read back.
pub struct WriteOnly;
impl sealed::Sealed for WriteOnly {}
impl Access for WriteOnly {
    const KIND: AccessKind = AccessKind::WriteOnly;
}

// ─── Device buffer ───────────────────────────────────────────────────

/// Driver buffer of `len` floats; dropping it releases the device memory.
pub struct DeviceBuffer<H, A> {
    raw: H,
    len: usize,
    name: &'static str,
    _access: PhantomData<A>,
}

impl<H, A: Access> DeviceBuffer<H, A> {
    fn create<B>(
        backend: &B,
        context: &B::Context,
        name: &'static str,
        len: usize,
        init: Option<&[f32]>,
    ) -> Result<Self, BenchError>
    where
        B: Backend<Buffer = H>,
    {
        let raw = backend
            .create_buffer(context, A::KIND, len, init)
            .map_err(BenchError::creation(Resource::Buffer(name)))?;

        #[cfg(feature = "metrics")]
        {
            crate::metrics::ALLOCS.fetch_add(1, Ordering::Relaxed);
            crate::metrics::ALLOC_BYTES.fetch_add(len * size_of::<f32>(), Ordering::Relaxed);
        }

        Ok(Self { raw, len, name, _access: PhantomData })
    }
}

impl<H> DeviceBuffer<H, ReadOnly> {
    /// Allocates and copies `host` in one driver call.
    pub fn upload<B>(backend: &B, context: &B::Context, name: &'static str, host: &[f32])
        -> Result<Self, BenchError>
    where
        B: Backend<Buffer = H>,
    {
        Self::create(backend, context, name, host.len(), Some(host))
    }
}

impl<H> DeviceBuffer<H, WriteOnly> {
    /// Uninitialized output buffer.
    pub fn output<B>(backend: &B, context: &B::Context, name: &'static str, len: usize)
        -> Result<Self, BenchError>
    where
        B: Backend<Buffer = H>,
    {
        Self::create(backend, context, name, len, None)
    }
}

impl<H, A> DeviceBuffer<H, A> {
    pub fn raw(&self) -> &H {
        &self.raw
    }

    pub fn size_bytes(&self) -> usize {
        self.len * size_of::<f32>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(feature = "metrics")]
impl<H, A> Drop for DeviceBuffer<H, A> {
    fn drop(&mut self) {
        crate::metrics::ALLOCS.fetch_sub(1, Ordering::Relaxed);
        crate::metrics::ALLOC_BYTES.fetch_sub(self.size_bytes(), Ordering::Relaxed);
    }
}
