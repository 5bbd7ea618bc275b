//! `Backend` on top of `opencl3`.
//!
//! All handles are the crate's own RAII types, so releasing is left to their
//! `Drop` impls.

use std::{ffi::c_void, ptr};

use bytemuck::{cast_slice, cast_slice_mut};

use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    device::{CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU, Device},
    error_codes::CL_DEVICE_NOT_FOUND,
    event::Event,
    kernel::Kernel,
    memory::{Buffer, CL_MEM_COPY_HOST_PTR, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY},
    platform::get_platforms,
    program::Program,
    types::{CL_BLOCKING, cl_device_id, cl_uint},
};

use crate::{
    backend::{AccessKind, Backend, Completion, NdRange},
    device::{DeviceDescriptor, DeviceKind},
    error::Status,
};

/// The system's OpenCL ICD loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCl;

fn classify(device: &Device) -> Result<DeviceKind, Status> {
    let ty = device.dev_type()?;
    Ok(if ty & CL_DEVICE_TYPE_GPU != 0 {
        DeviceKind::Gpu
    } else if ty & CL_DEVICE_TYPE_CPU != 0 {
        DeviceKind::Cpu
    } else {
        DeviceKind::Other
    })
}

impl Backend for OpenCl {
    type Device = cl_device_id;
    type Context = Context;
    type Queue = CommandQueue;
    type Buffer = Buffer<u8>;
    type Program = Program;
    type Kernel = Kernel;
    type Pending = EventGuard;

    fn devices(&self) -> Result<Vec<DeviceDescriptor<cl_device_id>>, Status> {
        let mut inventory = Vec::new();
        for (platform_idx, platform) in get_platforms()?.iter().enumerate() {
            let ids = match platform.get_devices(CL_DEVICE_TYPE_ALL) {
                Ok(ids) => ids,
                Err(e) if e.0 == CL_DEVICE_NOT_FOUND => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            for id in ids {
                let device = Device::new(id);
                inventory.push(DeviceDescriptor {
                    handle: id,
                    kind: classify(&device)?,
                    name: device.name()?,
                    platform: platform_idx,
                });
            }
        }
        Ok(inventory)
    }

    fn create_context(&self, device: &cl_device_id) -> Result<Context, Status> {
        Ok(Context::from_device(&Device::new(*device))?)
    }

    fn create_queue(&self, context: &Context, _device: &cl_device_id) -> Result<CommandQueue, Status> {
        // The context holds exactly this device; no properties means in-order.
        Ok(CommandQueue::create_default(context, 0)?)
    }

    fn create_buffer(
        &self,
        context: &Context,
        access: AccessKind,
        len: usize,
        init: Option<&[f32]>,
    ) -> Result<Buffer<u8>, Status> {
        let size_bytes = len * size_of::<f32>();
        let (flags, host_ptr) = match (access, init) {
            (AccessKind::ReadOnly, Some(host)) => {
                let bytes: &[u8] = cast_slice(host);
                debug_assert_eq!(bytes.len(), size_bytes, "host data length mismatch");
                // COPY_HOST_PTR only reads through the pointer.
                (CL_MEM_READ_ONLY | CL_MEM_COPY_HOST_PTR, bytes.as_ptr() as *mut c_void)
            }
            (AccessKind::ReadOnly, None) => (CL_MEM_READ_ONLY, ptr::null_mut()),
            (AccessKind::WriteOnly, _) => (CL_MEM_WRITE_ONLY, ptr::null_mut()),
        };
        // SAFETY: host_ptr is null or points at `size_bytes` initialized bytes.
        let buf = unsafe { Buffer::<u8>::create(context, flags, size_bytes, host_ptr)? };
        Ok(buf)
    }

    fn create_program(&self, context: &Context, source: &str) -> Result<Program, Status> {
        Ok(Program::create_from_source(context, source)?)
    }

    fn build_program(&self, program: &mut Program, device: &cl_device_id) -> Result<(), Status> {
        Ok(program.build(&[*device], "")?)
    }

    fn build_log(&self, program: &Program, device: &cl_device_id) -> Result<String, Status> {
        Ok(program.get_build_log(*device)?)
    }

    fn create_kernel(&self, program: &Program, name: &str) -> Result<Kernel, Status> {
        Ok(Kernel::create(program, name)?)
    }

    fn set_args(
        &self,
        kernel: &mut Kernel,
        a: &Buffer<u8>,
        b: &Buffer<u8>,
        c: &Buffer<u8>,
        n: u32,
    ) -> Result<(), Status> {
        let n: cl_uint = n;
        // SAFETY: argument types match `aplusb(global const float*, global const float*, global float*, uint)`.
        unsafe {
            kernel.set_arg(0, a)?;
            kernel.set_arg(1, b)?;
            kernel.set_arg(2, c)?;
            kernel.set_arg(3, &n)?;
        }
        Ok(())
    }

    fn enqueue_kernel(&self, queue: &CommandQueue, kernel: &Kernel, range: NdRange)
        -> Result<EventGuard, Status> {
        let global = [range.global];
        let local = [range.local];
        // SAFETY: all four arguments were bound by `set_args` and outlive the wait.
        let evt = unsafe {
            queue.enqueue_nd_range_kernel(
                kernel.get(), 1,
                ptr::null(), global.as_ptr(),
                local.as_ptr(), &[],
            )?
        };
        Ok(EventGuard { evt: Some(evt) })
    }

    fn enqueue_read(&self, queue: &CommandQueue, buffer: &Buffer<u8>, host: &mut [f32])
        -> Result<EventGuard, Status> {
        let bytes: &mut [u8] = cast_slice_mut(host);
        // SAFETY: blocking read, `host` is not touched by the device after return.
        let evt = unsafe { queue.enqueue_read_buffer(buffer, CL_BLOCKING, 0, bytes, &[])? };
        Ok(EventGuard { evt: Some(evt) })
    }
}

// ── Guard (waits on drop if nobody did) ──────────────────────────────
pub struct EventGuard {
    evt: Option<Event>,
}

impl Completion for EventGuard {
    fn wait(mut self) -> Result<(), Status> {
        match self.evt.take() {
            Some(evt) => Ok(evt.wait()?),
            None => Ok(()),
        }
    }
}

impl Drop for EventGuard {
    fn drop(&mut self) {
        if let Some(evt) = self.evt.take() {
            let _ = evt.wait();
        }
    }
}
