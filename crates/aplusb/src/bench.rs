//! The benchmark run: select, stage, build, time, read back, verify.
//!
//! Device resources are plain locals acquired in dependency order (context,
//! queue, `a`, `b`, `c`, program, kernel), so any `?` releases the ones
//! acquired so far in reverse order.

use std::{fs, path::Path, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    backend::{Backend, Completion, NdRange},
    buffer::{DeviceBuffer, ReadOnly, WriteOnly},
    config::{BenchConfig, ENTRY_POINT},
    data,
    device::select_device,
    error::{BenchError, Resource, Stage},
    report::{BenchReport, KernelReport, Progress, TransferReport},
    stats::{LapTimer, TrimmedStats},
    verify::verify,
};

#[cfg(feature = "metrics")]
use crate::metrics::record;
#[cfg(feature = "metrics")]
use std::time::Instant;

#[cfg(feature = "memtrace")]
use crate::memtracer::{Dir, start as trace_start};

/// Full run on freshly generated data.
pub fn run<B: Backend>(backend: &B, config: &BenchConfig) -> Result<BenchReport, BenchError> {
    run_observed(backend, config, |_| {})
}

/// Like [`run`], handing each [`Progress`] line to `observe` as soon as its
/// phase completes, so a run failing late still reports what it measured.
pub fn run_observed<B, O>(
    backend: &B,
    config: &BenchConfig,
    observe: O,
) -> Result<BenchReport, BenchError>
where
    B: Backend,
    O: FnMut(Progress<'_>),
{
    run_with(backend, config, |n| data::generate(n, config.seed()), observe)
}

/// Full run on caller-provided inputs; `config.n` must match their length.
pub fn run_on<B: Backend>(
    backend: &B,
    config: &BenchConfig,
    a: Vec<f32>,
    b: Vec<f32>,
) -> Result<BenchReport, BenchError> {
    run_on_observed(backend, config, a, b, |_| {})
}

pub fn run_on_observed<B, O>(
    backend: &B,
    config: &BenchConfig,
    a: Vec<f32>,
    b: Vec<f32>,
    observe: O,
) -> Result<BenchReport, BenchError>
where
    B: Backend,
    O: FnMut(Progress<'_>),
{
    if a.len() != config.n || b.len() != config.n {
        return Err(BenchError::Config(format!(
            "inputs have {} and {} elements, expected {}",
            a.len(),
            b.len(),
            config.n
        )));
    }
    run_with(backend, config, move |_| (a, b), observe)
}

fn run_with<B, F, O>(
    backend: &B,
    config: &BenchConfig,
    inputs: F,
    mut observe: O,
) -> Result<BenchReport, BenchError>
where
    B: Backend,
    F: FnOnce(usize) -> (Vec<f32>, Vec<f32>),
    O: FnMut(Progress<'_>),
{
    config.validate()?;
    let n = config.n;

    /* ---------- 1. device ---------------------------------------- */
    #[cfg(feature = "metrics")]
    let t = Instant::now();
    let inventory = backend.devices().map_err(|status| BenchError::DriverInit { status })?;
    let device = select_device(&inventory)
        .ok_or(BenchError::NoDevice { scanned: inventory.len() })?;
    #[cfg(feature = "metrics")]
    record("select_device", t);
    info!(device = %device.name, kind = %device.kind, platform = device.platform, "device selected");
    observe(Progress::DeviceSelected { kind: device.kind, name: &device.name });

    /* ---------- 2. context & in-order queue ---------------------- */
    #[cfg(feature = "metrics")]
    let t = Instant::now();
    let context = backend
        .create_context(&device.handle)
        .map_err(BenchError::creation(Resource::Context))?;
    let queue = backend
        .create_queue(&context, &device.handle)
        .map_err(BenchError::creation(Resource::Queue))?;
    #[cfg(feature = "metrics")]
    record("context_queue", t);

    /* ---------- 3. host data ------------------------------------- */
    let (a, b) = inputs(n);
    let mut c = vec![0.0_f32; n];
    info!(n, seed = config.seed(), "data generated");
    observe(Progress::DataGenerated { n });

    /* ---------- 4. device buffers -------------------------------- */
    #[cfg(feature = "metrics")]
    let t = Instant::now();
    #[cfg(feature = "memtrace")]
    let tok = trace_start(Dir::H2D, config.buffer_bytes().saturating_mul(2));
    let a_dev = DeviceBuffer::<_, ReadOnly>::upload(backend, &context, "a", &a)?;
    let b_dev = DeviceBuffer::<_, ReadOnly>::upload(backend, &context, "b", &b)?;
    let c_dev = DeviceBuffer::<_, WriteOnly>::output(backend, &context, "c", n)?;
    #[cfg(feature = "memtrace")]
    tok.finish();
    #[cfg(feature = "metrics")]
    record("stage_buffers", t);
    debug!(
        buffers = ?[a_dev.name(), b_dev.name(), c_dev.name()],
        bytes = c_dev.size_bytes(),
        "buffers staged"
    );

    /* ---------- 5. kernel ---------------------------------------- */
    let source = load_source(&config.kernel_path)?;
    #[cfg(feature = "metrics")]
    let t = Instant::now();
    let (program, build_log) = build_program(backend, &context, &device.handle, &source)?;
    if let Some(log) = &build_log {
        observe(Progress::BuildLog(log));
    }
    let mut kernel = backend
        .create_kernel(&program, ENTRY_POINT)
        .map_err(|status| BenchError::EntryPoint { name: ENTRY_POINT.to_owned(), status })?;
    #[cfg(feature = "metrics")]
    record("build_program", t);

    /* ---------- 6. timed dispatch -------------------------------- */
    let n_arg = u32::try_from(n).map_err(|_| BenchError::Config(format!("n={n} exceeds uint")))?;
    backend
        .set_args(&mut kernel, a_dev.raw(), b_dev.raw(), c_dev.raw(), n_arg)
        .map_err(BenchError::dispatch(Stage::SetArgs))?;
    let range = NdRange::covering(n, config.group_size);
    let laps = time_kernel(backend, &queue, &kernel, range, config)?;
    let kernel_report = KernelReport::new(
        TrimmedStats::compute(&laps, config.trim),
        n,
        range.global,
        range.local,
    );
    info!(mean_s = kernel_report.time.mean, gflops = kernel_report.gflops, "kernel timed");
    observe(Progress::Kernel(&kernel_report));

    /* ---------- 7. timed readback -------------------------------- */
    let laps = time_readback(backend, &queue, &c_dev, &mut c, config)?;
    let transfer_report = TransferReport::new(TrimmedStats::compute(&laps, config.trim), n);
    info!(mean_s = transfer_report.time.mean, gib_s = transfer_report.gib_s, "readback timed");
    observe(Progress::Transfer(&transfer_report));

    /* ---------- 8. verification ---------------------------------- */
    verify(&a, &b, &c)?;
    info!("results verified");
    observe(Progress::Verified { n });

    Ok(BenchReport {
        device_name: device.name.clone(),
        device_kind: device.kind,
        n,
        build_log,
        kernel: kernel_report,
        transfer: transfer_report,
    })
}

/// Whole kernel source; empty text is an error of its own.
pub fn load_source(path: &Path) -> Result<String, BenchError> {
    let source = fs::read_to_string(path)
        .map_err(|source| BenchError::ResourceRead { path: path.to_owned(), source })?;
    if source.is_empty() {
        return Err(BenchError::ResourceReadEmpty { path: path.to_owned() });
    }
    Ok(source)
}

/// Compiled program plus its log when the log is not blank.
fn build_program<B: Backend>(
    backend: &B,
    context: &B::Context,
    device: &B::Device,
    source: &str,
) -> Result<(B::Program, Option<String>), BenchError> {
    let mut program = backend
        .create_program(context, source)
        .map_err(BenchError::creation(Resource::Program))?;

    if let Err(status) = backend.build_program(&mut program, device) {
        let log = backend
            .build_log(&program, device)
            .unwrap_or_else(|e| format!("<build log unavailable: {e}>"));
        return Err(BenchError::Build { status, log });
    }

    let log = match backend.build_log(&program, device) {
        Ok(log) if !log.trim_matches(|c: char| c.is_whitespace() || c == '\0').is_empty() => {
            debug!(%log, "program built with compiler output");
            Some(log)
        }
        Ok(_) => None,
        Err(status) => {
            warn!(%status, "program built but its log could not be fetched");
            None
        }
    };
    Ok((program, log))
}

fn time_kernel<B: Backend>(
    backend: &B,
    queue: &B::Queue,
    kernel: &B::Kernel,
    range: NdRange,
    config: &BenchConfig,
) -> Result<Vec<Duration>, BenchError> {
    let mut timer = LapTimer::start(config.iterations);
    for _ in 0..config.iterations {
        #[cfg(feature = "memtrace")]
        let tok = trace_start(Dir::Kernel, config.buffer_bytes().saturating_mul(3));

        backend
            .enqueue_kernel(queue, kernel, range)
            .map_err(BenchError::dispatch(Stage::Enqueue))?
            .wait()
            .map_err(BenchError::dispatch(Stage::Wait))?;
        let lap = timer.next_lap();

        #[cfg(feature = "memtrace")]
        tok.finish();
        debug!(lap_s = lap.as_secs_f64(), "kernel lap");
    }
    Ok(timer.into_laps())
}

fn time_readback<B: Backend>(
    backend: &B,
    queue: &B::Queue,
    c_dev: &DeviceBuffer<B::Buffer, WriteOnly>,
    host: &mut [f32],
    config: &BenchConfig,
) -> Result<Vec<Duration>, BenchError> {
    let mut timer = LapTimer::start(config.iterations);
    for _ in 0..config.iterations {
        #[cfg(feature = "memtrace")]
        let tok = trace_start(Dir::D2H, c_dev.size_bytes());

        backend
            .enqueue_read(queue, c_dev.raw(), host)
            .map_err(BenchError::transfer(Stage::Enqueue))?
            .wait()
            .map_err(BenchError::transfer(Stage::Wait))?;
        let lap = timer.next_lap();

        #[cfg(feature = "memtrace")]
        tok.finish();
        debug!(lap_s = lap.as_secs_f64(), "readback lap");
    }
    Ok(timer.into_laps())
}
