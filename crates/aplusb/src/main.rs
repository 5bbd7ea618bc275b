use std::{error::Error, path::PathBuf, process::ExitCode};

use aplusb::{Backend, BenchConfig, BenchError, OpenCl, TrimWindow, select_device};
use clap::Parser;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_KERNEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/cl/aplusb.cl");

/// Times `C = A + B` on the first GPU (or CPU) OpenCL device.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Elements per array.
    #[arg(short, long, env = "APLUSB_N", default_value_t = aplusb::config::DEFAULT_N)]
    n: usize,

    /// Local work-group size.
    #[arg(short, long, env = "APLUSB_GROUP_SIZE", default_value_t = aplusb::config::DEFAULT_GROUP_SIZE)]
    group_size: usize,

    /// Repetitions of each timed loop.
    #[arg(short, long, env = "APLUSB_ITERATIONS", default_value_t = aplusb::config::DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Generator seed [default: n].
    #[arg(short, long, env = "APLUSB_SEED")]
    seed: Option<u64>,

    /// Kernel source file.
    #[arg(short, long, env = "APLUSB_KERNEL", default_value = DEFAULT_KERNEL)]
    kernel: PathBuf,

    /// Lower percentile of the timing window, as a fraction.
    #[arg(long, default_value_t = 0.2)]
    trim_lower: f64,

    /// Upper percentile of the timing window, as a fraction.
    #[arg(long, default_value_t = 0.8)]
    trim_upper: f64,

    /// Print every device found and exit.
    #[arg(long)]
    list_devices: bool,
}

impl Cli {
    fn config(&self) -> Result<BenchConfig, BenchError> {
        Ok(BenchConfig {
            n: self.n,
            group_size: self.group_size,
            iterations: self.iterations,
            seed: self.seed,
            kernel_path: self.kernel.clone(),
            trim: TrimWindow::new(self.trim_lower, self.trim_upper)?,
        })
    }
}

fn list_devices() -> Result<(), BenchError> {
    let inventory = OpenCl.devices().map_err(|status| BenchError::DriverInit { status })?;
    let chosen = select_device(&inventory).map(|d| d.handle);
    println!("Number of OpenCL devices: {}", inventory.len());
    for d in &inventory {
        let mark = if Some(d.handle) == chosen { "*" } else { " " };
        println!("{mark} platform #{} {:<5} {}", d.platform, d.kind, d.name);
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                ),
        )
        .init();

    let cli = Cli::parse();

    let outcome = if cli.list_devices {
        list_devices()
    } else {
        cli.config()
            .and_then(|config| aplusb::run_observed(&OpenCl, &config, |line| println!("{line}")))
            .map(drop)
    };

    #[cfg(feature = "metrics")]
    aplusb::summary();
    #[cfg(feature = "memtrace")]
    if let Err(e) = aplusb::flush_csv("memtrace.csv") {
        eprintln!("failed to write memtrace.csv: {e}");
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
