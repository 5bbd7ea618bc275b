//! Timeline of transfers and kernel laps, dumped as CSV.

use once_cell::sync::Lazy;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::{Mutex, PoisonError},
    time::Instant,
};

/// Transfer direction or kernel lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    H2D,
    D2H,
    Kernel,
}

impl Dir {
    fn as_str(self) -> &'static str {
        match self {
            Dir::H2D => "H2D",
            Dir::D2H => "D2H",
            Dir::Kernel => "Kernel",
        }
    }
}

/// Origin of the timeline, fixed by the first `start`.
static T0: Lazy<Instant> = Lazy::new(Instant::now);

/// (start_us, end_us, bytes, dir, idle_us)
static LOG: Lazy<Mutex<Vec<(u128, u128, usize, Dir, u128)>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Open span; `finish` appends it to the timeline.
pub struct CopyToken {
    start: Instant,
    bytes: usize,
    dir: Dir,
}

pub fn start(dir: Dir, bytes: usize) -> CopyToken {
    Lazy::force(&T0);
    CopyToken { start: Instant::now(), bytes, dir }
}

impl CopyToken {
    pub fn finish(self) {
        let t0 = *T0;
        let s = self.start.duration_since(t0).as_micros();
        let e = Instant::now().duration_since(t0).as_micros();

        let mut log = LOG.lock().unwrap_or_else(PoisonError::into_inner);
        let prev_end = log.last().map(|entry| entry.1).unwrap_or(0);
        let idle = s.saturating_sub(prev_end);

        log.push((s, e, self.bytes, self.dir, idle));
    }
}

#[cfg(test)]
fn len() -> usize {
    LOG.lock().unwrap_or_else(PoisonError::into_inner).len()
}

/// Writes and clears the timeline. Call once at the end of a run.
pub fn flush_csv(path: impl AsRef<Path>) -> io::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    writeln!(f, "t_start_us,t_end_us,bytes,dir,idle_us")?;
    let mut log = LOG.lock().unwrap_or_else(PoisonError::into_inner);
    for (s, e, b, d, idle) in log.drain(..) {
        writeln!(f, "{},{},{},{},{}", s, e, b, d.as_str(), idle)?;
    }
    f.flush()
}
