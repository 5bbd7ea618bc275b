//! Setup-phase latencies and live device-buffer counters.

use once_cell::sync::Lazy;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

/* ───────────── raw latencies ────────────────────────── */

static TIMES: Lazy<Mutex<Vec<(&'static str, u128)>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Call right after a phase: `record("build", t)` with `t` taken before it.
pub fn record(phase: &'static str, start: Instant) {
    let dur = start.elapsed().as_micros();
    TIMES.lock().unwrap_or_else(PoisonError::into_inner).push((phase, dur));
}

/* ───────────── buffer allocations ───────────────────── */

pub static ALLOCS: AtomicUsize = AtomicUsize::new(0);
pub static ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

/* ───────────── summary ──────────────────────────────── */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSummary {
    pub phase: &'static str,
    pub calls: usize,
    pub mean_us: u128,
    pub p95_us: u128,
}

/// Drains the recorded latencies, grouped by phase name.
pub fn take_summary() -> Vec<PhaseSummary> {
    let mut map: BTreeMap<&'static str, Vec<u128>> = BTreeMap::new();
    {
        let mut times = TIMES.lock().unwrap_or_else(PoisonError::into_inner);
        for (phase, us) in times.drain(..) {
            map.entry(phase).or_default().push(us);
        }
    }

    map.into_iter()
        .map(|(phase, mut v)| {
            v.sort_unstable();
            let mean_us = v.iter().sum::<u128>() / v.len() as u128;
            let p95_us = v[((v.len() * 95) / 100).saturating_sub(1)];
            PhaseSummary { phase, calls: v.len(), mean_us, p95_us }
        })
        .collect()
}

/// Prints the phase table and the buffers still alive. Call at the end of `main`.
pub fn summary() {
    println!("── metrics summary ──");
    for s in take_summary() {
        println!("{:<18} n={:<3} mean={:>8} µs   p95={:>8} µs", s.phase, s.calls, s.mean_us, s.p95_us);
    }

    let allocs = ALLOCS.load(Ordering::Relaxed);
    let bytes = ALLOC_BYTES.load(Ordering::Relaxed);
    println!("live device buffers: {}   ({} MiB)", allocs, bytes / 1024 / 1024);
}
