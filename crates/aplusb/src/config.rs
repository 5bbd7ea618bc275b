use std::path::PathBuf;

use crate::{error::BenchError, stats::TrimWindow};

pub const DEFAULT_N: usize = 100 * 1000 * 1000;
pub const DEFAULT_GROUP_SIZE: usize = 128;
pub const DEFAULT_ITERATIONS: usize = 20;
pub const DEFAULT_KERNEL_PATH: &str = "src/cl/aplusb.cl";

/// Name of the kernel entry point.
pub const ENTRY_POINT: &str = "aplusb";

#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Elements per array.
    pub n: usize,
    /// Local work-group size.
    pub group_size: usize,
    /// Repetitions of each timed loop.
    pub iterations: usize,
    /// Generator seed; `None` seeds with `n`.
    pub seed: Option<u64>,
    pub kernel_path: PathBuf,
    pub trim: TrimWindow,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            n: DEFAULT_N,
            group_size: DEFAULT_GROUP_SIZE,
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            kernel_path: PathBuf::from(DEFAULT_KERNEL_PATH),
            trim: TrimWindow::default(),
        }
    }
}

impl BenchConfig {
    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_kernel_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kernel_path = path.into();
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(self.n as u64)
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.n == 0 {
            return Err(BenchError::Config("element count must be at least 1".into()));
        }
        if u32::try_from(self.n).is_err() {
            return Err(BenchError::Config(format!(
                "element count {} does not fit the kernel's uint argument",
                self.n
            )));
        }
        if self.group_size == 0 {
            return Err(BenchError::Config("work-group size must be at least 1".into()));
        }
        if self.iterations == 0 {
            return Err(BenchError::Config("iteration count must be at least 1".into()));
        }
        Ok(())
    }

    /// Bytes of one device buffer.
    pub fn buffer_bytes(&self) -> usize {
        self.n.saturating_mul(std::mem::size_of::<f32>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = BenchConfig::default();
        assert_eq!(c.n, 100_000_000);
        assert_eq!(c.group_size, 128);
        assert_eq!(c.iterations, 20);
        assert_eq!(c.seed(), 100_000_000);
        assert_eq!(c.buffer_bytes(), 400_000_000);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn explicit_seed_overrides_n() {
        let c = BenchConfig { seed: Some(7), ..BenchConfig::default() };
        assert_eq!(c.seed(), 7);
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(BenchConfig::default().with_n(0).validate().is_err());
        assert!(BenchConfig::default().with_iterations(0).validate().is_err());
        let c = BenchConfig { group_size: 0, ..BenchConfig::default() };
        assert!(matches!(c.validate(), Err(BenchError::Config(_))));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn rejects_n_above_uint() {
        let c = BenchConfig::default().with_n(u32::MAX as usize + 1);
        assert!(c.validate().is_err());
    }
}
