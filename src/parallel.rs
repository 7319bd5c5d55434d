//! Parallel processing configuration and management
//!
//! Passes are sequential unless [`ParallelConfig::per_file`] is set, in which case
//! files are folded concurrently on a Rayon pool and their partial accumulators are
//! merged in file order.

use crate::errors::{Result, SampleError};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Worker threads of the per-file pool; `None` uses Rayon's global pool
    pub num_threads: Option<usize>,
    /// Fold files concurrently instead of one after another
    pub per_file: bool,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    #[must_use]
    pub fn new(num_threads: Option<usize>) -> Self {
        Self {
            num_threads,
            per_file: false,
        }
    }

    /// Create a configuration that uses a specific number of threads
    #[must_use]
    pub fn with_threads(num_threads: usize) -> Self {
        Self::new(Some(num_threads))
    }

    #[must_use]
    pub fn per_file(mut self, yes: bool) -> Self {
        self.per_file = yes;
        self
    }

    /// Build a dedicated pool for one pass; `None` means use the global pool.
    pub fn build_pool(&self) -> Result<Option<ThreadPool>> {
        self.num_threads
            .map(|n| {
                ThreadPoolBuilder::new().num_threads(n).build().map_err(|e| {
                    SampleError::ThreadPool(format!("Failed to build pool with {n} threads: {e}"))
                })
            })
            .transpose()
    }
}

/// Get information about the current parallel configuration
#[must_use]
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
        available_parallelism: std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
    pub available_parallelism: usize,
}

impl ParallelInfo {
    /// Print parallel processing information
    pub fn print_info(&self) {
        println!("📊 Parallel Processing Information:");
        println!("   Current threads: {}", self.current_threads);
        println!("   Available CPU cores: {}", self.available_cores);
        println!("   Available parallelism: {}", self.available_parallelism);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sequential() {
        let config = ParallelConfig::default();
        assert_eq!(config.num_threads, None);
        assert!(!config.per_file);
        assert!(config.build_pool().unwrap().is_none());
    }

    #[test]
    fn dedicated_pool_has_requested_threads() {
        let config = ParallelConfig::with_threads(2).per_file(true);
        let pool = config.build_pool().unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }

    #[test]
    fn info_reports_at_least_one_core() {
        let info = get_parallel_info();
        assert!(info.available_cores >= 1);
        assert!(info.available_parallelism >= 1);
    }
}
