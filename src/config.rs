//! Run configuration, passed explicitly into the pipeline.

use std::num::NonZeroUsize;

use crate::filters::stencil::Narrowing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Number of ranks in the worker group, coordinator included.
    pub workers: usize,
    pub narrowing: Narrowing,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            narrowing: Narrowing::Wrap,
        }
    }
}

impl FilterConfig {
    /// One worker per available hardware thread.
    pub fn auto() -> Self {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::default().with_workers(workers)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_narrowing(mut self, narrowing: Narrowing) -> Self {
        self.narrowing = narrowing;
        self
    }

    /// Same configuration with `workers` capped at `pixels`, so small images
    /// still get a valid partition.
    pub fn capped_to(self, pixels: usize) -> Self {
        let workers = self.workers.min(pixels).max(1);
        self.with_workers(workers)
    }
}
