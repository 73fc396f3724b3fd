use std::sync::Arc;

use tracing::info;

use crate::enums::ExecutorKind;
use crate::error::Result;
use crate::executor::{RayonExecutor, Task, TaskExecutor, TokioExecutor};
use crate::extractor::{FeatureRecord, RegionExtractor};
use crate::region::Region;
use crate::volume::Volume;

/// Upper bound on concurrent extractions; each backend call is CPU and
/// memory heavy.
pub const MAX_WORKERS: usize = 8;

/// Fans regions out over a bounded pool and gathers non-empty records in
/// completion order.
#[derive(Clone)]
pub struct ExtractionCoordinator {
    extractor: RegionExtractor,
    max_workers: usize,
    executor: ExecutorKind,
}

impl ExtractionCoordinator {
    pub fn new(extractor: RegionExtractor) -> Self {
        Self {
            extractor,
            max_workers: MAX_WORKERS,
            executor: ExecutorKind::default(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_executor(mut self, executor: ExecutorKind) -> Self {
        self.executor = executor;
        self
    }

    /// Pool size used for a batch of `region_count` regions.
    pub fn worker_count(&self, region_count: usize) -> usize {
        self.max_workers.min(region_count)
    }

    /// Extract every region of the batch.
    ///
    /// Only fails when the worker pool cannot be created; a failing region
    /// simply contributes no record.
    pub fn run_batch(&self, volume: Arc<Volume>, regions: Vec<Region>) -> Result<Vec<FeatureRecord>> {
        if regions.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.worker_count(regions.len());
        info!(
            regions = regions.len(),
            workers, "Starting radiomics extraction"
        );

        let records = match self.executor {
            ExecutorKind::Rayon => self.run_on(&RayonExecutor::with_workers(workers)?, volume, regions),
            ExecutorKind::Tokio => self.run_on(&TokioExecutor::with_workers(workers)?, volume, regions),
        };
        Ok(records)
    }

    fn run_on<E: TaskExecutor>(
        &self,
        executor: &E,
        volume: Arc<Volume>,
        regions: Vec<Region>,
    ) -> Vec<FeatureRecord> {
        let tasks: Vec<Task<Option<FeatureRecord>>> = regions
            .into_iter()
            .map(|region| {
                let extractor = self.extractor.clone();
                let volume = Arc::clone(&volume);
                Box::new(move || extractor.extract_one(&volume, &region)) as Task<_>
            })
            .collect();

        let mut records = Vec::new();
        executor.run_all(tasks, |record| records.extend(record));
        records
    }
}
