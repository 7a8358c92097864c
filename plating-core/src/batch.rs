//! Batch orchestration.
//!
//! Preconditions (non-empty, bounded size) are checked before any item is
//! touched. After that the batch always completes: each valid entry runs
//! through the [`ItemPipeline`] with bounded concurrency and lands in the
//! slot of its submission index, so completion order never leaks into the
//! response.

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{BatchError, DecodeError},
    payload::BatchEntry,
    pipeline::{ItemPipeline, item_failure},
    result::{BatchResponse, ItemResult},
};

pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Largest accepted batch, malformed entries included.
    pub max_batch_size: usize,
    /// Items scored at the same time within one batch.
    pub concurrency: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    pipeline: ItemPipeline,
    limits: BatchLimits,
}

impl BatchOrchestrator {
    pub fn new(pipeline: ItemPipeline, limits: BatchLimits) -> Self {
        Self { pipeline, limits }
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    pub fn pipeline(&self) -> &ItemPipeline {
        &self.pipeline
    }

    /// Request-level preconditions.
    pub fn check(&self, submitted: usize) -> Result<(), BatchError> {
        if submitted == 0 {
            return Err(BatchError::Empty);
        }
        if submitted > self.limits.max_batch_size {
            return Err(BatchError::TooLarge {
                submitted,
                max: self.limits.max_batch_size,
            });
        }
        Ok(())
    }

    /// Classify raw JSON entries and score them.
    pub async fn score_json(
        &self,
        values: &[Value],
    ) -> Result<BatchResponse, BatchError> {
        self.score_batch(BatchEntry::parse_all(values)).await
    }

    pub async fn score_batch(
        &self,
        entries: Vec<BatchEntry>,
    ) -> Result<BatchResponse, BatchError> {
        let total = entries.len();
        self.check(total)?;

        let mut slots: Vec<Option<ItemResult>> =
            (0..total).map(|_| None).collect();
        let mut skipped = Vec::new();
        let mut work = Vec::with_capacity(total);
        for (index, entry) in entries.into_iter().enumerate() {
            match entry {
                BatchEntry::Valid { data, format } => {
                    work.push((index, data, format))
                }
                BatchEntry::Invalid { reason } => {
                    slots[index] = Some(item_failure(
                        index,
                        DecodeError::InvalidEntry(reason).into(),
                    ));
                }
                BatchEntry::Malformed => {
                    debug!(index, "skipping malformed batch entry");
                    skipped.push(index);
                }
            }
        }

        let pipeline = &self.pipeline;
        let mut completions = futures::stream::iter(work)
            .map(|(index, data, format)| async move {
                pipeline.process(index, &data, &format).await
            })
            .buffer_unordered(self.limits.concurrency.max(1));

        while let Some(result) = completions.next().await {
            let index = result.index();
            slots[index] = Some(result);
        }

        let results: Vec<ItemResult> = slots.into_iter().flatten().collect();
        let response = BatchResponse::new(results, total, skipped);

        info!(
            total,
            successful = response.successful_count,
            failed = response.failed_count(),
            skipped = response.skipped.len(),
            "batch scoring completed"
        );

        Ok(response)
    }
}
