use std::{fmt, sync::Arc};

use plating_core::{BatchOrchestrator, ItemPipeline, ModelHandle, ScratchManager};

use crate::infra::{
    config::Config,
    errors::{AppError, AppResult},
};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Loaded once before serving; never swapped at runtime.
    pub model: ModelHandle,
    pub scratch: Arc<ScratchManager>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("model", &self.model)
            .field("scratch_dir", &self.scratch.dir())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        model: ModelHandle,
        scratch: Arc<ScratchManager>,
    ) -> Self {
        Self {
            config,
            model,
            scratch,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pipeline for one request, or 503 when the model never loaded.
    pub fn pipeline(&self) -> AppResult<ItemPipeline> {
        let scorer = self
            .model
            .scorer()
            .map_err(|_| AppError::model_unavailable())?;
        Ok(ItemPipeline::new(Arc::clone(&self.scratch), scorer)
            .with_timeout(self.config.scoring.timeout))
    }

    pub fn orchestrator(&self) -> AppResult<BatchOrchestrator> {
        Ok(BatchOrchestrator::new(
            self.pipeline()?,
            self.config.scoring.limits(),
        ))
    }
}
