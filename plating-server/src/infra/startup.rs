use std::sync::Arc;

use anyhow::{Context, Result};
use plating_core::{CommandScorer, ModelHandle, ScratchManager};
use tracing::{info, warn};

use crate::infra::{
    app_state::AppState,
    config::{Config, ScorerConfig},
};

/// Resolve the external model once. Failure is not fatal: the server still
/// starts and reports the model as unavailable.
pub fn load_model(scorer: &ScorerConfig) -> ModelHandle {
    let Some(program) = scorer.program.as_deref() else {
        warn!("no scorer program configured, model unavailable");
        return ModelHandle::unavailable("no scorer program configured");
    };

    let handle =
        ModelHandle::from_probe(CommandScorer::probe(program, scorer.args.clone()));
    match &handle {
        ModelHandle::Loaded(scorer) => {
            info!(scorer = scorer.name(), "aesthetics model loaded");
        }
        ModelHandle::Unavailable { reason } => {
            warn!(%reason, "aesthetics model failed to load");
        }
    }
    handle
}

/// Build the application state from a fully resolved configuration.
pub fn build_state(config: Config) -> Result<AppState> {
    let scratch = ScratchManager::new(&config.scoring.scratch_dir)
        .with_context(|| {
            format!(
                "failed to prepare scratch directory {}",
                config.scoring.scratch_dir.display()
            )
        })?;
    info!(
        scratch_dir = %scratch.dir().display(),
        max_batch_size = config.scoring.max_batch_size,
        concurrency = config.scoring.concurrency,
        timeout = ?config.scoring.timeout,
        "scoring pipeline configured"
    );

    let model = load_model(&config.scorer);
    Ok(AppState::new(Arc::new(config), model, Arc::new(scratch)))
}
