//! Boundary to the external aesthetics model.
//!
//! The model is opaque: it reads an image from a path and yields a
//! comparable scalar. It is loaded once before serving and shared
//! read-only by every request through a [`ModelHandle`].

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{error::ScoringError, scratch::ScratchHandle};

pub mod command;

pub use command::CommandScorer;

/// An aesthetics model that scores a filesystem-resident image.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Short identifier surfaced in health output and logs.
    fn name(&self) -> &str;

    /// Score the artifact behind `artifact`. Slow calls are expected; the
    /// caller owns timeouts.
    async fn score(&self, artifact: &ScratchHandle) -> Result<f64, ScoringError>;
}

/// Process-wide model state, decided once at startup.
#[derive(Clone)]
pub enum ModelHandle {
    Loaded(Arc<dyn Scorer>),
    Unavailable { reason: String },
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelHandle::Loaded(scorer) => f
                .debug_tuple("ModelHandle::Loaded")
                .field(&scorer.name())
                .finish(),
            ModelHandle::Unavailable { reason } => f
                .debug_struct("ModelHandle::Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

impl ModelHandle {
    pub fn loaded(scorer: impl Scorer + 'static) -> Self {
        ModelHandle::Loaded(Arc::new(scorer))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelHandle::Unavailable {
            reason: reason.into(),
        }
    }

    /// Turn the outcome of a startup probe into a handle.
    pub fn from_probe<S>(probe: Result<S, ScoringError>) -> Self
    where
        S: Scorer + 'static,
    {
        match probe {
            Ok(scorer) => Self::loaded(scorer),
            Err(err) => Self::unavailable(err.to_string()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelHandle::Loaded(_))
    }

    pub fn scorer(&self) -> Result<Arc<dyn Scorer>, ScoringError> {
        match self {
            ModelHandle::Loaded(scorer) => Ok(Arc::clone(scorer)),
            ModelHandle::Unavailable { reason } => {
                Err(ScoringError::Unavailable(reason.clone()))
            }
        }
    }
}
