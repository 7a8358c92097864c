use std::time::Duration;

use thiserror::Error;

/// Failures turning an encoded payload into pixels.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image payload is empty")]
    Empty,

    #[error("invalid base64 image data: {0}")]
    Base64(String),

    #[error("invalid image entry: {0}")]
    InvalidEntry(String),

    #[error("unrecognized image container")]
    Unrecognized,

    #[error("cannot decode image: {0}")]
    Malformed(String),

    #[error("decode task failed: {0}")]
    Join(String),
}

/// Failures materializing or removing a scratch artifact.
#[derive(Error, Debug)]
pub enum ScratchError {
    #[error("scratch I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode scratch artifact as {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("scratch task failed: {0}")]
    Join(String),
}

/// Failures reported by (or around) the external aesthetics model.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("scorer unavailable: {0}")]
    Unavailable(String),

    #[error("scorer failed: {0}")]
    Failed(String),

    #[error("scorer returned an unusable score: {0}")]
    InvalidOutput(String),

    #[error("scorer timed out after {}", humanize(.0))]
    Timeout(Duration),

    #[error("scorer panicked: {0}")]
    Panicked(String),
}

/// Everything that can end a single item's pipeline early.
///
/// These never escape [`crate::pipeline::ItemPipeline::process`]; they are
/// folded into an [`crate::ItemResult::Failure`].
#[derive(Error, Debug)]
pub enum ItemError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Scratch(#[from] ScratchError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl ItemError {
    /// Whether the failure was caused by the client's payload rather than
    /// the service.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, ItemError::Decode(_))
    }
}

/// Request-level rejections, raised before any item is processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("No images provided")]
    Empty,

    #[error("Maximum {max} images allowed per batch (got {submitted})")]
    TooLarge { submitted: usize, max: usize },
}

fn humanize(duration: &Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_errors_render_client_messages() {
        assert_eq!(BatchError::Empty.to_string(), "No images provided");
        assert_eq!(
            BatchError::TooLarge {
                submitted: 11,
                max: 10
            }
            .to_string(),
            "Maximum 10 images allowed per batch (got 11)"
        );
    }

    #[test]
    fn item_error_is_transparent_over_its_cause() {
        let err = ItemError::from(ScoringError::Timeout(Duration::from_secs(5)));
        assert_eq!(err.to_string(), "scorer timed out after 5s");
        assert!(!err.is_client_fault());
        assert!(ItemError::from(DecodeError::Empty).is_client_fault());
    }
}
