//! HTTP surface shared by the server and its clients.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_IMAGE_FORMAT, ScoredImage};

/// Route definitions shared across Plating services
pub mod routes {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const SCORE: &str = "/score";
    pub const SCORE_BATCH: &str = "/score-batch";
    pub const SCORE_FILE: &str = "/score-file";

    /// Every endpoint, in the order the info route advertises them.
    pub const ALL: [&str; 5] = [ROOT, HEALTH, SCORE, SCORE_BATCH, SCORE_FILE];
}

pub const IMAGE_SCORED: &str = "Image scored successfully";
pub const MODEL_READY: &str = "Aesthetics model is loaded and ready";

fn default_format() -> String {
    DEFAULT_IMAGE_FORMAT.to_string()
}

/// Body of a single-image scoring request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub image_data: String,
    #[serde(default = "default_format")]
    pub image_format: String,
}

impl ScoreRequest {
    pub fn new(image_data: impl Into<String>, image_format: impl Into<String>) -> Self {
        Self {
            image_data: image_data.into(),
            image_format: image_format.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub aesthetic_score: f64,
    pub image_format: String,
    pub image_size: String,
    pub message: String,
}

impl From<ScoredImage> for ScoreResponse {
    fn from(image: ScoredImage) -> Self {
        Self {
            aesthetic_score: image.score,
            image_size: image.size_label(),
            image_format: image.format,
            message: IMAGE_SCORED.to_string(),
        }
    }
}

/// Response for the multipart upload route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileScoreResponse {
    pub filename: Option<String>,
    pub aesthetic_score: f64,
    pub image_size: String,
    pub message: String,
}

impl FileScoreResponse {
    pub fn new(filename: Option<String>, image: &ScoredImage) -> Self {
        Self {
            filename,
            aesthetic_score: image.score,
            image_size: image.size_label(),
            message: IMAGE_SCORED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub scorer: String,
    pub message: String,
}

impl HealthResponse {
    pub fn healthy(scorer: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            model_loaded: true,
            scorer: scorer.into(),
            message: MODEL_READY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

impl ServiceInfo {
    pub fn current() -> Self {
        Self {
            message: "Plating image aesthetics API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints: routes::ALL.iter().map(|path| path.to_string()).collect(),
        }
    }
}
