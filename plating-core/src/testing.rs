//! Stub scorers and fixture helpers for tests.

use std::{
    io::Cursor,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::{error::ScoringError, scorer::Scorer, scratch::ScratchHandle};

/// Encode a gradient image of the given size.
pub fn encode_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let rgb = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 17 % 256) as u8, (y * 29 % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut out, format)
        .expect("encode fixture image");
    out.into_inner()
}

pub fn encode_image_base64(width: u32, height: u32, format: ImageFormat) -> String {
    BASE64.encode(encode_image(width, height, format))
}

/// What a scorer observed about an artifact while scoring it.
#[derive(Debug, Clone)]
pub struct SeenArtifact {
    pub path: PathBuf,
    pub existed: bool,
}

/// Returns a fixed score and records every artifact it was handed.
#[derive(Debug, Clone)]
pub struct StaticScorer {
    score: f64,
    seen: Arc<Mutex<Vec<SeenArtifact>>>,
}

impl StaticScorer {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<SeenArtifact>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl Scorer for StaticScorer {
    fn name(&self) -> &str {
        "static"
    }

    async fn score(&self, artifact: &ScratchHandle) -> Result<f64, ScoringError> {
        let path = artifact.path().to_path_buf();
        let existed = path.exists();
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(SeenArtifact { path, existed });
        }
        Ok(self.score)
    }
}

/// Always fails with [`ScoringError::Failed`].
#[derive(Debug, Clone)]
pub struct FailingScorer {
    message: String,
}

impl FailingScorer {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Scorer for FailingScorer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn score(&self, _artifact: &ScratchHandle) -> Result<f64, ScoringError> {
        Err(ScoringError::Failed(self.message.clone()))
    }
}

/// Panics mid-call.
#[derive(Debug, Clone, Copy)]
pub struct PanickingScorer;

#[async_trait]
impl Scorer for PanickingScorer {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn score(&self, _artifact: &ScratchHandle) -> Result<f64, ScoringError> {
        panic!("model crashed")
    }
}

/// Sleeps before answering.
#[derive(Debug, Clone, Copy)]
pub struct SlowScorer {
    delay: Duration,
    score: f64,
}

impl SlowScorer {
    pub fn new(delay: Duration, score: f64) -> Self {
        Self { delay, score }
    }
}

#[async_trait]
impl Scorer for SlowScorer {
    fn name(&self) -> &str {
        "slow"
    }

    async fn score(&self, _artifact: &ScratchHandle) -> Result<f64, ScoringError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.score)
    }
}

/// Scores by image width so results can be told apart by index.
#[derive(Debug, Clone, Copy)]
pub struct WidthScorer;

#[async_trait]
impl Scorer for WidthScorer {
    fn name(&self) -> &str {
        "width"
    }

    async fn score(&self, artifact: &ScratchHandle) -> Result<f64, ScoringError> {
        let path = artifact.path().to_path_buf();
        let (width, _) = tokio::task::spawn_blocking(move || image::image_dimensions(path))
            .await
            .map_err(|err| ScoringError::Failed(err.to_string()))?
            .map_err(|err| ScoringError::Failed(err.to_string()))?;
        Ok(f64::from(width) / 100.0)
    }
}
