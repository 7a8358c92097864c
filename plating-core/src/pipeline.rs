//! Single-item pipeline: decode → scratch acquire → score → scratch release.
//!
//! [`ItemPipeline::run`] exposes the typed failure for callers that score one
//! image on its own. [`ItemPipeline::process`] is what the batch orchestrator
//! uses: it cannot fail and always yields an [`ItemResult`].

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;
use tracing::{debug, warn};

use crate::{
    decode::decode,
    error::{DecodeError, ItemError, ScoringError},
    payload::ImagePayload,
    result::{ItemResult, ScoredImage},
    scorer::Scorer,
    scratch::{ScratchFormat, ScratchHandle, ScratchManager},
};

/// Default upper bound on one scorer call.
pub const DEFAULT_SCORER_TIMEOUT: Duration = Duration::from_secs(60);

/// Composes the stages for one image. Cheap to clone; clones share the
/// scratch manager and model.
#[derive(Clone)]
pub struct ItemPipeline {
    scratch: Arc<ScratchManager>,
    scorer: Arc<dyn Scorer>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ItemPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemPipeline")
            .field("scratch_dir", &self.scratch.dir())
            .field("scorer", &self.scorer.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ItemPipeline {
    pub fn new(scratch: Arc<ScratchManager>, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            scratch,
            scorer,
            timeout: Some(DEFAULT_SCORER_TIMEOUT),
        }
    }

    /// Bound each scorer call; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn scratch(&self) -> &Arc<ScratchManager> {
        &self.scratch
    }

    /// Score one payload, reporting which stage failed.
    pub async fn run(&self, payload: ImagePayload) -> Result<ScoredImage, ItemError> {
        let (bytes, format) = payload.into_parts();

        let decoded = tokio::task::spawn_blocking(move || decode(&bytes))
            .await
            .map_err(|err| DecodeError::Join(err.to_string()))??;
        let (width, height) = decoded.dimensions();

        let scorer = Arc::clone(&self.scorer);
        let timeout = self.timeout;
        let score = self
            .scratch
            .scoped(decoded, ScratchFormat::from_hint(&format), move |handle| {
                score_artifact(scorer, handle, timeout).boxed()
            })
            .await?;

        debug!(score, width, height, %format, "image scored");

        Ok(ScoredImage {
            score,
            width,
            height,
            format,
        })
    }

    /// Score base64 transport data.
    pub async fn run_base64(
        &self,
        data: &str,
        format: impl Into<String>,
    ) -> Result<ScoredImage, ItemError> {
        let payload = ImagePayload::from_base64(data, format)?;
        self.run(payload).await
    }

    /// Score one batch entry; every failure is captured in the result.
    pub async fn process(&self, index: usize, data: &str, format: &str) -> ItemResult {
        match self.run_base64(data, format).await {
            Ok(image) => ItemResult::Success { index, image },
            Err(err) => item_failure(index, err),
        }
    }
}

/// The per-item error record reported in a batch response.
pub fn item_failure(index: usize, err: ItemError) -> ItemResult {
    warn!(index, error = %err, "image failed to score");
    ItemResult::Failure {
        index,
        error: format!("Failed to process image: {err}"),
    }
}

async fn score_artifact(
    scorer: Arc<dyn Scorer>,
    handle: &ScratchHandle,
    timeout: Option<Duration>,
) -> Result<f64, ScoringError> {
    let call = AssertUnwindSafe(scorer.score(handle)).catch_unwind();

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| ScoringError::Timeout(limit))?,
        None => call.await,
    };

    outcome.unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|msg| msg.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ScoringError::Panicked(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FailingScorer, PanickingScorer, SlowScorer, StaticScorer, encode_image,
        encode_image_base64,
    };
    use image::ImageFormat;
    use tempfile::TempDir;

    fn pipeline(tmp: &TempDir, scorer: impl Scorer + 'static) -> ItemPipeline {
        let scratch = Arc::new(ScratchManager::new(tmp.path()).unwrap());
        ItemPipeline::new(scratch, Arc::new(scorer))
    }

    fn scratch_is_empty(tmp: &TempDir) -> bool {
        std::fs::read_dir(tmp.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn scores_and_reports_dimensions() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, StaticScorer::new(0.75));

        let payload = ImagePayload::from_bytes(
            encode_image(10, 10, ImageFormat::Jpeg),
            "jpeg",
        );
        let scored = pipeline.run(payload).await.unwrap();

        assert_eq!(scored.score, 0.75);
        assert_eq!((scored.width, scored.height), (10, 10));
        assert_eq!(scored.format, "jpeg");
        assert!(scratch_is_empty(&tmp));
        assert_eq!(pipeline.scratch().acquired(), 1);
        assert_eq!(pipeline.scratch().released(), 1);
    }

    #[tokio::test]
    async fn scorer_sees_a_live_artifact_in_the_declared_format() {
        let tmp = TempDir::new().unwrap();
        let scorer = StaticScorer::new(0.5);
        let seen = scorer.seen();
        let pipeline = pipeline(&tmp, scorer);

        let data = encode_image_base64(4, 4, ImageFormat::Jpeg);
        pipeline.run_base64(&data, "PNG").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].existed);
        assert_eq!(seen[0].path.extension().unwrap(), "png");
        assert!(!seen[0].path.exists());
    }

    #[tokio::test]
    async fn decode_failure_never_touches_scratch() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, StaticScorer::new(0.5));

        let err = pipeline
            .run(ImagePayload::from_bytes(b"garbage".to_vec(), "jpeg"))
            .await
            .expect_err("garbage must not decode");

        assert!(matches!(err, ItemError::Decode(DecodeError::Unrecognized)));
        assert_eq!(pipeline.scratch().acquired(), 0);
    }

    #[tokio::test]
    async fn failing_scorer_still_releases_scratch() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, FailingScorer::new("model exploded"));

        let result = pipeline
            .process(0, &encode_image_base64(6, 6, ImageFormat::Png), "png")
            .await;

        assert_eq!(
            result.error(),
            Some("Failed to process image: scorer failed: model exploded")
        );
        assert!(scratch_is_empty(&tmp));
        assert_eq!(pipeline.scratch().outstanding(), 0);
    }

    #[tokio::test]
    async fn panicking_scorer_becomes_item_error() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, PanickingScorer);

        let result = pipeline
            .process(3, &encode_image_base64(2, 2, ImageFormat::Png), "png")
            .await;

        assert_eq!(result.index(), 3);
        assert!(result.error().unwrap().contains("scorer panicked"));
        assert!(scratch_is_empty(&tmp));
    }

    #[tokio::test]
    async fn slow_scorer_times_out_per_item() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, SlowScorer::new(Duration::from_secs(5), 0.5))
            .with_timeout(Some(Duration::from_millis(50)));

        let err = pipeline
            .run_base64(&encode_image_base64(2, 2, ImageFormat::Png), "png")
            .await
            .expect_err("slow scorer must time out");

        assert!(matches!(err, ItemError::Scoring(ScoringError::Timeout(_))));
        assert!(scratch_is_empty(&tmp));
    }

    #[tokio::test]
    async fn repeated_scoring_reports_same_dimensions() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, StaticScorer::new(0.3));
        let data = encode_image_base64(13, 7, ImageFormat::Png);

        let first = pipeline.run_base64(&data, "png").await.unwrap();
        let second = pipeline.run_base64(&data, "png").await.unwrap();
        assert_eq!(
            (first.width, first.height),
            (second.width, second.height)
        );
    }
}
