//! Per-item outcomes and the aggregate batch response, with their wire shape.

use serde::{Deserialize, Serialize};

/// Message attached to every completed batch.
pub const BATCH_COMPLETED: &str = "Batch scoring completed";

/// A successfully scored image.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredImage {
    /// Model output; conceptually in `[0, 1]` but not enforced.
    pub score: f64,
    pub width: u32,
    pub height: u32,
    /// Format the client declared, echoed back.
    pub format: String,
}

impl ScoredImage {
    /// `"WxH"` as reported on the wire.
    pub fn size_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Outcome of one batch item. Success and failure are exclusive; `index` is
/// the item's 0-based position in the submitted batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ItemResultWire", try_from = "ItemResultWire")]
pub enum ItemResult {
    Success { index: usize, image: ScoredImage },
    Failure { index: usize, error: String },
}

impl ItemResult {
    pub fn index(&self) -> usize {
        match self {
            ItemResult::Success { index, .. } | ItemResult::Failure { index, .. } => *index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemResult::Success { .. })
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            ItemResult::Success { image, .. } => Some(image.score),
            ItemResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ItemResult::Success { .. } => None,
            ItemResult::Failure { error, .. } => Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemResultWire {
    image_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aesthetic_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ItemResult> for ItemResultWire {
    fn from(result: ItemResult) -> Self {
        match result {
            ItemResult::Success { index, image } => ItemResultWire {
                image_index: index,
                aesthetic_score: Some(image.score),
                image_size: Some(image.size_label()),
                image_format: Some(image.format),
                error: None,
            },
            ItemResult::Failure { index, error } => ItemResultWire {
                image_index: index,
                aesthetic_score: None,
                image_format: None,
                image_size: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<ItemResultWire> for ItemResult {
    type Error = String;

    fn try_from(wire: ItemResultWire) -> Result<Self, Self::Error> {
        if let Some(error) = wire.error {
            return Ok(ItemResult::Failure {
                index: wire.image_index,
                error,
            });
        }

        let score = wire
            .aesthetic_score
            .ok_or("item result has neither aesthetic_score nor error")?;
        let (width, height) = match wire.image_size.as_deref() {
            Some(size) => parse_size_label(size)
                .ok_or_else(|| format!("invalid image_size {size:?}"))?,
            None => (0, 0),
        };

        Ok(ItemResult::Success {
            index: wire.image_index,
            image: ScoredImage {
                score,
                width,
                height,
                format: wire.image_format.unwrap_or_default(),
            },
        })
    }
}

fn parse_size_label(label: &str) -> Option<(u32, u32)> {
    let (width, height) = label.split_once('x')?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

/// Aggregate response for a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    /// In submission order; malformed entries have no result.
    pub results: Vec<ItemResult>,
    #[serde(rename = "total_images")]
    pub total_submitted: usize,
    #[serde(rename = "successful_images")]
    pub successful_count: usize,
    /// Indices of entries that were skipped as malformed.
    #[serde(rename = "skipped_images", default)]
    pub skipped: Vec<usize>,
    pub message: String,
}

impl BatchResponse {
    pub fn new(
        results: Vec<ItemResult>,
        total_submitted: usize,
        skipped: Vec<usize>,
    ) -> Self {
        let successful_count =
            results.iter().filter(|result| result.is_success()).count();
        Self {
            results,
            total_submitted,
            successful_count,
            skipped,
            message: BATCH_COMPLETED.to_string(),
        }
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.successful_count
    }
}
