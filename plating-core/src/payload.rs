//! Client-supplied image payloads and the batch entry classification done at
//! the orchestrator boundary.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::error::DecodeError;

/// Format assumed when a client does not declare one.
pub const DEFAULT_IMAGE_FORMAT: &str = "jpeg";

/// Encoded image bytes plus the format the client claims they are in.
///
/// The declared format is never checked against the bytes; decoding sniffs
/// the container from content and the hint only frames the scratch copy.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    encoded: Vec<u8>,
    format: String,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("encoded_len", &self.encoded.len())
            .field("format", &self.format)
            .finish()
    }
}

impl ImagePayload {
    pub fn from_bytes(encoded: Vec<u8>, format: impl Into<String>) -> Self {
        Self {
            encoded,
            format: format.into(),
        }
    }

    /// Decode the transport representation used by the JSON endpoints.
    pub fn from_base64(
        data: &str,
        format: impl Into<String>,
    ) -> Result<Self, DecodeError> {
        // Line-wrapped (MIME style) payloads are accepted.
        let compact: Vec<u8> = data
            .bytes()
            .filter(|byte| !byte.is_ascii_whitespace())
            .collect();
        let encoded = BASE64
            .decode(&compact)
            .map_err(|err| DecodeError::Base64(err.to_string()))?;
        Ok(Self::from_bytes(encoded, format))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.encoded
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn into_parts(self) -> (Vec<u8>, String) {
        (self.encoded, self.format)
    }
}

/// One element of a batch request, classified exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEntry {
    /// Carries base64 `image_data` and the declared `image_format`. A
    /// missing `image_format` becomes `"jpeg"`; a string one is kept as is.
    Valid { data: String, format: String },
    /// Has `image_data` but a field of the wrong type. Never scored; it
    /// yields an item error at its index.
    Invalid { reason: String },
    /// Not an object, or no `image_data` key at all. Skipped, never scored
    /// and never reported as an item error.
    Malformed,
}

impl BatchEntry {
    pub fn valid(data: impl Into<String>, format: impl Into<String>) -> Self {
        BatchEntry::Valid {
            data: data.into(),
            format: format.into(),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return BatchEntry::Malformed;
        };
        let Some(data) = object.get("image_data") else {
            return BatchEntry::Malformed;
        };
        let Some(data) = data.as_str() else {
            return BatchEntry::invalid("image_data must be a string");
        };
        let format = match object.get("image_format") {
            None => DEFAULT_IMAGE_FORMAT,
            Some(format) => match format.as_str() {
                Some(format) => format,
                None => return BatchEntry::invalid("image_format must be a string"),
            },
        };

        BatchEntry::valid(data, format)
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        BatchEntry::Invalid {
            reason: reason.into(),
        }
    }

    pub fn parse_all(values: &[Value]) -> Vec<Self> {
        values.iter().map(Self::from_json).collect()
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, BatchEntry::Malformed)
    }
}
