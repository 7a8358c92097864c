//! # Plating Core
//!
//! The request-processing pipeline behind the Plating image aesthetics
//! service.
//!
//! ## Overview
//!
//! A client submits one image or a batch of images; each is scored by an
//! external aesthetics model that the service treats as a black box. This
//! crate owns everything between the transport and that model:
//!
//! - **Decoding** ([`decode`]): content-sniffed decoding into a single RGB8
//!   layout, whatever the source encoding.
//! - **Scratch artifacts** ([`scratch`]): the model reads from disk, so each
//!   decoded image is re-encoded into a uniquely named temp file whose
//!   removal is guaranteed on every exit path.
//! - **Scorer adapter** ([`scorer`]): the [`Scorer`] seam plus a process-wide
//!   [`ModelHandle`] loaded once at startup.
//! - **Item pipeline** ([`pipeline`]): decode → acquire → score → release for
//!   one image, with failures captured per item.
//! - **Batch orchestration** ([`batch`]): request-level preconditions,
//!   bounded fan-out and an ordered, partially successful response.
//! - **HTTP surface** ([`api`]): route paths and request/response bodies
//!   shared by the server and `platingctl`.
//!
//! ## Feature Flags
//!
//! - `test-utils`: exports stub scorers and fixture encoders from
//!   [`testing`].

pub mod api;
pub mod batch;
pub mod decode;
pub mod error;
pub mod payload;
pub mod pipeline;
pub mod result;
pub mod scorer;
pub mod scratch;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use batch::{BatchLimits, BatchOrchestrator};
pub use decode::{DecodedImage, decode};
pub use error::{BatchError, DecodeError, ItemError, ScoringError, ScratchError};
pub use payload::{BatchEntry, DEFAULT_IMAGE_FORMAT, ImagePayload};
pub use pipeline::{DEFAULT_SCORER_TIMEOUT, ItemPipeline};
pub use result::{BatchResponse, ItemResult, ScoredImage};
pub use scorer::{CommandScorer, ModelHandle, Scorer};
pub use scratch::{ScratchFormat, ScratchHandle, ScratchManager};
