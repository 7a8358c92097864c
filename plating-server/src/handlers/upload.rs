use axum::{
    Json,
    extract::{Multipart, State},
};
use plating_core::{ImagePayload, api::FileScoreResponse};
use tracing::info;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

pub const FILE_FIELD: &str = "file";

/// `image/png` -> `png`; parameters and a `+xml`-style suffix are dropped.
fn format_from_content_type(content_type: &str) -> Option<String> {
    let subtype = content_type.strip_prefix("image/")?;
    let subtype = subtype.split(';').next()?.trim();
    let subtype = subtype.split('+').next()?.trim();
    (!subtype.is_empty()).then(|| subtype.to_ascii_lowercase())
}

/// Legacy multipart upload: the `file` field must carry an `image/*` type.
pub async fn score_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<FileScoreResponse>> {
    let pipeline = state.pipeline()?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let format = field
            .content_type()
            .and_then(format_from_content_type)
            .ok_or_else(|| AppError::bad_request("File must be an image"))?;
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;

        let scored = pipeline
            .run(ImagePayload::from_bytes(bytes.to_vec(), format))
            .await?;
        info!(
            filename = filename.as_deref().unwrap_or("<unnamed>"),
            score = scored.score,
            "uploaded image scored"
        );
        return Ok(Json(FileScoreResponse::new(filename, &scored)));
    }

    Err(AppError::bad_request("No file provided"))
}
