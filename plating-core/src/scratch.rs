//! Scratch artifacts: short-lived, uniquely named files holding a re-encoded
//! copy of a decoded image so the external scorer can read it from disk.
//!
//! A [`ScratchHandle`] owns exactly one file. [`ScratchHandle::release`]
//! consumes the handle, so a second release cannot be expressed; a handle
//! that is dropped without being released (panic, cancelled request) still
//! removes its file from `Drop`. [`ScratchManager::scoped`] wraps the whole
//! acquire → use → release sequence for callers.

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::future::BoxFuture;
use image::{DynamicImage, ImageFormat};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    decode::DecodedImage,
    error::{ItemError, ScratchError},
};

/// Encoders available for scratch artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScratchFormat {
    Jpeg,
    Png,
    Bmp,
    Gif,
    Tiff,
    WebP,
}

impl ScratchFormat {
    /// Map a client's declared format onto an encoder. Unknown hints fall
    /// back to JPEG.
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "jpe" | "jfif" => ScratchFormat::Jpeg,
            "png" => ScratchFormat::Png,
            "bmp" => ScratchFormat::Bmp,
            "gif" => ScratchFormat::Gif,
            "tif" | "tiff" => ScratchFormat::Tiff,
            "webp" => ScratchFormat::WebP,
            other => {
                debug!(hint = other, "unknown format hint, using jpeg");
                ScratchFormat::Jpeg
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ScratchFormat::Jpeg => "jpeg",
            ScratchFormat::Png => "png",
            ScratchFormat::Bmp => "bmp",
            ScratchFormat::Gif => "gif",
            ScratchFormat::Tiff => "tiff",
            ScratchFormat::WebP => "webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ScratchFormat::Jpeg => ImageFormat::Jpeg,
            ScratchFormat::Png => ImageFormat::Png,
            ScratchFormat::Bmp => ImageFormat::Bmp,
            ScratchFormat::Gif => ImageFormat::Gif,
            ScratchFormat::Tiff => ImageFormat::Tiff,
            ScratchFormat::WebP => ImageFormat::WebP,
        }
    }
}

#[derive(Debug, Default)]
struct ScratchCounters {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Process-wide issuer of scratch artifacts rooted at one directory.
///
/// Shared across requests behind an `Arc`; each handle it issues is owned
/// by a single pipeline invocation.
#[derive(Debug)]
pub struct ScratchManager {
    dir: PathBuf,
    counters: Arc<ScratchCounters>,
}

impl ScratchManager {
    /// Create the manager, making sure the scratch directory exists.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ScratchError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            counters: Arc::new(ScratchCounters::default()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifacts handed out since startup.
    pub fn acquired(&self) -> u64 {
        self.counters.acquired.load(Ordering::Acquire)
    }

    /// Artifacts removed since startup, explicitly or on drop.
    pub fn released(&self) -> u64 {
        self.counters.released.load(Ordering::Acquire)
    }

    pub fn outstanding(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }

    /// Re-encode `image` as `format` into a fresh, uniquely named file.
    ///
    /// Encoding happens on the blocking pool. A failed encode leaves nothing
    /// behind and is not counted as an acquisition.
    pub async fn acquire(
        &self,
        image: DecodedImage,
        format: ScratchFormat,
    ) -> Result<ScratchHandle, ScratchError> {
        let id = Uuid::new_v4();
        let dir = self.dir.clone();

        let file = tokio::task::spawn_blocking(move || {
            write_artifact(&dir, id, image, format)
        })
        .await
        .map_err(|err| ScratchError::Join(err.to_string()))??;

        self.counters.acquired.fetch_add(1, Ordering::AcqRel);
        let path = file.path().to_path_buf();
        debug!(scratch_id = %id, path = %path.display(), "scratch artifact acquired");

        Ok(ScratchHandle {
            id,
            path,
            format,
            file: Some(file),
            counters: Arc::clone(&self.counters),
        })
    }

    /// Acquire an artifact, hand it to `use_artifact`, then release it no
    /// matter how `use_artifact` finished.
    ///
    /// The error of `use_artifact` wins over a release error; a release
    /// failure after a successful use is reported as a [`ScratchError`].
    pub async fn scoped<T, E, F>(
        &self,
        image: DecodedImage,
        format: ScratchFormat,
        use_artifact: F,
    ) -> Result<T, ItemError>
    where
        F: for<'h> FnOnce(&'h ScratchHandle) -> BoxFuture<'h, Result<T, E>>,
        E: Into<ItemError>,
    {
        let handle = self.acquire(image, format).await?;
        let outcome = use_artifact(&handle).await;
        let released = handle.release();

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err.into()),
            (Err(err), Ok(())) => Err(err.into()),
            (Err(err), Err(release_err)) => {
                warn!(error = %release_err, "failed to release scratch artifact");
                Err(err.into())
            }
        }
    }
}

fn write_artifact(
    dir: &Path,
    id: Uuid,
    image: DecodedImage,
    format: ScratchFormat,
) -> Result<NamedTempFile, ScratchError> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("score-{id}-"))
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(file.as_file_mut());
        DynamicImage::ImageRgb8(image.into_pixels())
            .write_to(&mut writer, format.image_format())
            .map_err(|err| ScratchError::Encode {
                format: format.extension(),
                message: err.to_string(),
            })?;
        writer.flush()?;
    }

    Ok(file)
}

/// Exclusive ownership of one scratch artifact on disk.
pub struct ScratchHandle {
    id: Uuid,
    path: PathBuf,
    format: ScratchFormat,
    file: Option<NamedTempFile>,
    counters: Arc<ScratchCounters>,
}

impl std::fmt::Debug for ScratchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("format", &self.format)
            .field("released", &self.file.is_none())
            .finish()
    }
}

impl ScratchHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ScratchFormat {
        self.format
    }

    /// Remove the artifact. Only a successful removal counts as released.
    pub fn release(mut self) -> Result<(), ScratchError> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        if let Err(err) = file.close() {
            warn!(
                scratch_id = %self.id,
                path = %self.path.display(),
                error = %err,
                "failed to remove scratch artifact"
            );
            return Err(err.into());
        }

        self.counters.released.fetch_add(1, Ordering::AcqRel);
        debug!(scratch_id = %self.id, "scratch artifact released");
        Ok(())
    }
}

impl Drop for ScratchHandle {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            self.counters.released.fetch_add(1, Ordering::AcqRel);
            warn!(
                scratch_id = %self.id,
                path = %self.path.display(),
                "scratch artifact dropped without release, removing"
            );
            drop(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::error::ScoringError;
    use futures::FutureExt;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn sample_image(width: u32, height: u32) -> DecodedImage {
        let rgb = RgbImage::from_pixel(width, height, Rgb([12, 34, 56]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        decode(&out.into_inner()).unwrap()
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn format_hints_are_case_insensitive_with_jpeg_fallback() {
        assert_eq!(ScratchFormat::from_hint("JPG"), ScratchFormat::Jpeg);
        assert_eq!(ScratchFormat::from_hint(".png"), ScratchFormat::Png);
        assert_eq!(ScratchFormat::from_hint("Tif"), ScratchFormat::Tiff);
        assert_eq!(ScratchFormat::from_hint("heic"), ScratchFormat::Jpeg);
    }

    #[tokio::test]
    async fn acquire_writes_decodable_artifact_and_release_removes_it() {
        let tmp = TempDir::new().unwrap();
        let manager = ScratchManager::new(tmp.path()).unwrap();

        let handle = manager
            .acquire(sample_image(7, 5), ScratchFormat::Png)
            .await
            .unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "png");
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(&format!("score-{}-", handle.id()))
        );

        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (7, 5));

        handle.release().unwrap();
        assert!(!path.exists());
        assert_eq!(manager.acquired(), 1);
        assert_eq!(manager.released(), 1);
        assert_eq!(manager.outstanding(), 0);
    }

    #[tokio::test]
    async fn concurrent_acquisitions_never_collide() {
        let tmp = TempDir::new().unwrap();
        let manager = ScratchManager::new(tmp.path()).unwrap();

        let handles = futures::future::try_join_all(
            (0..8).map(|_| manager.acquire(sample_image(2, 2), ScratchFormat::Jpeg)),
        )
        .await
        .unwrap();

        assert_eq!(entries(tmp.path()), 8);
        for handle in handles {
            handle.release().unwrap();
        }
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn scoped_releases_when_use_fails() {
        let tmp = TempDir::new().unwrap();
        let manager = ScratchManager::new(tmp.path()).unwrap();

        let outcome: Result<f64, ItemError> = manager
            .scoped(sample_image(3, 3), ScratchFormat::Jpeg, |handle| {
                assert!(handle.path().exists());
                async { Err(ScoringError::Failed("boom".into())) }.boxed()
            })
            .await;

        assert!(matches!(outcome, Err(ItemError::Scoring(_))));
        assert_eq!(entries(tmp.path()), 0);
        assert_eq!(manager.acquired(), manager.released());
    }

    #[tokio::test]
    async fn failed_removal_is_not_counted_as_released() {
        let tmp = TempDir::new().unwrap();
        let manager = ScratchManager::new(tmp.path()).unwrap();

        let handle = manager
            .acquire(sample_image(2, 2), ScratchFormat::Png)
            .await
            .unwrap();
        fs::remove_file(handle.path()).unwrap();

        let err = handle.release().expect_err("removal of a missing file fails");
        assert!(matches!(err, ScratchError::Io(_)));
        assert_eq!(manager.acquired(), 1);
        assert_eq!(manager.released(), 0);
        assert_eq!(manager.outstanding(), 1);
    }

    #[tokio::test]
    async fn dropped_handle_is_still_removed() {
        let tmp = TempDir::new().unwrap();
        let manager = ScratchManager::new(tmp.path()).unwrap();

        let handle = manager
            .acquire(sample_image(1, 1), ScratchFormat::Bmp)
            .await
            .unwrap();
        let path = handle.path().to_path_buf();
        drop(handle);

        assert!(!path.exists());
        assert_eq!(manager.outstanding(), 0);
    }
}
