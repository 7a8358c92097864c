use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use image::ImageFormat;
use plating_core::{
    ModelHandle, ScratchManager,
    testing::{StaticScorer, encode_image},
};
use plating_server::{AppState, create_app, infra::config::Config};
use platingctl::{ClientError, PlatingClient};
use reqwest::StatusCode;
use tempfile::TempDir;

async fn spawn_server(model: ModelHandle, tempdir: &TempDir) -> Result<SocketAddr> {
    let mut config = Config::default();
    config.scoring.scratch_dir = tempdir.path().join("scratch");
    let scratch = ScratchManager::new(&config.scoring.scratch_dir)?;
    let app = create_app(AppState::new(Arc::new(config), model, Arc::new(scratch)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

#[tokio::test]
async fn scores_files_through_a_running_server() -> Result<()> {
    let tempdir = TempDir::new()?;
    let addr = spawn_server(ModelHandle::loaded(StaticScorer::new(0.7)), &tempdir).await?;
    let client = PlatingClient::new(format!("http://{addr}/"))?;

    let health = client.health().await?;
    assert!(health.model_loaded);

    let png = tempdir.path().join("wide.png");
    std::fs::write(&png, encode_image(30, 10, ImageFormat::Png))?;
    let jpeg = tempdir.path().join("square.jpg");
    std::fs::write(&jpeg, encode_image(8, 8, ImageFormat::Jpeg))?;

    let single = client.score_path(&png, None).await?;
    assert_eq!(single.image_format, "png");
    assert_eq!(single.image_size, "30x10");
    assert_eq!(single.aesthetic_score, 0.7);

    let batch = client.score_batch(&[png, jpeg], None).await?;
    assert_eq!(batch.total_submitted, 2);
    assert_eq!(batch.successful_count, 2);
    assert_eq!(batch.results[1].index(), 1);
    Ok(())
}

#[tokio::test]
async fn unavailable_model_surfaces_status() -> Result<()> {
    let tempdir = TempDir::new()?;
    let addr = spawn_server(ModelHandle::unavailable("none"), &tempdir).await?;
    let client = PlatingClient::new(format!("http://{addr}"))?;

    let info = client.info().await?;
    assert!(!info.endpoints.is_empty());

    match client.health().await {
        Err(ClientError::Status { status, body }) => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert!(body.contains("Model not loaded"));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn missing_file_is_reported_before_any_request() -> Result<()> {
    let client = PlatingClient::new("http://127.0.0.1:9")?;
    let missing = std::path::Path::new("does/not/exist.png");

    let err = client
        .score_path(missing, None)
        .await
        .expect_err("missing file must fail");
    assert!(matches!(err, ClientError::Read { .. }));
    Ok(())
}
