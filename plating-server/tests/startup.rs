use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use plating_core::api::routes;
use plating_server::{
    create_app,
    infra::{config::Config, startup::build_state},
};
use tempfile::TempDir;

fn config_in(tempdir: &TempDir) -> Config {
    let mut config = Config::default();
    config.scoring.scratch_dir = tempdir.path().join("nested").join("scratch");
    config
}

#[tokio::test]
async fn missing_scorer_program_still_serves() -> Result<()> {
    let tempdir = TempDir::new()?;
    let state = build_state(config_in(&tempdir))?;

    assert!(!state.model.is_loaded());
    assert!(state.scratch.dir().is_dir());

    let server = TestServer::new(create_app(state))
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    server.get(routes::ROOT).await.assert_status_ok();
    server
        .get(routes::HEALTH)
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn unresolvable_scorer_program_leaves_model_unavailable() -> Result<()> {
    let tempdir = TempDir::new()?;
    let mut config = config_in(&tempdir);
    config.scorer.program = Some("plating-scorer-that-does-not-exist".into());

    let state = build_state(config)?;
    assert!(!state.model.is_loaded());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn resolvable_scorer_program_loads_model() -> Result<()> {
    let tempdir = TempDir::new()?;
    let mut config = config_in(&tempdir);
    config.scorer.program = Some("sh".into());
    config.scorer.args = vec!["-c".into(), "echo 0.5".into(), "scorer".into()];

    let state = build_state(config)?;
    assert!(state.model.is_loaded());

    let server = TestServer::new(create_app(state))
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    server.get(routes::HEALTH).await.assert_status_ok();
    Ok(())
}

#[tokio::test]
async fn permissive_cors_answers_any_origin() -> Result<()> {
    let tempdir = TempDir::new()?;
    let state = build_state(config_in(&tempdir))?;
    let server = TestServer::new(create_app(state))
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    let response = server
        .get(routes::ROOT)
        .add_header("origin", "http://example.test")
        .await;
    response.assert_status_ok();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
    Ok(())
}

#[tokio::test]
async fn origin_allow_list_is_enforced() -> Result<()> {
    let tempdir = TempDir::new()?;
    let mut config = config_in(&tempdir);
    config.cors.allowed_origins = vec!["http://allowed.test".into()];
    let server = TestServer::new(create_app(build_state(config)?))
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    let allowed = server
        .get(routes::ROOT)
        .add_header("origin", "http://allowed.test")
        .await;
    assert_eq!(
        allowed
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("http://allowed.test")
    );

    let denied = server
        .get(routes::ROOT)
        .add_header("origin", "http://other.test")
        .await;
    assert!(denied.headers().get("access-control-allow-origin").is_none());
    Ok(())
}
