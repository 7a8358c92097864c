#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum_test::TestServer;
use plating_core::{ModelHandle, Scorer, ScratchManager};
use plating_server::{
    AppState, create_app,
    infra::config::Config,
};
use tempfile::TempDir;

#[derive(Debug)]
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    _tempdir: TempDir,
}

impl TestApp {
    pub fn scratch(&self) -> &ScratchManager {
        &self.state.scratch
    }

    /// Files still present in the scratch directory.
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.state.scratch.dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn build_test_app(model: ModelHandle) -> Result<TestApp> {
    build_test_app_with(model, |_| {})
}

pub fn build_test_app_with<F>(model: ModelHandle, configure: F) -> Result<TestApp>
where
    F: FnOnce(&mut Config),
{
    let tempdir = TempDir::new()?;
    let mut config = Config::default();
    config.scoring.scratch_dir = tempdir.path().join("scratch");
    configure(&mut config);

    let scratch = ScratchManager::new(&config.scoring.scratch_dir)?;
    let state = AppState::new(Arc::new(config), model, Arc::new(scratch));
    let server = TestServer::new(create_app(state.clone()))
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        state,
        _tempdir: tempdir,
    })
}

pub fn loaded(scorer: impl Scorer + 'static) -> ModelHandle {
    ModelHandle::loaded(scorer)
}

pub fn unavailable() -> ModelHandle {
    ModelHandle::unavailable("no scorer program configured")
}
