use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::Scorer;
use crate::{error::ScoringError, scratch::ScratchHandle};

/// Scores images by running an external program once per artifact.
///
/// The program is invoked as `program [args...] <artifact-path>` and must
/// print the score as the last non-empty line on stdout.
#[derive(Debug, Clone)]
pub struct CommandScorer {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandScorer {
    /// Resolve `program` on `PATH` (or as a path) so a missing model is
    /// detected before the first request.
    pub fn probe(
        program: impl AsRef<OsStr>,
        args: Vec<String>,
    ) -> Result<Self, ScoringError> {
        let program = program.as_ref();
        let resolved = which::which(program).map_err(|err| {
            ScoringError::Unavailable(format!(
                "cannot locate scorer program {}: {err}",
                Path::new(program).display()
            ))
        })?;

        let name = resolved
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| resolved.display().to_string());

        info!(program = %resolved.display(), ?args, "scorer program resolved");

        Ok(Self {
            program: resolved,
            args,
            name,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Scorer for CommandScorer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, artifact: &ScratchHandle) -> Result<f64, ScoringError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(artifact.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                ScoringError::Unavailable(format!(
                    "failed to run {}: {err}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no diagnostic output");
            return Err(ScoringError::Failed(format!(
                "{} exited with {}: {}",
                self.name,
                output.status,
                detail.trim()
            )));
        }

        let score = parse_score(&String::from_utf8_lossy(&output.stdout))?;
        debug!(scratch_id = %artifact.id(), score, "external scorer finished");
        Ok(score)
    }
}

/// Extract the score from a scorer's stdout.
pub fn parse_score(stdout: &str) -> Result<f64, ScoringError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .ok_or_else(|| ScoringError::InvalidOutput("empty output".into()))?;

    let score: f64 = line.parse().map_err(|_| {
        ScoringError::InvalidOutput(format!("not a number: {line:?}"))
    })?;

    if !score.is_finite() {
        return Err(ScoringError::InvalidOutput(format!(
            "non-finite score {score}"
        )));
    }
    Ok(score)
}
