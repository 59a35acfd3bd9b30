//! Job result artifacts.
//!
//! The runtime reads `computed.json` to learn where the deterministic output
//! is, or why there is none.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the output directory.
pub const OUTPUT_DIR_ENV_VAR: &str = "IEXEC_OUT";

const RESULT_FILE: &str = "result.json";
const COMPUTED_FILE: &str = "computed.json";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{0} is not set")]
    MissingDir(&'static str),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {0}: {1}")]
    Serialize(&'static str, serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ResultFile {
    ok: bool,
}

#[derive(Debug, Serialize)]
struct ComputedFile {
    #[serde(rename = "deterministic-output-path")]
    deterministic_output_path: String,

    #[serde(rename = "error-message", skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

/// Writer for the job's output directory.
#[derive(Debug, Clone)]
pub struct JobOutput {
    dir: PathBuf,
}

impl JobOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use `configured` if non-empty, else `IEXEC_OUT`.
    pub fn resolve(configured: &str) -> Result<Self, OutputError> {
        if !configured.is_empty() {
            return Ok(Self::new(configured));
        }
        std::env::var(OUTPUT_DIR_ENV_VAR)
            .map(Self::new)
            .map_err(|_| OutputError::MissingDir(OUTPUT_DIR_ENV_VAR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `result.json` = `{"ok": true}`, then `computed.json` pointing at it.
    pub async fn write_success(&self) -> Result<(), OutputError> {
        let result_path = self.dir.join(RESULT_FILE);
        self.write_json(&result_path, RESULT_FILE, &ResultFile { ok: true }).await?;

        let computed = ComputedFile {
            deterministic_output_path: result_path.display().to_string(),
            error_message: None,
        };
        self.write_json(&self.dir.join(COMPUTED_FILE), COMPUTED_FILE, &computed).await
    }

    /// `computed.json` carrying the error message.
    pub async fn write_failure(&self, message: &str) -> Result<(), OutputError> {
        let computed = ComputedFile {
            deterministic_output_path: self.dir.display().to_string(),
            error_message: Some(message.to_string()),
        };
        self.write_json(&self.dir.join(COMPUTED_FILE), COMPUTED_FILE, &computed).await
    }

    async fn write_json<T: Serialize>(
        &self,
        path: &Path,
        name: &'static str,
        value: &T,
    ) -> Result<(), OutputError> {
        let body = serde_json::to_vec(value).map_err(|e| OutputError::Serialize(name, e))?;
        tokio::fs::write(path, body)
            .await
            .map_err(|source| OutputError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "Wrote job artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_success_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let output = JobOutput::new(dir.path());
        output.write_success().await.unwrap();

        let result = read_json(&dir.path().join("result.json"));
        assert_eq!(result, serde_json::json!({"ok": true}));

        let computed = read_json(&dir.path().join("computed.json"));
        assert_eq!(
            computed["deterministic-output-path"],
            dir.path().join("result.json").display().to_string()
        );
        assert!(computed.get("error-message").is_none());
    }

    #[tokio::test]
    async fn test_failure_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let output = JobOutput::new(dir.path());
        output.write_failure("Failed to open tunnel endpoint: boom").await.unwrap();

        assert!(!dir.path().join("result.json").exists());
        let computed = read_json(&dir.path().join("computed.json"));
        assert_eq!(computed["deterministic-output-path"], dir.path().display().to_string());
        assert_eq!(computed["error-message"], "Failed to open tunnel endpoint: boom");
    }

    #[tokio::test]
    async fn test_unwritable_dir() {
        let output = JobOutput::new("/nonexistent/iexec_out");
        assert!(matches!(
            output.write_failure("x").await,
            Err(OutputError::Write { .. })
        ));
    }

    #[test]
    fn test_configured_dir_wins() {
        let output = JobOutput::resolve("/tmp/out").unwrap();
        assert_eq!(output.dir(), Path::new("/tmp/out"));
    }
}
