//! [`Sandbox`]: runs a proposal's generated build script in isolation and
//! reports what came out the other side. The real sandbox (a container, a
//! restricted subprocess, a remote build service) lives outside this
//! crate; [`MockSandbox`] is a deterministic stand-in for tests.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// Paths (within the sandbox's output directory) to any generated
    /// artifacts, e.g. a produced mesh or model file.
    pub artifact_paths: Vec<String>,
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(&self, script: &str, timeout: Duration) -> Result<SandboxOutcome>;
}

/// Always reports the same fixed outcome, ignoring `script` entirely.
/// Good enough for exercising the pipeline's control flow without a real
/// build toolchain.
pub struct MockSandbox {
    outcome: SandboxOutcome,
}

impl MockSandbox {
    pub fn succeeding(artifact_path: impl Into<String>) -> Self {
        Self {
            outcome: SandboxOutcome {
                success: true,
                stdout: "build succeeded".into(),
                stderr: String::new(),
                artifact_paths: vec![artifact_path.into()],
            },
        }
    }

    pub fn failing(stderr: impl Into<String>) -> Self {
        Self {
            outcome: SandboxOutcome {
                success: false,
                stdout: String::new(),
                stderr: stderr.into(),
                artifact_paths: vec![],
            },
        }
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    async fn execute(&self, _script: &str, _timeout: Duration) -> Result<SandboxOutcome> {
        Ok(self.outcome.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeding_mock_reports_an_artifact() {
        let sandbox = MockSandbox::succeeding("out/part.stl");
        let outcome = sandbox.execute("build()", Duration::from_secs(1)).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.artifact_paths, vec!["out/part.stl".to_string()]);
    }

    #[tokio::test]
    async fn failing_mock_reports_stderr() {
        let sandbox = MockSandbox::failing("syntax error on line 3");
        let outcome = sandbox.execute("build()", Duration::from_secs(1)).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.stderr, "syntax error on line 3");
    }
}
