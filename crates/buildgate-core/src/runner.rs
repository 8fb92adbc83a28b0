//! Stage command execution.

use crate::config::RunEnv;
use crate::error::PipelineError;
use crate::stage::Stage;
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;

/// Result of a stage execution.
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the command exited successfully.
    pub success: bool,
}

impl StageResult {
    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Executes stage commands as synchronous subprocesses.
///
/// Stdio is inherited: collaborator output streams through to the
/// operator's console and is never parsed. Only the exit status is
/// interpreted.
pub struct StageRunner;

impl StageRunner {
    /// Execute a single stage command and return the result.
    pub async fn execute_stage(
        stage: &Stage,
        env: &RunEnv,
        cwd: &Path,
    ) -> Result<StageResult, PipelineError> {
        let start = Instant::now();

        if stage.command.is_empty() {
            return Err(PipelineError::EmptyCommand {
                stage: stage.name.clone(),
            });
        }

        let exe = &stage.command[0];
        let args = &stage.command[1..];

        let mut child = Command::new(exe)
            .args(args)
            .current_dir(cwd)
            .envs(env.variables())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                stage: stage.name.clone(),
                source,
            })?;

        let status = if stage.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(stage.timeout_secs),
                child.wait(),
            )
            .await
            .map_err(|_| PipelineError::Timeout {
                stage: stage.name.clone(),
                timeout_secs: stage.timeout_secs,
            })??
        } else {
            child.wait().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = status.code().unwrap_or(-1);

        Ok(StageResult {
            stage_name: stage.name.clone(),
            exit_code,
            duration_ms,
            success: status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_result_passed() {
        let result = StageResult {
            stage_name: "fmt".to_string(),
            exit_code: 0,
            duration_ms: 100,
            success: true,
        };
        assert!(result.passed());
    }

    #[test]
    fn test_stage_result_failed() {
        let result = StageResult {
            stage_name: "fmt".to_string(),
            exit_code: 1,
            duration_ms: 100,
            success: false,
        };
        assert!(!result.passed());
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let stage = Stage::required("echo_test", vec!["true".to_string()]);
        let result = StageRunner::execute_stage(&stage, &RunEnv::default(), Path::new("."))
            .await
            .expect("execute failed");
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let stage = Stage::required("false_test", vec!["false".to_string()]);
        let result = StageRunner::execute_stage(&stage, &RunEnv::default(), Path::new("."))
            .await
            .expect("execute failed");
        assert!(!result.success);
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_execute_empty_command_is_rejected() {
        let stage = Stage::required("empty", vec![]);
        let err = StageRunner::execute_stage(&stage, &RunEnv::default(), Path::new("."))
            .await
            .expect_err("empty command must be rejected");
        assert!(matches!(err, PipelineError::EmptyCommand { .. }));
    }

    #[tokio::test]
    async fn test_execute_spawn_failure() {
        let stage = Stage::required(
            "missing",
            vec!["/nonexistent-binary-that-does-not-exist".to_string()],
        );
        let err = StageRunner::execute_stage(&stage, &RunEnv::default(), Path::new("."))
            .await
            .expect_err("spawn must fail");
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let stage =
            Stage::required("sleepy", vec!["sleep".to_string(), "5".to_string()]).with_timeout(1);
        let err = StageRunner::execute_stage(&stage, &RunEnv::default(), Path::new("."))
            .await
            .expect_err("stage must time out");
        assert!(matches!(err, PipelineError::Timeout { .. }));
    }
}
