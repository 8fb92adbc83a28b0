//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment passed through to collaborator invocations.
///
/// The variables are informational for the sub-invoked tools and are
/// never interpreted by the driver itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunEnv {
    /// Ask sub-invoked tools for a backtrace on panic
    /// (`RUST_BACKTRACE=1`).
    pub backtrace: bool,

    /// Keep the lint interpreter from writing bytecode artifacts
    /// (`PYTHONDONTWRITEBYTECODE=1`).
    pub python_no_bytecode: bool,
}

impl RunEnv {
    /// Environment variables to set on every stage command.
    pub fn variables(&self) -> Vec<(&'static str, &'static str)> {
        let mut vars = Vec::new();
        if self.backtrace {
            vars.push(("RUST_BACKTRACE", "1"));
        }
        if self.python_no_bytecode {
            vars.push(("PYTHONDONTWRITEBYTECODE", "1"));
        }
        vars
    }
}

impl Default for RunEnv {
    fn default() -> Self {
        Self {
            backtrace: false,
            python_no_bytecode: true,
        }
    }
}

/// Configuration for the validation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Workspace root the stages run in.
    pub workspace_path: PathBuf,

    /// Directory holding the auxiliary lint script and the sources it
    /// checks, relative to the workspace root.
    pub lint_dir: PathBuf,

    /// Lint script file name inside `lint_dir`.
    pub lint_script: String,

    /// Interpreter for the lint script.
    pub python_interpreter: String,

    /// Staleness marker file, relative to the workspace root.
    pub marker_path: PathBuf,

    /// Fuzz target passed to `cargo fuzz run`.
    pub fuzz_target: String,

    /// Iteration budget for the fuzz smoke run.
    pub fuzz_runs: u32,

    /// Per-stage timeout in seconds (0 = unlimited).
    pub stage_timeout_secs: u64,

    /// Environment toggles threaded into every stage command.
    pub env: RunEnv,
}

impl PipelineConfig {
    /// Absolute path of the watched lint directory.
    pub fn lint_dir_abs(&self) -> PathBuf {
        self.workspace_path.join(&self.lint_dir)
    }

    /// Lint script path relative to the workspace root, for the stage
    /// command (stage commands run with the workspace as cwd).
    pub fn lint_script(&self) -> PathBuf {
        self.lint_dir.join(&self.lint_script)
    }

    /// Absolute path of the staleness marker file.
    pub fn marker_path_abs(&self) -> PathBuf {
        self.workspace_path.join(&self.marker_path)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_path: PathBuf::from("."),
            lint_dir: PathBuf::from("tools"),
            lint_script: "lint.py".to_string(),
            python_interpreter: "python3".to_string(),
            marker_path: PathBuf::from("target/.lint-stamp"),
            fuzz_target: "smoke".to_string(),
            fuzz_runs: 256,
            stage_timeout_secs: 0,
            env: RunEnv::default(),
        }
    }
}
