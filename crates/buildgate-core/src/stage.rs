//! Stage definitions and the fixed validation pipeline.

use crate::config::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Optional external tools a stage may depend on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    /// rustfmt, via `cargo fmt`
    Rustfmt,

    /// Nightly rust toolchain, via `cargo +nightly`
    NightlyToolchain,

    /// cargo-fuzz subcommand
    CargoFuzz,
}

impl ToolId {
    /// Get the tool name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            ToolId::Rustfmt => "rustfmt",
            ToolId::NightlyToolchain => "nightly_toolchain",
            ToolId::CargoFuzz => "cargo_fuzz",
        }
    }

    /// Lightweight invocation used to detect the tool's presence.
    pub fn probe_command(&self) -> &'static [&'static str] {
        match self {
            ToolId::Rustfmt => &["cargo", "fmt", "--version"],
            ToolId::NightlyToolchain => &["cargo", "+nightly", "--version"],
            ToolId::CargoFuzz => &["cargo", "fuzz", "--version"],
        }
    }
}

/// Skip predicate attached to a stage.
///
/// Evaluated by the driver before the stage command runs; a firing
/// gate skips the stage without affecting the aggregate outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipGate {
    /// Always run.
    None,

    /// Skip when the capability probe reports the tool absent.
    Tool(ToolId),

    /// Skip when no file under `watched` is newer than the marker.
    Stale { watched: PathBuf, marker: PathBuf },
}

/// Install action for a missing optional tool, run before the stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapSpec {
    /// Tool the stage depends on.
    pub tool: ToolId,

    /// Install command (first element is executable).
    pub install: Vec<String>,
}

/// A single unit of work in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Human-readable stage name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Whether a failure aborts the pipeline (false = warn and continue).
    pub required: bool,

    /// Skip predicate, evaluated before execution.
    pub gate: SkipGate,

    /// Optional install step for a missing dependency.
    pub bootstrap: Option<BootstrapSpec>,

    /// Timeout in seconds (0 = unlimited).
    pub timeout_secs: u64,
}

impl Stage {
    /// Create a mandatory stage.
    pub fn required(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            required: true,
            gate: SkipGate::None,
            bootstrap: None,
            timeout_secs: 0,
        }
    }

    /// Create an optional stage (failure is downgraded to a warning).
    pub fn optional(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, command)
        }
    }

    /// Attach a skip predicate.
    pub fn with_gate(mut self, gate: SkipGate) -> Self {
        self.gate = gate;
        self
    }

    /// Attach an install step for a missing dependency.
    pub fn with_bootstrap(mut self, tool: ToolId, install: Vec<String>) -> Self {
        self.bootstrap = Some(BootstrapSpec { tool, install });
        self
    }

    /// Set the time budget in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Builtin pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStage {
    /// cargo fmt --all -- --check
    Fmt,

    /// Auxiliary-language lint script
    PyLint,

    /// cargo build --workspace
    Build,

    /// cargo build --workspace --release
    BuildRelease,

    /// cargo test --workspace
    Test,

    /// cargo doc --workspace --no-deps
    Doc,

    /// Short cargo-fuzz run on the nightly toolchain
    FuzzSmoke,
}

impl BuiltinStage {
    /// All builtin stages in declaration order. Order is significant:
    /// cheap checks run before expensive builds, builds before tests,
    /// fuzzing last.
    pub fn all() -> [BuiltinStage; 7] {
        [
            BuiltinStage::Fmt,
            BuiltinStage::PyLint,
            BuiltinStage::Build,
            BuiltinStage::BuildRelease,
            BuiltinStage::Test,
            BuiltinStage::Doc,
            BuiltinStage::FuzzSmoke,
        ]
    }

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStage::Fmt => "fmt",
            BuiltinStage::PyLint => "pylint",
            BuiltinStage::Build => "build",
            BuiltinStage::BuildRelease => "build_release",
            BuiltinStage::Test => "test",
            BuiltinStage::Doc => "doc",
            BuiltinStage::FuzzSmoke => "fuzz_smoke",
        }
    }

    /// Get the stage's command for the given configuration.
    pub fn command(&self, config: &PipelineConfig) -> Vec<String> {
        match self {
            BuiltinStage::Fmt => {
                svec(&["cargo", "fmt", "--all", "--", "--check"])
            }
            BuiltinStage::PyLint => {
                vec![
                    config.python_interpreter.clone(),
                    config.lint_script().to_string_lossy().into_owned(),
                ]
            }
            BuiltinStage::Build => svec(&["cargo", "build", "--workspace"]),
            BuiltinStage::BuildRelease => {
                svec(&["cargo", "build", "--workspace", "--release"])
            }
            BuiltinStage::Test => svec(&["cargo", "test", "--workspace"]),
            BuiltinStage::Doc => svec(&["cargo", "doc", "--workspace", "--no-deps"]),
            BuiltinStage::FuzzSmoke => {
                vec![
                    "cargo".to_string(),
                    "+nightly".to_string(),
                    "fuzz".to_string(),
                    "run".to_string(),
                    config.fuzz_target.clone(),
                    "--".to_string(),
                    format!("-runs={}", config.fuzz_runs),
                ]
            }
        }
    }

    /// Assemble the full stage definition for the given configuration.
    pub fn stage(&self, config: &PipelineConfig) -> Stage {
        let command = self.command(config);
        match self {
            BuiltinStage::Fmt => Stage::optional(self.name(), command)
                .with_gate(SkipGate::Tool(ToolId::Rustfmt)),
            BuiltinStage::PyLint => Stage::required(self.name(), command)
                .with_gate(SkipGate::Stale {
                    watched: config.lint_dir_abs(),
                    marker: config.marker_path_abs(),
                }),
            BuiltinStage::FuzzSmoke => Stage::optional(self.name(), command)
                .with_gate(SkipGate::Tool(ToolId::NightlyToolchain))
                .with_bootstrap(
                    ToolId::CargoFuzz,
                    svec(&["cargo", "install", "cargo-fuzz"]),
                ),
            _ => Stage::required(self.name(), command),
        }
        .with_timeout(config.stage_timeout_secs)
    }
}

/// The fixed validation pipeline for the given configuration.
pub fn default_stages(config: &PipelineConfig) -> Vec<Stage> {
    BuiltinStage::all()
        .iter()
        .map(|b| b.stage(config))
        .collect()
}

fn svec(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}
