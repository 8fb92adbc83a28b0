//! buildgate core - local build-validation pipeline driver
//!
//! Provides a sequential pipeline driver that:
//! - Executes the project's verification stages (fmt, auxiliary lint,
//!   debug/release builds, tests, docs, optional fuzz smoke test)
//! - Probes for optional tooling and skips gated stages with a reason
//! - Enforces fail-fast on mandatory stages, warn-and-continue on
//!   optional ones

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod probe;
pub mod runner;
pub mod stage;
pub mod telemetry;

// Re-export key types
pub use bootstrap::ensure_installed;
pub use config::{PipelineConfig, RunEnv};
pub use error::PipelineError;
pub use gate::{Clock, FileLister, StalenessGate, SystemClock, WalkLister};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineStatus, StageRecord, StageStatus};
pub use probe::{CapabilityProbe, CapabilityResult, SystemProbe};
pub use runner::{StageRunner, StageResult};
pub use stage::{default_stages, BootstrapSpec, BuiltinStage, SkipGate, Stage, ToolId};
