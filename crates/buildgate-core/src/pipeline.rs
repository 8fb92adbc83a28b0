//! Pipeline orchestration: skip gating, fail-fast sequencing, and the
//! aggregate outcome.

use crate::bootstrap::ensure_installed;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::gate::StalenessGate;
use crate::probe::{CapabilityProbe, SystemProbe};
use crate::runner::StageRunner;
use crate::stage::{SkipGate, Stage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Terminal status of one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Skip predicate fired; command never ran.
    Skipped { reason: String },

    /// Command exited zero.
    Succeeded,

    /// Optional stage failed; pipeline continued.
    FailedSoft { exit_code: i32 },

    /// Mandatory stage failed; pipeline aborted here.
    FailedHard { exit_code: i32 },
}

/// Per-stage entry in the ordered result log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name.
    pub name: String,

    /// Terminal status.
    pub status: StageStatus,

    /// Duration in milliseconds (0 for skipped stages).
    pub duration_ms: u64,
}

/// Aggregate status of the whole run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every mandatory stage passed.
    AllPassed,

    /// A mandatory stage failed; no later stage ran.
    AbortedAt { stage: String },
}

/// Result of a complete pipeline execution.
///
/// The sole externally observable outcome; the binary maps it to the
/// process exit code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Aggregate pass/fail status.
    pub status: PipelineStatus,

    /// Ordered log of per-stage results.
    pub records: Vec<StageRecord>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineOutcome {
    /// Whether the whole run passed.
    pub fn passed(&self) -> bool {
        self.status == PipelineStatus::AllPassed
    }

    /// The stage that caused the abort, if any.
    pub fn first_failure(&self) -> Option<&str> {
        match &self.status {
            PipelineStatus::AllPassed => None,
            PipelineStatus::AbortedAt { stage } => Some(stage),
        }
    }

    /// Number of stages that succeeded.
    pub fn succeeded_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == StageStatus::Succeeded)
            .count()
    }

    /// Number of skipped stages.
    pub fn skipped_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.status, StageStatus::Skipped { .. }))
            .count()
    }

    /// Number of optional-stage warnings.
    pub fn warning_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.status, StageStatus::FailedSoft { .. }))
            .count()
    }
}

/// Sequential pipeline driver.
///
/// Iterates stages in declaration order, evaluating each stage's skip
/// predicate before execution. A mandatory-stage failure stops
/// iteration immediately; optional-stage failures are downgraded to
/// warnings.
pub struct Pipeline {
    config: PipelineConfig,
    probe: Arc<dyn CapabilityProbe>,
    gate: StalenessGate,
}

impl Pipeline {
    /// Driver over the real environment.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemProbe), StalenessGate::new())
    }

    /// Driver with injected probe and staleness gate.
    pub fn with_parts(
        config: PipelineConfig,
        probe: Arc<dyn CapabilityProbe>,
        gate: StalenessGate,
    ) -> Self {
        Self {
            config,
            probe,
            gate,
        }
    }

    /// Execute the stages in order and produce the aggregate outcome.
    pub async fn run(&self, stages: Vec<Stage>) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        let mut records = Vec::new();
        let mut aborted_at = None;

        for stage in &stages {
            info!(stage = %stage.name, "=== {} ===", stage.name);

            if let Some(reason) = self.skip_reason(stage).await? {
                info!(stage = %stage.name, reason = %reason, "Skipping stage");
                records.push(StageRecord {
                    name: stage.name.clone(),
                    status: StageStatus::Skipped { reason },
                    duration_ms: 0,
                });
                continue;
            }

            if let Some(bootstrap) = &stage.bootstrap {
                let cap = ensure_installed(
                    self.probe.as_ref(),
                    bootstrap,
                    &self.config.env,
                    &self.config.workspace_path,
                )
                .await;
                if !cap.available {
                    let reason =
                        format!("{} unavailable: {}", bootstrap.tool.name(), cap.detail);
                    warn!(stage = %stage.name, reason = %reason, "Skipping stage");
                    records.push(StageRecord {
                        name: stage.name.clone(),
                        status: StageStatus::Skipped { reason },
                        duration_ms: 0,
                    });
                    continue;
                }
            }

            let (exit_code, duration_ms, passed) = match StageRunner::execute_stage(
                stage,
                &self.config.env,
                &self.config.workspace_path,
            )
            .await
            {
                Ok(result) => (result.exit_code, result.duration_ms, result.passed()),
                Err(e) => {
                    // Spawn failures and timeouts are stage failures,
                    // not driver crashes.
                    warn!(stage = %stage.name, error = %e, "Stage execution error");
                    (-1, 0, false)
                }
            };

            if passed {
                info!(stage = %stage.name, duration_ms, "Stage passed");
                if let SkipGate::Stale { marker, .. } = &stage.gate {
                    self.gate.commit(marker)?;
                }
                records.push(StageRecord {
                    name: stage.name.clone(),
                    status: StageStatus::Succeeded,
                    duration_ms,
                });
            } else if stage.required {
                error!(stage = %stage.name, exit_code, "Mandatory stage failed, aborting");
                records.push(StageRecord {
                    name: stage.name.clone(),
                    status: StageStatus::FailedHard { exit_code },
                    duration_ms,
                });
                aborted_at = Some(stage.name.clone());
                break;
            } else {
                warn!(stage = %stage.name, exit_code, "Optional stage failed, continuing");
                records.push(StageRecord {
                    name: stage.name.clone(),
                    status: StageStatus::FailedSoft { exit_code },
                    duration_ms,
                });
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let status = match aborted_at {
            Some(stage) => PipelineStatus::AbortedAt { stage },
            None => PipelineStatus::AllPassed,
        };

        match &status {
            PipelineStatus::AllPassed => {
                info!(duration_ms, "Pipeline completed successfully");
            }
            PipelineStatus::AbortedAt { stage } => {
                error!(stage = %stage, duration_ms, "Pipeline aborted");
            }
        }

        Ok(PipelineOutcome {
            status,
            records,
            duration_ms,
        })
    }

    /// Evaluate the stage's skip predicate. Returns the skip reason
    /// when the predicate fires.
    async fn skip_reason(&self, stage: &Stage) -> Result<Option<String>, PipelineError> {
        match &stage.gate {
            SkipGate::None => Ok(None),
            SkipGate::Tool(tool) => {
                let cap = self.probe.probe(*tool).await;
                if cap.available {
                    Ok(None)
                } else {
                    Ok(Some(format!(
                        "{} unavailable: {}",
                        tool.name(),
                        cap.detail
                    )))
                }
            }
            SkipGate::Stale { watched, marker } => {
                if self.gate.should_run(watched, marker)? {
                    Ok(None)
                } else {
                    Ok(Some(format!(
                        "no file under {} newer than marker",
                        watched.display()
                    )))
                }
            }
        }
    }
}
