//! Capability probing for optional external tools.

use crate::stage::ToolId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Outcome of a single capability probe.
///
/// Produced fresh on every call; results are never cached across
/// stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityResult {
    /// Tool that was probed.
    pub tool: ToolId,

    /// Whether the tool responded to its version query.
    pub available: bool,

    /// Diagnostic string for skip/warning messages.
    pub detail: String,
}

impl CapabilityResult {
    /// An unavailable result with the given diagnostic.
    pub fn missing(tool: ToolId, detail: impl Into<String>) -> Self {
        Self {
            tool,
            available: false,
            detail: detail.into(),
        }
    }
}

/// Detects whether an optional external tool is present.
///
/// Probing never fails the pipeline: absence is a normal,
/// representable outcome.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Probe for the given tool.
    async fn probe(&self, tool: ToolId) -> CapabilityResult;
}

/// Probe backed by lightweight version-query subprocesses.
pub struct SystemProbe;

#[async_trait]
impl CapabilityProbe for SystemProbe {
    async fn probe(&self, tool: ToolId) -> CapabilityResult {
        let argv = tool.probe_command();
        debug!(tool = tool.name(), command = ?argv, "Probing tool");

        let output = Command::new(argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                let version = String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .to_string();
                CapabilityResult {
                    tool,
                    available: true,
                    detail: version,
                }
            }
            Ok(out) => CapabilityResult::missing(
                tool,
                format!(
                    "probe exited with code {}",
                    out.status.code().unwrap_or(-1)
                ),
            ),
            Err(e) => CapabilityResult::missing(tool, format!("probe failed to spawn: {e}")),
        }
    }
}
