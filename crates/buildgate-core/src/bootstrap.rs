//! Bootstrap step for optional tools (cargo-fuzz before the fuzz
//! smoke stage).

use crate::config::RunEnv;
use crate::probe::{CapabilityProbe, CapabilityResult};
use crate::stage::BootstrapSpec;
use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};

/// Ensure an optional tool is installed before its stage runs.
///
/// Probes for the tool; when absent, runs the install command and
/// probes again. An install failure is downgraded to tool-unavailable
/// so the dependent stage becomes a skip, never a pipeline abort.
pub async fn ensure_installed(
    probe: &dyn CapabilityProbe,
    spec: &BootstrapSpec,
    env: &RunEnv,
    cwd: &Path,
) -> CapabilityResult {
    let before = probe.probe(spec.tool).await;
    if before.available {
        return before;
    }
    if spec.install.is_empty() {
        return CapabilityResult::missing(spec.tool, "no install command configured");
    }

    info!(
        tool = spec.tool.name(),
        command = ?spec.install,
        "Tool missing, attempting install"
    );

    let status = Command::new(&spec.install[0])
        .args(&spec.install[1..])
        .current_dir(cwd)
        .envs(env.variables())
        .status()
        .await;

    match status {
        Ok(s) if s.success() => probe.probe(spec.tool).await,
        Ok(s) => {
            warn!(
                tool = spec.tool.name(),
                code = s.code().unwrap_or(-1),
                "Install command failed"
            );
            CapabilityResult::missing(
                spec.tool,
                format!("install exited with code {}", s.code().unwrap_or(-1)),
            )
        }
        Err(e) => {
            warn!(tool = spec.tool.name(), error = %e, "Install command failed to spawn");
            CapabilityResult::missing(spec.tool, format!("install failed to spawn: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::ToolId;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Probe that reports the tool absent until `flips_after` calls.
    struct CountingProbe {
        calls: AtomicUsize,
        flips_after: usize,
    }

    #[async_trait]
    impl CapabilityProbe for CountingProbe {
        async fn probe(&self, tool: ToolId) -> CapabilityResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.flips_after {
                CapabilityResult {
                    tool,
                    available: true,
                    detail: "installed".to_string(),
                }
            } else {
                CapabilityResult::missing(tool, "absent")
            }
        }
    }

    fn spec(install: &[&str]) -> BootstrapSpec {
        BootstrapSpec {
            tool: ToolId::CargoFuzz,
            install: install.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_already_installed_skips_install() {
        let probe = CountingProbe {
            calls: AtomicUsize::new(0),
            flips_after: 0,
        };
        // Install command would fail if it ran.
        let result = ensure_installed(
            &probe,
            &spec(&["/nonexistent-installer"]),
            &RunEnv::default(),
            &PathBuf::from("."),
        )
        .await;
        assert!(result.available);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_successful_install_reprobes() {
        let probe = CountingProbe {
            calls: AtomicUsize::new(0),
            flips_after: 1,
        };
        let result = ensure_installed(
            &probe,
            &spec(&["true"]),
            &RunEnv::default(),
            &PathBuf::from("."),
        )
        .await;
        assert!(result.available);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_install_downgrades_to_unavailable() {
        let probe = CountingProbe {
            calls: AtomicUsize::new(0),
            flips_after: usize::MAX,
        };
        let result = ensure_installed(
            &probe,
            &spec(&["false"]),
            &RunEnv::default(),
            &PathBuf::from("."),
        )
        .await;
        assert!(!result.available);
        assert!(result.detail.contains("install exited"));
    }

    #[tokio::test]
    async fn test_install_spawn_failure_downgrades_to_unavailable() {
        let probe = CountingProbe {
            calls: AtomicUsize::new(0),
            flips_after: usize::MAX,
        };
        let result = ensure_installed(
            &probe,
            &spec(&["/nonexistent-installer"]),
            &RunEnv::default(),
            &PathBuf::from("."),
        )
        .await;
        assert!(!result.available);
        assert!(result.detail.contains("failed to spawn"));
    }
}
