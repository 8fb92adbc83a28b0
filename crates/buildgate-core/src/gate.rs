//! Staleness gating for the expensive auxiliary lint check.
//!
//! A single marker file under the build-output directory records when
//! the check last completed successfully. The check re-runs whenever
//! any watched file is strictly newer than the marker. A clock set
//! backward on the watched files can cause an unnecessary skip; this
//! conservative-direction skew is an accepted edge case.

use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Source of "now" for marker commits.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Enumerates modification times of the watched file set.
pub trait FileLister: Send + Sync {
    /// Modification times of every file under `root`. A missing root
    /// yields an empty list.
    fn modification_times(&self, root: &Path) -> Result<Vec<DateTime<Utc>>, PipelineError>;
}

/// Recursive directory walk over the real filesystem.
pub struct WalkLister;

impl FileLister for WalkLister {
    fn modification_times(&self, root: &Path) -> Result<Vec<DateTime<Utc>>, PipelineError> {
        let mut times = Vec::new();
        if root.is_dir() {
            walk(root, &mut times)?;
        } else if root.is_file() {
            times.push(DateTime::<Utc>::from(fs::metadata(root)?.modified()?));
        }
        Ok(times)
    }
}

fn walk(dir: &Path, out: &mut Vec<DateTime<Utc>>) -> Result<(), PipelineError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            walk(&entry.path(), out)?;
        } else {
            out.push(DateTime::<Utc>::from(meta.modified()?));
        }
    }
    Ok(())
}

/// Decides whether the gated check must re-run, and persists the
/// marker after a successful run.
///
/// Clock and file listing are injected so the policy is testable
/// without the real filesystem.
pub struct StalenessGate {
    clock: Box<dyn Clock>,
    lister: Box<dyn FileLister>,
}

impl StalenessGate {
    /// Gate over the real filesystem and wall clock.
    pub fn new() -> Self {
        Self::with_parts(Box::new(SystemClock), Box::new(WalkLister))
    }

    /// Gate with injected clock and file lister.
    pub fn with_parts(clock: Box<dyn Clock>, lister: Box<dyn FileLister>) -> Self {
        Self { clock, lister }
    }

    /// Whether the gated check must run.
    ///
    /// True when the marker is absent (never checked) or unreadable,
    /// or when at least one watched file is strictly newer than the
    /// marker timestamp.
    pub fn should_run(&self, watched: &Path, marker: &Path) -> Result<bool, PipelineError> {
        let token = match fs::read_to_string(marker) {
            Ok(token) => token,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(marker = %marker.display(), "No marker, check must run");
                return Ok(true);
            }
            Err(e) => return Err(e.into()),
        };

        let committed = match token.trim().parse::<DateTime<Utc>>() {
            Ok(ts) => ts,
            Err(_) => {
                warn!(marker = %marker.display(), "Unreadable marker token, re-running check");
                return Ok(true);
            }
        };

        let newest = self.lister.modification_times(watched)?.into_iter().max();
        Ok(matches!(newest, Some(mtime) if mtime > committed))
    }

    /// Persist the marker.
    ///
    /// Callers must invoke this only after the gated check completed
    /// without error, so a failed check re-runs on the next
    /// invocation.
    pub fn commit(&self, marker: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(marker, self.clock.now().to_rfc3339())?;
        debug!(marker = %marker.display(), "Marker committed");
        Ok(())
    }
}

impl Default for StalenessGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::path::PathBuf;

    struct FakeClock(DateTime<Utc>);

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct FakeLister(Vec<DateTime<Utc>>);

    impl FileLister for FakeLister {
        fn modification_times(&self, _root: &Path) -> Result<Vec<DateTime<Utc>>, PipelineError> {
            Ok(self.0.clone())
        }
    }

    fn gate_at(now: DateTime<Utc>, mtimes: Vec<DateTime<Utc>>) -> StalenessGate {
        StalenessGate::with_parts(Box::new(FakeClock(now)), Box::new(FakeLister(mtimes)))
    }

    #[test]
    fn test_absent_marker_means_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("stamp");
        let gate = gate_at(Utc::now(), vec![]);

        assert!(gate.should_run(&PathBuf::from("watched"), &marker).expect("should_run"));
    }

    #[test]
    fn test_commit_then_unchanged_means_skip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("stamp");
        let now = Utc::now();
        let gate = gate_at(now, vec![now - Duration::hours(1)]);

        gate.commit(&marker).expect("commit");
        assert!(!gate.should_run(&PathBuf::from("watched"), &marker).expect("should_run"));
    }

    #[test]
    fn test_newer_file_flips_back_to_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("stamp");
        let now = Utc::now();

        gate_at(now, vec![]).commit(&marker).expect("commit");

        let gate = gate_at(now, vec![now - Duration::hours(1), now + Duration::seconds(5)]);
        assert!(gate.should_run(&PathBuf::from("watched"), &marker).expect("should_run"));
    }

    #[test]
    fn test_empty_watched_set_means_skip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("stamp");
        let gate = gate_at(Utc::now(), vec![]);

        gate.commit(&marker).expect("commit");
        assert!(!gate.should_run(&PathBuf::from("watched"), &marker).expect("should_run"));
    }

    #[test]
    fn test_unreadable_marker_means_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("stamp");
        fs::write(&marker, "not a timestamp").expect("write");

        let gate = gate_at(Utc::now(), vec![]);
        assert!(gate.should_run(&PathBuf::from("watched"), &marker).expect("should_run"));
    }

    #[test]
    fn test_commit_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("build/out/.stamp");
        let gate = gate_at(Utc::now(), vec![]);

        gate.commit(&marker).expect("commit");
        assert!(marker.exists());
    }

    #[test]
    fn test_marker_token_roundtrips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("stamp");
        let now = Utc::now();
        gate_at(now, vec![]).commit(&marker).expect("commit");

        let token = fs::read_to_string(&marker).expect("read");
        let parsed: DateTime<Utc> = token.trim().parse().expect("parse");
        assert_eq!(parsed, now);
    }

    #[test]
    fn test_walk_lister_missing_root_is_empty() {
        let times = WalkLister
            .modification_times(&PathBuf::from("/nonexistent-watched-dir"))
            .expect("modification_times");
        assert!(times.is_empty());
    }

    #[test]
    fn test_walk_lister_sees_nested_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("a.py"), "pass").expect("write");
        fs::write(dir.path().join("nested/b.py"), "pass").expect("write");

        let times = WalkLister.modification_times(dir.path()).expect("modification_times");
        assert_eq!(times.len(), 2);
    }
}
