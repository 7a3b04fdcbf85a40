//! Per-target inspection reports.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::probe::Reachability;
use super::thresholds::Alert;
use crate::session::{CommandResult, secs};
use crate::template::Record;

/// What one command produced on one target.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,

    /// Sanitized output, always kept so a failed parse still leaves the text.
    pub output: String,

    pub records: Vec<Record>,

    /// Whether the prompt came back after the output.
    pub complete: bool,

    pub pages: usize,

    #[serde(with = "secs")]
    pub elapsed: Duration,

    /// Device-side failure message (e.g. `Error: Unrecognized command`).
    pub failure_message: Option<String>,

    /// The template could not be loaded; no records were produced.
    pub template_error: Option<String>,

    /// An `Error` rule ended the parse early.
    pub stopped: Option<String>,

    /// The command itself failed (timeout, lost channel).
    pub error: Option<String>,
}

impl CommandReport {
    pub(crate) fn from_result(result: &CommandResult) -> Self {
        Self {
            command: result.command.clone(),
            output: result.sanitized.clone(),
            records: Vec::new(),
            complete: result.is_complete(),
            pages: result.pages,
            elapsed: result.elapsed,
            failure_message: result.failure_message.clone(),
            template_error: None,
            stopped: None,
            error: None,
        }
    }

    /// Complete, accepted by the device, and parsed without trouble.
    pub fn is_ok(&self) -> bool {
        self.complete
            && self.failure_message.is_none()
            && self.template_error.is_none()
            && self.error.is_none()
    }
}

/// Everything learned about one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub name: String,
    pub host: String,

    /// Probe outcome, when probing is enabled.
    pub reachability: Option<Reachability>,

    pub commands: Vec<CommandReport>,
    pub alerts: Vec<Alert>,

    /// Why the target was abandoned (unreachable, login failed, timeout).
    pub error: Option<String>,
}

impl TargetReport {
    pub(crate) fn new(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            reachability: None,
            commands: Vec::new(),
            alerts: Vec::new(),
            error: None,
        }
    }

    /// No target-level error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Records of the first report for `command`.
    pub fn records(&self, command: &str) -> Option<&[Record]> {
        self.commands
            .iter()
            .find(|c| c.command == command)
            .map(|c| c.records.as_slice())
    }
}

/// Counts across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub targets: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub alerts: usize,
}

impl Summary {
    pub fn of(reports: &[TargetReport]) -> Self {
        let succeeded = reports.iter().filter(|r| r.is_ok()).count();
        Self {
            targets: reports.len(),
            succeeded,
            failed: reports.len() - succeeded,
            alerts: reports.iter().map(|r| r.alerts.len()).sum(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} targets inspected, {} failed, {} alerts",
            self.succeeded, self.targets, self.failed, self.alerts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut ok = TargetReport::new("r1", "192.0.2.1");
        ok.alerts.push(Alert::Unreachable {
            reason: "x".into(),
        });
        let mut failed = TargetReport::new("r2", "192.0.2.2");
        failed.error = Some("connection refused".into());

        let summary = Summary::of(&[ok, failed]);
        assert_eq!(
            summary,
            Summary {
                targets: 2,
                succeeded: 1,
                failed: 1,
                alerts: 1,
            }
        );
        assert_eq!(summary.to_string(), "1/2 targets inspected, 1 failed, 1 alerts");
    }

    #[test]
    fn test_report_serializes() {
        let report = TargetReport::new("r1", "192.0.2.1");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["name"], "r1");
        assert!(json["error"].is_null());
        assert!(json["commands"].as_array().unwrap().is_empty());
    }
}
