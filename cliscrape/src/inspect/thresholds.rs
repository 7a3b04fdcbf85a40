//! Alert rules evaluated over parsed records.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::template::Record;

/// Something in an inspection that needs attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// The target could not be reached.
    Unreachable { reason: String },

    /// A numeric field went over its limit.
    ThresholdExceeded {
        command: String,
        field: String,
        value: f64,
        limit: f64,
    },

    /// Records reporting a `down` state.
    InterfacesDown { command: String, names: Vec<String> },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::Unreachable { reason } => write!(f, "unreachable: {}", reason),
            Alert::ThresholdExceeded {
                command,
                field,
                value,
                limit,
            } => write!(
                f,
                "{} is {} (limit {}) in '{}'",
                field, value, limit, command
            ),
            Alert::InterfacesDown { command, names } => write!(
                f,
                "{} down in '{}': {}",
                names.len(),
                command,
                names.join(", ")
            ),
        }
    }
}

/// Numeric limits per record field plus the down-state check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Field name (lower-cased, as in records) to maximum value.
    pub limits: IndexMap<String, f64>,

    /// Raise an alert for records with a field containing `down`.
    pub down_check: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        let mut limits = IndexMap::new();
        limits.insert("cpu_usage".to_string(), 80.0);
        limits.insert("memory_usage".to_string(), 70.0);
        Self {
            limits,
            down_check: true,
        }
    }
}

impl Thresholds {
    /// No limits and no down check.
    pub fn none() -> Self {
        Self {
            limits: IndexMap::new(),
            down_check: false,
        }
    }

    /// Add or replace the limit for `field`.
    pub fn with_limit(mut self, field: impl Into<String>, limit: f64) -> Self {
        self.limits.insert(field.into().to_lowercase(), limit);
        self
    }

    pub fn with_down_check(mut self, enabled: bool) -> Self {
        self.down_check = enabled;
        self
    }

    /// Alerts raised by the records of one command.
    ///
    /// Fields that do not parse as numbers are ignored. A trailing `%` is
    /// accepted.
    pub fn evaluate(&self, command: &str, records: &[Record]) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for record in records {
            for (field, limit) in &self.limits {
                let Some(value) = record.get(field).and_then(|v| numeric(v)) else {
                    continue;
                };
                if value > *limit {
                    alerts.push(Alert::ThresholdExceeded {
                        command: command.to_string(),
                        field: field.clone(),
                        value,
                        limit: *limit,
                    });
                }
            }
        }

        if self.down_check {
            let names: Vec<String> = records
                .iter()
                .filter(|r| r.values().any(|v| v.to_ascii_lowercase().contains("down")))
                .map(|r| r.values().next().cloned().unwrap_or_default())
                .collect();
            if !names.is_empty() {
                alerts.push(Alert::InterfacesDown {
                    command: command.to_string(),
                    names,
                });
            }
        }

        alerts
    }
}

fn numeric(text: &str) -> Option<f64> {
    text.trim().trim_end_matches('%').trim_end().parse().ok()
}
