//! Results of command execution.

use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;

use crate::template::Record;

/// Outcome of one `execute` call.
///
/// Never mutated after it is returned. A result with
/// `terminated_by_prompt == false` only ever appears as the partial capture
/// inside an execution timeout error.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The command that was executed.
    pub command: String,

    /// Everything received after the command was sent, terminator included.
    pub raw: Bytes,

    /// The output with escapes, banners, echo and prompt removed.
    pub sanitized: String,

    /// Whether the terminator was seen.
    pub terminated_by_prompt: bool,

    /// The terminator that ended the output.
    pub prompt: Option<String>,

    /// Number of pagination banners dismissed.
    pub pages: usize,

    /// Time from sending the command to the terminator (or the timeout).
    pub elapsed: Duration,

    /// First device failure pattern found in the sanitized output.
    pub failure_message: Option<String>,
}

impl CommandResult {
    /// Whether the output is complete and can be trusted.
    pub fn is_complete(&self) -> bool {
        self.terminated_by_prompt
    }

    /// Complete and no failure pattern matched.
    pub fn is_success(&self) -> bool {
        self.terminated_by_prompt && self.failure_message.is_none()
    }

    /// Sanitized output lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.sanitized.lines()
    }

    /// The raw capture as text (lossy UTF-8).
    pub fn raw_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    /// Check if the sanitized output contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.sanitized.contains(pattern)
    }
}

impl std::fmt::Display for CommandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sanitized)
    }
}

/// A command result together with the records a template produced from it.
#[derive(Debug, Clone)]
pub struct ParsedOutput {
    /// The underlying command result.
    pub result: CommandResult,

    /// Records in emission order. Empty means nothing matched.
    pub records: Vec<Record>,

    /// Set when the template stopped the parse with an `Error` action.
    pub stopped: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(terminated: bool, failure: Option<&str>) -> CommandResult {
        CommandResult {
            command: "display clock".into(),
            raw: Bytes::from_static(b"display clock\r\n10:00:00\r\n\x1b[0m<R1>"),
            sanitized: "10:00:00\nUTC".into(),
            terminated_by_prompt: terminated,
            prompt: Some(">".into()),
            pages: 0,
            elapsed: Duration::from_millis(40),
            failure_message: failure.map(String::from),
        }
    }

    #[test]
    fn test_complete_and_success() {
        assert!(result(true, None).is_success());
        assert!(!result(true, Some("Error:")).is_success());
        assert!(result(true, Some("Error:")).is_complete());
        assert!(!result(false, None).is_complete());
    }

    #[test]
    fn test_accessors() {
        let r = result(true, None);
        assert_eq!(r.lines().collect::<Vec<_>>(), vec!["10:00:00", "UTC"]);
        assert!(r.raw_str().starts_with("display clock"));
        assert!(r.contains("UTC"));
        assert_eq!(r.to_string(), "10:00:00\nUTC");
    }
}
