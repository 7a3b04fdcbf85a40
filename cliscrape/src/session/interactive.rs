//! Interactive command support for handling prompts that require user input.
//!
//! Many device commands ask for confirmation or switch the CLI into another
//! mode with a different prompt:
//! - `save` asks "Are you sure to continue?[Y/N]"
//! - `reboot` asks "System will reboot! Continue?[Y/N]"
//! - `system-view` changes the prompt from `<R1>` to `[R1]`
//!
//! `send_interactive` handles these by sending a sequence of inputs, each
//! followed by a wait for its own marker set. The marker that matches
//! becomes the remembered prompt, so a final step that waits for the new
//! mode's prompt leaves the session ready to `execute` in that mode.

use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::Session;
use crate::error::{Phase, Result};
use crate::transport::Connector;

/// An event in an interactive command sequence.
///
/// # Example
///
/// ```rust
/// use cliscrape::session::InteractiveEvent;
///
/// // Save the configuration, confirming the prompt
/// let events = vec![
///     InteractiveEvent::new("save", &["[Y/N]"]),
///     InteractiveEvent::new("y", &[">"]),
/// ];
/// ```
#[derive(Debug, Clone)]
pub struct InteractiveEvent {
    /// The input to send (command or response).
    pub input: String,

    /// Markers to wait for after sending input.
    pub markers: Vec<Vec<u8>>,

    /// Whether this input should be hidden in logs (e.g., passwords).
    pub hidden: bool,

    /// Optional timeout override for this specific event.
    pub timeout: Option<Duration>,
}

impl InteractiveEvent {
    /// Create a new interactive event.
    pub fn new<M: AsRef<[u8]>>(input: impl Into<String>, markers: &[M]) -> Self {
        Self {
            input: input.into(),
            markers: markers.iter().map(|m| m.as_ref().to_vec()).collect(),
            hidden: false,
            timeout: None,
        }
    }

    /// Create an event for hidden input (like passwords).
    ///
    /// The input will not be logged.
    pub fn hidden<M: AsRef<[u8]>>(input: impl Into<String>, markers: &[M]) -> Self {
        Self {
            hidden: true,
            ..Self::new(input, markers)
        }
    }

    /// Set a custom timeout for this event.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of an interactive command sequence.
#[derive(Debug, Clone)]
pub struct InteractiveResult {
    /// Results from each step in the sequence.
    pub steps: Vec<InteractiveStep>,

    /// Total time for the entire sequence.
    pub elapsed: Duration,

    /// Whether any step matched a failure pattern.
    pub failed: bool,
}

impl InteractiveResult {
    /// Create a new interactive result.
    pub fn new(steps: Vec<InteractiveStep>, elapsed: Duration) -> Self {
        let failed = steps.iter().any(|s| s.failure_message.is_some());
        Self {
            steps,
            elapsed,
            failed,
        }
    }

    /// Get the final output (from the last step).
    pub fn final_output(&self) -> Option<&str> {
        self.steps.last().map(|s| s.output.as_str())
    }

    /// Get all outputs joined by newlines.
    pub fn full_output(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.output.as_str())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of a single step in an interactive sequence.
#[derive(Debug, Clone)]
pub struct InteractiveStep {
    /// The input that was sent (masked if hidden).
    pub input: String,

    /// The sanitized output received after sending input.
    pub output: String,

    /// The raw output before sanitizing.
    pub raw_output: String,

    /// The marker that ended this step.
    pub matched: String,

    /// Time taken for this step.
    pub elapsed: Duration,

    /// Failure message if the output matched a failure pattern.
    pub failure_message: Option<String>,
}

/// Builder for creating interactive command sequences.
///
/// # Example
///
/// ```rust
/// use cliscrape::session::InteractiveBuilder;
/// use std::time::Duration;
///
/// let events = InteractiveBuilder::new()
///     .send("reboot")
///     .expect("[Y/N]")
///     .send("y")
///     .expect_any(&["#", ">"])
///     .with_timeout(Duration::from_secs(60))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct InteractiveBuilder {
    events: Vec<InteractiveEvent>,
    default_timeout: Option<Duration>,
}

impl InteractiveBuilder {
    /// Create a new interactive builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input to send.
    ///
    /// Must be followed by `expect()` to specify what to wait for.
    pub fn send(self, input: impl Into<String>) -> InteractiveBuilderWithInput {
        InteractiveBuilderWithInput {
            builder: self,
            input: input.into(),
            hidden: false,
            timeout: None,
        }
    }

    /// Add a hidden input (like a password).
    pub fn send_hidden(self, input: impl Into<String>) -> InteractiveBuilderWithInput {
        InteractiveBuilderWithInput {
            builder: self,
            input: input.into(),
            hidden: true,
            timeout: None,
        }
    }

    /// Set the default timeout for all events.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Build the list of interactive events.
    pub fn build(self) -> Vec<InteractiveEvent> {
        let default_timeout = self.default_timeout;
        self.events
            .into_iter()
            .map(|mut event| {
                event.timeout = event.timeout.or(default_timeout);
                event
            })
            .collect()
    }
}

/// Intermediate state for the builder after `send()` is called.
#[derive(Debug)]
pub struct InteractiveBuilderWithInput {
    builder: InteractiveBuilder,
    input: String,
    hidden: bool,
    timeout: Option<Duration>,
}

impl InteractiveBuilderWithInput {
    /// Wait for `marker` after sending the input.
    pub fn expect(self, marker: impl AsRef<[u8]>) -> InteractiveBuilder {
        self.expect_any(&[marker])
    }

    /// Wait for any of `markers` after sending the input.
    pub fn expect_any<M: AsRef<[u8]>>(mut self, markers: &[M]) -> InteractiveBuilder {
        let mut event = InteractiveEvent::new(self.input, markers);
        event.hidden = self.hidden;
        event.timeout = self.timeout;
        self.builder.events.push(event);
        self.builder
    }

    /// Set a custom timeout for this specific event.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<C: Connector> Session<C> {
    /// Run an interactive sequence: for each event, send its input and
    /// wait for one of its markers.
    pub async fn send_interactive(
        &mut self,
        events: &[InteractiveEvent],
    ) -> Result<InteractiveResult> {
        self.ensure_usable(Phase::Send)?;
        // Nothing is sent unless every step can be waited on.
        for event in events {
            if event.markers.is_empty() {
                return Err(self.invalid_markers(Phase::Send, "no markers given"));
            }
            if event.markers.iter().any(|m| m.is_empty()) {
                return Err(self.invalid_markers(Phase::Send, "empty marker"));
            }
        }

        let start = Instant::now();
        let mut steps = Vec::with_capacity(events.len());

        for event in events {
            let step_start = Instant::now();
            self.write_line(&event.input, Phase::Send, event.hidden)
                .await?;

            let timeout = event.timeout.unwrap_or(self.policy.read);
            let raw = self.wait_for(&event.markers, timeout).await?;
            let raw_output = String::from_utf8_lossy(&raw).into_owned();

            // Hidden input is not echoed back by the device.
            let echo = if event.hidden { "" } else { event.input.as_str() };
            let output = self.sanitizer.sanitize(&raw_output, echo);
            let failure_message = self.profile.detect_failure(&output);
            let matched = self
                .remembered_prompt
                .as_deref()
                .map(|m| String::from_utf8_lossy(m).into_owned())
                .unwrap_or_default();

            debug!(
                "[{}] interactive step {} matched {:?}",
                self.target.name,
                steps.len() + 1,
                matched
            );

            steps.push(InteractiveStep {
                input: if event.hidden {
                    "********".to_string()
                } else {
                    event.input.clone()
                },
                output,
                raw_output,
                matched,
                elapsed: step_start.elapsed(),
                failure_message,
            });
        }

        Ok(InteractiveResult::new(steps, start.elapsed()))
    }
}
