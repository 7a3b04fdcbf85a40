//! Timeout policy and per-command execution options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-operation timeouts and polling knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    /// Upper bound for opening the transport (including login).
    #[serde(with = "secs")]
    pub connect: Duration,

    /// Default bound for `wait_for` and `execute` read loops.
    #[serde(with = "secs")]
    pub read: Duration,

    /// Sleep between non-blocking read attempts.
    #[serde(with = "secs")]
    pub poll_interval: Duration,

    /// Largest chunk taken from the transport per read.
    pub read_chunk: usize,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            read: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            read_chunk: 65535,
        }
    }
}

/// Durations as floating-point seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

/// Overrides for a single `execute` call.
///
/// Anything left unset falls back to the remembered prompt, the device
/// profile's pager settings and the session's read timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Marker that ends the output.
    pub terminator: Option<Vec<u8>>,

    /// Pagination banner. An empty banner disables paging.
    pub page_prompt: Option<Vec<u8>>,

    /// Bytes sent to dismiss each banner.
    pub continuation: Option<Vec<u8>>,

    /// Bound for the whole read loop.
    pub timeout: Option<Duration>,
}

impl ExecuteOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the terminator.
    pub fn terminator(mut self, terminator: impl AsRef<[u8]>) -> Self {
        self.terminator = Some(terminator.as_ref().to_vec());
        self
    }

    /// Set the pagination banner.
    pub fn page_prompt(mut self, banner: impl AsRef<[u8]>) -> Self {
        self.page_prompt = Some(banner.as_ref().to_vec());
        self
    }

    /// Set the continuation bytes.
    pub fn continuation(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.continuation = Some(bytes.as_ref().to_vec());
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = TimeoutPolicy::default();
        assert_eq!(policy.connect, Duration::from_secs(10));
        assert_eq!(policy.read, Duration::from_secs(30));
        assert_eq!(policy.poll_interval, Duration::from_millis(100));
        assert_eq!(policy.read_chunk, 65535);
    }

    #[test]
    fn test_serde_float_seconds() {
        let policy: TimeoutPolicy =
            serde_json::from_str(r#"{"read": 2.5, "poll_interval": 0.05}"#).unwrap();
        assert_eq!(policy.read, Duration::from_millis(2500));
        assert_eq!(policy.poll_interval, Duration::from_millis(50));
        assert_eq!(policy.connect, Duration::from_secs(10));

        let json = serde_json::to_value(policy).unwrap();
        assert_eq!(json["read"], 2.5);
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(serde_json::from_str::<TimeoutPolicy>(r#"{"read": -1.0}"#).is_err());
    }

    #[test]
    fn test_execute_options_builder() {
        let options = ExecuteOptions::new()
            .terminator("]")
            .page_prompt("")
            .timeout(Duration::from_secs(5));
        assert_eq!(options.terminator.as_deref(), Some(&b"]"[..]));
        assert_eq!(options.page_prompt.as_deref(), Some(&b""[..]));
        assert!(options.continuation.is_none());
    }
}
