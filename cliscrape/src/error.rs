//! Error types for cliscrape.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::session::CommandResult;

/// Main error type for cliscrape operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors (SSH, telnet, sockets)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session engine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Template loading errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Device profile errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl Error {
    /// Whether this error is a `wait_for` or `execute` timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Session(SessionError::Timeout { .. })
                | Error::Session(SessionError::ExecutionTimeout { .. })
                | Error::Transport(TransportError::Timeout(_))
        )
    }

    /// Whether this error happened while establishing the connection.
    pub fn is_connect(&self) -> bool {
        matches!(
            self,
            Error::Session(SessionError::Connect { .. }) | Error::Transport(_)
        )
    }

    /// Whether retrying the same operation (perhaps with a longer timeout)
    /// can succeed without changing caller logic.
    pub fn is_retryable(&self) -> bool {
        self.is_timeout()
    }

    /// The partial output captured before an `execute` timed out.
    pub fn partial_result(&self) -> Option<&CommandResult> {
        match self {
            Error::Session(SessionError::ExecutionTimeout { partial, .. }) => Some(partial),
            _ => None,
        }
    }
}

/// Transport layer errors (connection, authentication, raw I/O).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key not present in known_hosts (strict checking)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Telnet login handshake failed
    #[error("Telnet login failed: {0}")]
    TelnetLogin(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The engine phase an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    WaitFor,
    Send,
    Execute,
    Close,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connect => "connect",
            Phase::WaitFor => "wait_for",
            Phase::Send => "send",
            Phase::Execute => "execute",
            Phase::Close => "close",
        };
        f.write_str(name)
    }
}

/// Session engine errors.
///
/// Every variant names the target so that failures can be attributed
/// without inspecting the session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport could not be opened (unreachable host, auth failure).
    #[error("[{target}] connect failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: TransportError,
    },

    /// `connect` called on a session that is already connected.
    #[error("[{target}] session already connected")]
    AlreadyConnected { target: String },

    /// Operation attempted before `connect`.
    #[error("[{target}] session not connected - call connect() first")]
    NotConnected { target: String },

    /// `wait_for` did not observe any marker in time.
    #[error("[{target}] {phase}: none of {markers} seen within {timeout:?} ({received} bytes received)")]
    Timeout {
        target: String,
        phase: Phase,
        markers: String,
        timeout: Duration,
        received: usize,
    },

    /// `execute` did not observe its terminator in time.
    ///
    /// The bytes captured so far are kept in `partial`
    /// (`terminated_by_prompt` is false).
    #[error("[{target}] execute '{command}': terminator not seen within {timeout:?}")]
    ExecutionTimeout {
        target: String,
        command: String,
        timeout: Duration,
        partial: Box<CommandResult>,
    },

    /// `execute` without a terminator and no remembered prompt.
    #[error("[{target}] execute '{command}': prompt unknown, call wait_for() first or pass a terminator")]
    PromptUnknown { target: String, command: String },

    /// Operation attempted after `close`.
    #[error("[{target}] {operation}: session closed")]
    Closed { target: String, operation: Phase },

    /// Marker set was empty or contained an empty marker.
    #[error("[{target}] {phase}: invalid marker set: {reason}")]
    InvalidMarkers {
        target: String,
        phase: Phase,
        reason: String,
    },

    /// The channel failed in the middle of an operation.
    #[error("[{target}] {phase} failed: {source}")]
    Io {
        target: String,
        phase: Phase,
        #[source]
        source: TransportError,
    },

    /// Invalid session configuration (e.g. missing username for SSH).
    #[error("Invalid session configuration: {message}")]
    InvalidConfig { message: String },

    /// A configuration-mode operation was requested on a profile without one.
    #[error("[{target}] profile '{profile}' has no configuration mode")]
    NoConfigMode { target: String, profile: String },
}

/// Template definition errors.
///
/// Malformed input *text* never produces an error; only the template does.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Structural problem: undefined value or state, bad option, bad layout.
    #[error("template line {line}: {message}")]
    Load { line: usize, message: String },

    /// A value or rule regex does not compile.
    #[error("template line {line}: invalid pattern: {source}")]
    Pattern {
        line: usize,
        #[source]
        source: regex::Error,
    },
}

impl TemplateError {
    pub(crate) fn load(line: usize, message: impl Into<String>) -> Self {
        TemplateError::Load {
            line,
            message: message.into(),
        }
    }
}

/// Device profile errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid profile definition
    #[error("Invalid profile definition: {message}")]
    InvalidDefinition { message: String },

    /// No profile registered under this name
    #[error("Unknown profile '{name}'")]
    UnknownProfile { name: String },

    /// A profile with this name already exists
    #[error("Profile '{name}' is already registered")]
    AlreadyRegistered { name: String },
}

/// Result type alias using cliscrape's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_carry_target_and_phase() {
        let err: Error = SessionError::Closed {
            target: "core-sw1".into(),
            operation: Phase::Execute,
        }
        .into();
        let text = err.to_string();
        assert!(text.contains("core-sw1"));
        assert!(text.contains("execute"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_classification() {
        let err: Error = SessionError::Timeout {
            target: "r1".into(),
            phase: Phase::WaitFor,
            markers: "[\"]\"]".into(),
            timeout: Duration::from_secs(1),
            received: 0,
        }
        .into();
        assert!(err.is_timeout());
        assert!(err.is_retryable());
        assert!(err.partial_result().is_none());
    }

    #[test]
    fn test_connect_classification() {
        let err: Error = SessionError::Connect {
            target: "r1".into(),
            source: TransportError::AuthenticationFailed {
                user: "admin".into(),
            },
        }
        .into();
        assert!(err.is_connect());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("admin"));
    }
}
