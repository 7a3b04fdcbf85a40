//! Connection targets and transport configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::session::secs;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    /// This is the default and matches common SSH client behavior.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// Authentication method for a target.
pub enum AuthMethod {
    /// No authentication (telnet without login, or SSH `none`).
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication (SSH only).
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::None => f.write_str("None"),
            AuthMethod::Password(_) => f.write_str("Password(<redacted>)"),
            AuthMethod::PrivateKey { path, .. } => f
                .debug_struct("PrivateKey")
                .field("path", path)
                .finish_non_exhaustive(),
        }
    }
}

/// A device to connect to.
#[derive(Debug)]
pub struct Target {
    /// Name used in logs and errors (defaults to the host).
    pub name: String,

    /// Hostname or IP address.
    pub host: String,

    /// TCP port.
    pub port: u16,

    /// Login name, if the transport authenticates.
    pub username: Option<String>,

    /// Authentication method.
    pub auth: AuthMethod,
}

impl Target {
    /// Create a target with no credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            name: host.clone(),
            host,
            port,
            username: None,
            auth: AuthMethod::None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Use password authentication.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Use private key authentication.
    pub fn with_private_key(mut self, path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: path.into(),
            passphrase: passphrase.map(SecretString::from),
        };
        self
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SSH connector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

/// Telnet connector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelnetConfig {
    /// Substrings (matched case-insensitively) that mark the login prompt.
    pub login_prompts: Vec<String>,

    /// Substrings (matched case-insensitively) that mark the password prompt.
    pub password_prompts: Vec<String>,

    /// Delay between reads while waiting for the login dialogue.
    #[serde(with = "secs")]
    pub login_poll_interval: Duration,
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self {
            login_prompts: vec!["username:".into(), "login:".into()],
            password_prompts: vec!["password:".into()],
            login_poll_interval: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_builder() {
        let target = Target::new("10.0.0.1", 22)
            .with_name("core-sw1")
            .with_username("admin")
            .with_password("Admin@123");
        assert_eq!(target.name, "core-sw1");
        assert_eq!(target.socket_addr(), "10.0.0.1:22");
        assert_eq!(target.username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let target = Target::new("10.0.0.1", 22).with_password("Admin@123");
        let text = format!("{:?}", target);
        assert!(!text.contains("Admin@123"));
        assert!(text.contains("redacted"));
    }

    #[test]
    fn test_ssh_config_serde() {
        let config: SshConfig =
            serde_json::from_str(r#"{"host_key_verification": "disabled", "terminal_width": 200}"#)
                .unwrap();
        assert_eq!(config.host_key_verification, HostKeyVerification::Disabled);
        assert_eq!(config.terminal_width, 200);
        assert_eq!(config.terminal_height, 24);

        let telnet: TelnetConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(telnet, TelnetConfig::default());

        let telnet: TelnetConfig =
            serde_json::from_str(r#"{"login_poll_interval": 0.2}"#).unwrap();
        assert_eq!(telnet.login_poll_interval, Duration::from_millis(200));
        assert_eq!(telnet.login_prompts, TelnetConfig::default().login_prompts);
    }

    #[test]
    fn test_name_defaults_to_host() {
        assert_eq!(Target::new("r1.lab", 23).name, "r1.lab");
    }
}
