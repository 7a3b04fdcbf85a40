//! Builder for creating sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{Session, TimeoutPolicy};
use crate::error::{Result, SessionError};
use crate::platform::{DeviceProfile, ProfileRegistry};
use crate::transport::{
    HostKeyVerification, SshConfig, SshConnector, Target, TelnetConfig, TelnetConnector,
};

/// Builder for constructing sessions.
///
/// # Example
///
/// ```rust,no_run
/// use cliscrape::SessionBuilder;
///
/// # async fn example() -> Result<(), cliscrape::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .profile("huawei_vrp")
///     .build_ssh()?;
///
/// session.open().await?;
/// let result = session.execute("display version").await?;
/// println!("{}", result.sanitized);
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: Option<u16>,
    name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    private_key: Option<(PathBuf, Option<String>)>,
    profile_name: Option<String>,
    custom_profile: Option<DeviceProfile>,
    policy: TimeoutPolicy,
    ssh: SshConfig,
    telnet: TelnetConfig,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            name: None,
            username: None,
            password: None,
            private_key: None,
            profile_name: None,
            custom_profile: None,
            policy: TimeoutPolicy::default(),
            ssh: SshConfig::default(),
            telnet: TelnetConfig::default(),
        }
    }

    /// Set the port (default: 22 for SSH, 23 for telnet).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the name used in logs and errors (default: the host).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.private_key = Some((key_path.into(), None));
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.private_key = Some((key_path.into(), Some(passphrase.into())));
        self
    }

    /// Set the device profile by name (e.g., "huawei_vrp", "cisco_ios").
    pub fn profile(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    /// Set a custom device profile.
    pub fn custom_profile(mut self, profile: DeviceProfile) -> Self {
        self.custom_profile = Some(profile);
        self
    }

    /// Replace the whole timeout policy.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.policy.connect = timeout;
        self
    }

    /// Set the default read timeout for `wait_for` and `execute`.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.policy.read = timeout;
        self
    }

    /// Set the sleep between read attempts.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.policy.poll_interval = interval;
        self
    }

    /// Set terminal dimensions (SSH only).
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.ssh.terminal_width = width;
        self.ssh.terminal_height = height;
        self
    }

    /// Set the host key verification mode (SSH only).
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.ssh.host_key_verification = mode;
        self
    }

    /// Set a custom known_hosts file path (SSH only).
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssh.known_hosts_path = Some(path.into());
        self
    }

    /// Set the telnet login dialogue prompts.
    pub fn telnet_config(mut self, config: TelnetConfig) -> Self {
        self.telnet = config;
        self
    }

    /// Build an SSH session.
    ///
    /// This creates the session but does not connect. Call `open()` or
    /// `connect()` on the returned session to establish the connection.
    pub fn build_ssh(self) -> Result<Session<SshConnector>> {
        if self.username.is_none() {
            return Err(SessionError::InvalidConfig {
                message: "Username is required for SSH".to_string(),
            }
            .into());
        }
        let connector = SshConnector::new(self.ssh.clone());
        let (target, profile, policy) = self.into_parts(22)?;
        Ok(Session::new(connector, target, profile, policy))
    }

    /// Build a telnet session.
    ///
    /// Without a username the connector skips the login dialogue.
    pub fn build_telnet(self) -> Result<Session<TelnetConnector>> {
        if self.private_key.is_some() {
            return Err(SessionError::InvalidConfig {
                message: "Private key authentication is not available over telnet".to_string(),
            }
            .into());
        }
        let connector = TelnetConnector::new(self.telnet.clone());
        let (target, profile, policy) = self.into_parts(23)?;
        Ok(Session::new(connector, target, profile, policy))
    }

    fn into_parts(self, default_port: u16) -> Result<(Target, Arc<DeviceProfile>, TimeoutPolicy)> {
        let profile = match (self.custom_profile, self.profile_name) {
            (Some(custom), _) => Arc::new(custom),
            (None, Some(name)) => ProfileRegistry::lookup(&name)?,
            (None, None) => ProfileRegistry::lookup("generic")?,
        };

        let mut target = Target::new(self.host, self.port.unwrap_or(default_port));
        if let Some(name) = self.name {
            target = target.with_name(name);
        }
        if let Some(username) = self.username {
            target = target.with_username(username);
        }
        if let Some((path, passphrase)) = self.private_key {
            target = target.with_private_key(path, passphrase);
        } else if let Some(password) = self.password {
            target = target.with_password(password);
        }

        Ok((target, profile, self.policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, PlatformError};
    use crate::session::SessionState;
    use crate::transport::AuthMethod;

    #[test]
    fn test_build_ssh_defaults() {
        let session = SessionBuilder::new("192.0.2.1")
            .username("admin")
            .password("Admin@123")
            .profile("huawei_vrp")
            .read_timeout(Duration::from_secs(60))
            .build_ssh()
            .unwrap();

        assert_eq!(session.target().port, 22);
        assert_eq!(session.target().name, "192.0.2.1");
        assert!(matches!(session.target().auth, AuthMethod::Password(_)));
        assert_eq!(session.profile().name, "huawei_vrp");
        assert_eq!(session.timeout_policy().read, Duration::from_secs(60));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_build_ssh_requires_username() {
        let err = SessionBuilder::new("192.0.2.1").build_ssh().err().unwrap();
        assert!(matches!(
            err,
            Error::Session(SessionError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_build_telnet() {
        let session = SessionBuilder::new("192.0.2.1")
            .name("lab-sw")
            .build_telnet()
            .unwrap();
        assert_eq!(session.target().port, 23);
        assert_eq!(session.target().name, "lab-sw");
        assert_eq!(session.profile().name, "generic");
        assert!(matches!(session.target().auth, AuthMethod::None));
    }

    #[test]
    fn test_telnet_rejects_private_key() {
        assert!(
            SessionBuilder::new("192.0.2.1")
                .private_key("/tmp/id_ed25519")
                .build_telnet()
                .is_err()
        );
    }

    #[test]
    fn test_unknown_profile() {
        let err = SessionBuilder::new("192.0.2.1")
            .username("admin")
            .profile("vendor_x")
            .build_ssh()
            .err().unwrap();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn test_custom_profile_wins() {
        let session = SessionBuilder::new("192.0.2.1")
            .username("admin")
            .profile("huawei_vrp")
            .custom_profile(DeviceProfile::new("lab"))
            .port(2222)
            .build_ssh()
            .unwrap();
        assert_eq!(session.profile().name, "lab");
        assert_eq!(session.target().port, 2222);
    }
}
