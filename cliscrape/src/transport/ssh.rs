//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::FutureExt;
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig, Target};
use super::{Connector, Transport};
use crate::error::{Result, TransportError};

/// Opens interactive SSH shell channels.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    /// Create a connector with the given options.
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Get the connector options.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    async fn open_inner(&self, target: &Target) -> Result<SshTransport> {
        let ssh_config = Arc::new(client::Config::default());

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: target.host.clone(),
            port: target.port,
            host_key_verification: self.config.host_key_verification,
            known_hosts_path: self.config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = client::connect(ssh_config, (target.host.as_str(), target.port), handler)
            .await
            .map_err(|e| {
                // If check_server_key stored a detailed error, use that instead
                // of the generic russh::Error::UnknownKey
                host_key_error
                    .lock()
                    .ok()
                    .and_then(|mut slot| slot.take())
                    .unwrap_or(TransportError::Ssh(e))
            })?;

        authenticate(&mut session, target).await?;

        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        debug!("[{}] SSH shell channel open", target.name);

        Ok(SshTransport {
            session,
            channel,
            pending: BytesMut::with_capacity(8192),
            open: true,
            disconnected: false,
        })
    }
}

impl Connector for SshConnector {
    type Transport = SshTransport;

    async fn open(&self, target: &Target, timeout: Duration) -> Result<SshTransport> {
        tokio::time::timeout(timeout, self.open_inner(target))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }
}

/// Authenticate with the server.
async fn authenticate(session: &mut Handle<SshHandler>, target: &Target) -> Result<()> {
    let user = target.username.as_deref().unwrap_or_default();

    let success = match &target.auth {
        AuthMethod::None => session
            .authenticate_none(user)
            .await
            .map_err(TransportError::Ssh)?
            .success(),
        AuthMethod::Password(password) => session
            .authenticate_password(user, password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success(),
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                .map_err(|e| TransportError::Key(e.to_string()))?;

            // Get the best RSA hash algorithm supported by the server
            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .map_err(TransportError::Ssh)?
                .flatten();

            session
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
                .await
                .map_err(TransportError::Ssh)?
                .success()
        }
    };

    if !success {
        return Err(TransportError::AuthenticationFailed {
            user: user.to_string(),
        }
        .into());
    }

    Ok(())
}

/// An interactive shell channel over SSH.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The PTY shell channel.
    channel: Channel<Msg>,

    /// Data received from the channel but not yet handed out.
    pending: BytesMut,

    /// Cleared on EOF/close from the server or a local close.
    open: bool,

    disconnected: bool,
}

impl SshTransport {
    /// Drain channel messages that have already arrived, without waiting.
    fn fill(&mut self) {
        while self.open {
            match self.channel.wait().now_or_never() {
                None => break,
                Some(None) => self.open = false,
                Some(Some(msg)) => match msg {
                    ChannelMsg::Data { ref data } => self.pending.extend_from_slice(data),
                    ChannelMsg::ExtendedData { ref data, .. } => {
                        self.pending.extend_from_slice(data)
                    }
                    ChannelMsg::Eof | ChannelMsg::Close => {
                        debug!("SSH channel closed by peer");
                        self.open = false;
                    }
                    other => trace!("ignoring channel message: {:?}", other),
                },
            }
        }
    }
}

impl Transport for SshTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::Disconnected.into());
        }
        self.channel.data(data).await.map_err(TransportError::Ssh)?;
        Ok(())
    }

    fn bytes_available(&mut self) -> bool {
        self.fill();
        !self.pending.is_empty()
    }

    async fn receive(&mut self, max_bytes: usize) -> Result<Bytes> {
        self.fill();
        if self.pending.is_empty() {
            if !self.is_open() {
                return Err(TransportError::Disconnected.into());
            }
            return Ok(Bytes::new());
        }
        let n = self.pending.len().min(max_bytes.max(1));
        Ok(self.pending.split_to(n).freeze())
    }

    async fn close(&mut self) -> Result<()> {
        if self.disconnected {
            return Ok(());
        }
        self.disconnected = true;
        if self.open {
            self.open = false;
            if let Err(e) = self.channel.eof().await {
                debug!("SSH channel eof failed: {}", e);
            }
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open && !self.session.is_closed()
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
