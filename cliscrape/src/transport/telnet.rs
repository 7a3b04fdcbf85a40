//! Telnet transport over a plain TCP socket.
//!
//! Option negotiation is answered by refusing everything the server offers
//! or asks for, which leaves the connection in the NVT default mode most
//! network devices fall back to.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use log::{debug, trace};
use secrecy::ExposeSecret;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::Instant;

use super::config::{AuthMethod, TelnetConfig, Target};
use super::{Connector, Transport};
use crate::error::{Result, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// Opens telnet sessions, optionally performing the login dialogue.
#[derive(Debug, Clone, Default)]
pub struct TelnetConnector {
    config: TelnetConfig,
}

impl TelnetConnector {
    /// Create a connector with the given options.
    pub fn new(config: TelnetConfig) -> Self {
        Self { config }
    }

    async fn open_inner(&self, target: &Target, deadline: Instant) -> Result<TelnetTransport> {
        let stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|source| TransportError::ConnectionFailed {
                host: target.host.clone(),
                port: target.port,
                source,
            })?;
        stream.set_nodelay(true).map_err(TransportError::Io)?;

        let mut transport = TelnetTransport::new(stream);
        debug!("[{}] telnet connection open", target.name);

        if let Some(user) = &target.username {
            transport
                .read_until_any(&self.config.login_prompts, deadline, self.config.login_poll_interval)
                .await?;
            transport.send(format!("{}\n", user).as_bytes()).await?;

            if let AuthMethod::Password(password) = &target.auth {
                transport
                    .read_until_any(
                        &self.config.password_prompts,
                        deadline,
                        self.config.login_poll_interval,
                    )
                    .await?;
                let mut line = password.expose_secret().as_bytes().to_vec();
                line.push(b'\n');
                transport.send(&line).await?;
            }
        }

        Ok(transport)
    }
}

impl Connector for TelnetConnector {
    type Transport = TelnetTransport;

    async fn open(&self, target: &Target, timeout: Duration) -> Result<TelnetTransport> {
        let deadline = Instant::now() + timeout;
        tokio::time::timeout(timeout, self.open_inner(target, deadline))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }
}

/// Where the IAC decoder is inside a command sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IacState {
    Data,
    Iac,
    Option(u8),
    Sub,
    SubIac,
}

/// Strips telnet commands from the byte stream and collects the replies
/// they require.
#[derive(Debug)]
struct IacDecoder {
    state: IacState,
}

impl IacDecoder {
    fn new() -> Self {
        Self {
            state: IacState::Data,
        }
    }

    /// Decode `input`, appending payload bytes to `data` and negotiation
    /// replies to `replies`.
    fn decode(&mut self, input: &[u8], data: &mut BytesMut, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match self.state {
                IacState::Data if byte == IAC => IacState::Iac,
                IacState::Data => {
                    data.extend_from_slice(&[byte]);
                    IacState::Data
                }
                IacState::Iac => match byte {
                    IAC => {
                        data.extend_from_slice(&[IAC]);
                        IacState::Data
                    }
                    DO | DONT | WILL | WONT => IacState::Option(byte),
                    SB => IacState::Sub,
                    _ => IacState::Data,
                },
                IacState::Option(command) => {
                    match command {
                        DO => replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, byte]),
                        _ => {}
                    }
                    trace!("telnet option {} {} refused", command, byte);
                    IacState::Data
                }
                IacState::Sub if byte == IAC => IacState::SubIac,
                IacState::Sub => IacState::Sub,
                IacState::SubIac if byte == SE => IacState::Data,
                IacState::SubIac => IacState::Sub,
            };
        }
    }
}

/// A telnet connection to a device.
pub struct TelnetTransport {
    stream: TcpStream,
    decoder: IacDecoder,
    pending: BytesMut,
    replies: Vec<u8>,
    open: bool,
}

impl TelnetTransport {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            decoder: IacDecoder::new(),
            pending: BytesMut::with_capacity(8192),
            replies: Vec::new(),
            open: true,
        }
    }

    /// Pull whatever the socket already holds, without waiting.
    fn fill(&mut self) {
        let mut buf = [0u8; 4096];
        while self.open {
            match self.stream.try_read(&mut buf) {
                Ok(0) => {
                    debug!("telnet connection closed by peer");
                    self.open = false;
                }
                Ok(n) => self
                    .decoder
                    .decode(&buf[..n], &mut self.pending, &mut self.replies),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("telnet read failed: {}", e);
                    self.open = false;
                }
            }
        }
    }

    async fn flush_replies(&mut self) -> Result<()> {
        if self.replies.is_empty() {
            return Ok(());
        }
        let replies = std::mem::take(&mut self.replies);
        self.stream
            .write_all(&replies)
            .await
            .map_err(TransportError::Io)?;
        Ok(())
    }

    /// Wait for any of `needles` (case-insensitive) during login.
    async fn read_until_any(
        &mut self,
        needles: &[String],
        deadline: Instant,
        poll: Duration,
    ) -> Result<()> {
        let needles: Vec<String> = needles.iter().map(|n| n.to_lowercase()).collect();
        let mut seen = String::new();

        loop {
            let chunk = self.receive(4096).await?;
            self.flush_replies().await?;
            if !chunk.is_empty() {
                seen.push_str(&String::from_utf8_lossy(&chunk).to_lowercase());
                if needles.iter().any(|n| seen.contains(n.as_str())) {
                    return Ok(());
                }
                continue;
            }
            if Instant::now() >= deadline {
                return Err(TransportError::TelnetLogin(format!(
                    "none of {:?} seen before timeout",
                    needles
                ))
                .into());
            }
            tokio::time::sleep(poll).await;
        }
    }
}

impl Transport for TelnetTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(TransportError::Disconnected.into());
        }
        self.flush_replies().await?;

        // A literal 0xFF must be doubled on the wire.
        let mut escaped = Vec::with_capacity(data.len());
        for &byte in data {
            escaped.push(byte);
            if byte == IAC {
                escaped.push(IAC);
            }
        }
        self.stream
            .write_all(&escaped)
            .await
            .map_err(TransportError::Io)?;
        Ok(())
    }

    fn bytes_available(&mut self) -> bool {
        self.fill();
        !self.pending.is_empty()
    }

    async fn receive(&mut self, max_bytes: usize) -> Result<Bytes> {
        self.fill();
        if !self.replies.is_empty() && self.open {
            self.flush_replies().await?;
        }
        if self.pending.is_empty() {
            if !self.open {
                return Err(TransportError::Disconnected.into());
            }
            return Ok(Bytes::new());
        }
        let n = self.pending.len().min(max_bytes.max(1));
        Ok(self.pending.split_to(n).freeze())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.stream.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
