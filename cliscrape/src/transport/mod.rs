//! Transport layer: byte-oriented duplex channels to devices.
//!
//! The session engine only ever talks to a [`Transport`]; how the bytes
//! travel (an SSH shell channel, a telnet socket) is decided by the
//! [`Connector`] that opened it.

pub mod config;
mod ssh;
mod telnet;
#[cfg(test)]
pub(crate) mod testing;

pub use config::{AuthMethod, HostKeyVerification, SshConfig, Target, TelnetConfig};
pub use ssh::{SshConnector, SshTransport};
pub use telnet::{TelnetConnector, TelnetTransport};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// An open byte stream to a device's interactive shell.
pub trait Transport: Send {
    /// Write bytes to the device.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Whether bytes can be received right now. Never blocks.
    fn bytes_available(&mut self) -> bool;

    /// Receive up to `max_bytes` of whatever is available without waiting.
    ///
    /// Returns an empty buffer when nothing is pending and fails with
    /// [`TransportError::Disconnected`](crate::error::TransportError::Disconnected)
    /// once the channel is closed and drained.
    fn receive(&mut self, max_bytes: usize) -> impl Future<Output = Result<Bytes>> + Send;

    /// Close the channel. Closing twice is a no-op.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the channel is still open.
    fn is_open(&self) -> bool;
}

/// Opens transports to targets.
pub trait Connector: Send + Sync {
    /// The transport this connector produces.
    type Transport: Transport;

    /// Open an authenticated channel, giving up after `timeout`.
    fn open(
        &self,
        target: &Target,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}

impl<C: Connector> Connector for Arc<C> {
    type Transport = C::Transport;

    fn open(
        &self,
        target: &Target,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Transport>> + Send {
        (**self).open(target, timeout)
    }
}
