//! TCP reachability probe.

use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Outcome of a reachability probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reachability {
    pub reachable: bool,

    /// Time to complete the TCP handshake, in milliseconds.
    pub rtt_ms: Option<f64>,

    pub error: Option<String>,
}

/// Try a TCP connection to `host:port` within `timeout`.
///
/// The connection is dropped as soon as the handshake completes.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> Reachability {
    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, TcpStream::connect((host, port))).await;

    let reachability = match outcome {
        Ok(Ok(_stream)) => Reachability {
            reachable: true,
            rtt_ms: Some(start.elapsed().as_secs_f64() * 1000.0),
            error: None,
        },
        Ok(Err(e)) => Reachability {
            reachable: false,
            rtt_ms: None,
            error: Some(e.to_string()),
        },
        Err(_) => Reachability {
            reachable: false,
            rtt_ms: None,
            error: Some(format!("no answer within {:?}", timeout)),
        },
    };
    debug!("probe {}:{} -> {:?}", host, port, reachability);
    reachability
}
