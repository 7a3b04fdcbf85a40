//! Scripted transport for engine tests.
//!
//! A script is a queue of steps. Chunks become readable in order; an
//! `AwaitWrite` step holds back everything after it until the engine writes
//! something, which is how a device behaves (it answers input).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use super::config::Target;
use super::{Connector, Transport};
use crate::error::{Result, TransportError};

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Chunk(Vec<u8>),
    AwaitWrite,
    Close,
}

#[derive(Debug, Default)]
struct Shared {
    steps: VecDeque<Step>,
    writes: Vec<Vec<u8>>,
    open: bool,
    closes: usize,
}

/// Inspection handle kept by the test after the transport moves into a session.
#[derive(Debug, Clone)]
pub(crate) struct ScriptHandle(Arc<Mutex<Shared>>);

impl ScriptHandle {
    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap().writes.clone()
    }

    pub(crate) fn writes_as_strings(&self) -> Vec<String> {
        self.writes()
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.0.lock().unwrap().closes
    }

    pub(crate) fn push(&self, step: Step) {
        self.0.lock().unwrap().steps.push_back(step);
    }
}

/// Counts transports handed out and not yet closed.
#[derive(Debug, Default)]
pub(crate) struct SessionGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl SessionGauge {
    fn opened(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Most transports open at the same time so far.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub(crate) struct ScriptedTransport {
    shared: Arc<Mutex<Shared>>,
    gauge: Option<Arc<SessionGauge>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>) -> (Self, ScriptHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            steps: steps.into(),
            open: true,
            ..Default::default()
        }));
        (
            Self {
                shared: shared.clone(),
                gauge: None,
            },
            ScriptHandle(shared),
        )
    }

    fn apply_close_steps(shared: &mut Shared) {
        while matches!(shared.steps.front(), Some(Step::Close)) {
            shared.steps.pop_front();
            shared.open = false;
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        if !shared.open {
            return Err(TransportError::Disconnected.into());
        }
        shared.writes.push(data.to_vec());
        if matches!(shared.steps.front(), Some(Step::AwaitWrite)) {
            shared.steps.pop_front();
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> bool {
        let mut shared = self.shared.lock().unwrap();
        Self::apply_close_steps(&mut shared);
        matches!(shared.steps.front(), Some(Step::Chunk(_)))
    }

    async fn receive(&mut self, max_bytes: usize) -> Result<Bytes> {
        let mut shared = self.shared.lock().unwrap();
        Self::apply_close_steps(&mut shared);
        if !matches!(shared.steps.front(), Some(Step::Chunk(_))) {
            return if shared.open {
                Ok(Bytes::new())
            } else {
                Err(TransportError::Disconnected.into())
            };
        }
        let Some(Step::Chunk(data)) = shared.steps.pop_front() else {
            unreachable!("front was checked to be a chunk");
        };
        if data.len() > max_bytes {
            shared
                .steps
                .push_front(Step::Chunk(data[max_bytes..].to_vec()));
            return Ok(Bytes::copy_from_slice(&data[..max_bytes]));
        }
        Ok(Bytes::from(data))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(gauge) = self.gauge.take() {
            gauge.closed();
        }
        let mut shared = self.shared.lock().unwrap();
        shared.closes += 1;
        shared.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        let mut shared = self.shared.lock().unwrap();
        Self::apply_close_steps(&mut shared);
        shared.open
    }
}

/// Hands out one pre-scripted transport, then refuses further connections.
pub(crate) struct ScriptedConnector {
    transport: Mutex<Option<ScriptedTransport>>,
    fail: bool,
}

impl ScriptedConnector {
    pub(crate) fn new(steps: Vec<Step>) -> (Self, ScriptHandle) {
        let (transport, handle) = ScriptedTransport::new(steps);
        (
            Self {
                transport: Mutex::new(Some(transport)),
                fail: false,
            },
            handle,
        )
    }

    /// A connector whose target is unreachable.
    pub(crate) fn unreachable() -> Self {
        Self {
            transport: Mutex::new(None),
            fail: true,
        }
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn open(&self, target: &Target, _timeout: Duration) -> Result<ScriptedTransport> {
        let taken = self.transport.lock().unwrap().take();
        match taken {
            Some(transport) if !self.fail => Ok(transport),
            _ => Err(TransportError::ConnectionFailed {
                host: target.host.clone(),
                port: target.port,
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            }
            .into()),
        }
    }
}

/// Shorthand for building scripts.
pub(crate) fn chunk(data: impl AsRef<[u8]>) -> Step {
    Step::Chunk(data.as_ref().to_vec())
}

/// One scripted transport per host; unknown hosts refuse the connection.
pub(crate) struct ScriptedFleet {
    transports: Mutex<HashMap<String, ScriptedTransport>>,
    gauge: Arc<SessionGauge>,
    connect_delay: Duration,
}

impl ScriptedFleet {
    pub(crate) fn new() -> Self {
        Self {
            transports: Mutex::new(HashMap::new()),
            gauge: Arc::new(SessionGauge::default()),
            connect_delay: Duration::ZERO,
        }
    }

    /// Hold every successful open for `delay` so sessions overlap.
    pub(crate) fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub(crate) fn gauge(&self) -> Arc<SessionGauge> {
        self.gauge.clone()
    }

    pub(crate) fn device(&self, host: &str, steps: Vec<Step>) -> ScriptHandle {
        let (transport, handle) = ScriptedTransport::new(steps);
        self.transports
            .lock()
            .unwrap()
            .insert(host.to_string(), transport);
        handle
    }
}

impl Connector for ScriptedFleet {
    type Transport = ScriptedTransport;

    async fn open(&self, target: &Target, _timeout: Duration) -> Result<ScriptedTransport> {
        let taken = self.transports.lock().unwrap().remove(&target.host);
        let Some(mut transport) = taken else {
            return Err(TransportError::ConnectionFailed {
                host: target.host.clone(),
                port: target.port,
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            }
            .into());
        };
        self.gauge.opened();
        transport.gauge = Some(self.gauge.clone());
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        Ok(transport)
    }
}
