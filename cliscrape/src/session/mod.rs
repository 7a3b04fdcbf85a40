//! Session engine.
//!
//! A [`Session`] owns one transport and drives it through prompt memory,
//! command dispatch, pagination and completion detection. The reappearance
//! of the prompt is the only completion signal; pagination banners are
//! dismissed by sending the continuation bytes once per banner.
//!
//! ```text
//! Disconnected --connect--> Connected --wait_for--> PromptKnown
//!                                                     |    ^
//!                                              execute|    |
//!                                                     v    |
//!                                                   Executing
//! any state --close--> Closed (terminal)
//! ```

mod builder;
mod interactive;
mod policy;
mod result;

pub use builder::SessionBuilder;
pub use interactive::{InteractiveBuilder, InteractiveEvent, InteractiveResult, InteractiveStep};
pub(crate) use policy::secs;
pub use policy::{ExecuteOptions, TimeoutPolicy};
pub use result::{CommandResult, ParsedOutput};

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, info, trace, warn};
use tokio::time::Instant;

use crate::channel::{CaptureBuffer, MarkerScanner, describe_markers};
use crate::error::{Error, Phase, Result, SessionError, TransportError};
use crate::platform::DeviceProfile;
use crate::sanitize::Sanitizer;
use crate::template::{Record, Template};
use crate::transport::{Connector, Target, Transport};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    AwaitingPrompt,
    PromptKnown,
    Executing,
    Closed,
}

/// An interactive CLI session with one device.
///
/// Operations on a session are strictly sequential (`&mut self`); run one
/// session per worker to talk to several devices at once.
pub struct Session<C: Connector> {
    connector: C,
    target: Target,
    profile: Arc<DeviceProfile>,
    sanitizer: Sanitizer,
    policy: TimeoutPolicy,
    transport: Option<C::Transport>,
    state: SessionState,

    /// Last marker matched by `wait_for`, the default `execute` terminator.
    remembered_prompt: Option<Vec<u8>>,
}

impl<C: Connector> Session<C> {
    /// Create a disconnected session.
    pub fn new(
        connector: C,
        target: Target,
        profile: Arc<DeviceProfile>,
        policy: TimeoutPolicy,
    ) -> Self {
        let sanitizer = profile.sanitizer();
        Self {
            connector,
            target,
            profile,
            sanitizer,
            policy,
            transport: None,
            state: SessionState::Disconnected,
            remembered_prompt: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The device this session talks to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The device profile in use.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// The sanitizer built from the profile.
    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// The timeout policy in use.
    pub fn timeout_policy(&self) -> &TimeoutPolicy {
        &self.policy
    }

    /// Replace the timeout policy.
    pub fn set_timeout_policy(&mut self, policy: TimeoutPolicy) {
        self.policy = policy;
    }

    /// The remembered prompt, if `wait_for` has matched one.
    pub fn remembered_prompt(&self) -> Option<&[u8]> {
        self.remembered_prompt.as_deref()
    }

    /// Whether the session is connected and the transport still open.
    pub fn is_alive(&self) -> bool {
        !matches!(
            self.state,
            SessionState::Disconnected | SessionState::Closed
        ) && self.transport.as_ref().is_some_and(|t| t.is_open())
    }

    /// Open the transport.
    ///
    /// Resets the remembered prompt. Bounded by the policy's connect timeout.
    pub async fn connect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Disconnected => {}
            SessionState::Closed => return Err(self.closed(Phase::Connect)),
            _ => {
                return Err(SessionError::AlreadyConnected {
                    target: self.target.name.clone(),
                }
                .into());
            }
        }

        info!(
            "[{}] connecting to {}",
            self.target.name,
            self.target.socket_addr()
        );
        let transport = self
            .connector
            .open(&self.target, self.policy.connect)
            .await
            .map_err(|e| match e {
                Error::Transport(source) => SessionError::Connect {
                    target: self.target.name.clone(),
                    source,
                }
                .into(),
                other => other,
            })?;

        self.transport = Some(transport);
        self.remembered_prompt = None;
        self.state = SessionState::Connected;
        debug!("[{}] connected", self.target.name);
        Ok(())
    }

    /// Connect, wait for the profile's prompt and run its on-open commands.
    ///
    /// Returns everything the device printed before the first prompt.
    pub async fn open(&mut self) -> Result<Bytes> {
        self.connect().await?;
        let markers = self.profile.prompt_markers.clone();
        let greeting = self.wait_for(&markers, self.policy.read).await?;
        for command in self.profile.on_open_commands.clone() {
            self.execute(&command).await?;
        }
        Ok(greeting)
    }

    /// Read until any of `markers` appears in the accumulated output.
    ///
    /// The first marker to match becomes the remembered prompt: the one
    /// whose first occurrence is lowest in the buffer, ties going to the
    /// order of `markers`. Returns all bytes read, marker included.
    pub async fn wait_for<M: AsRef<[u8]>>(
        &mut self,
        markers: &[M],
        timeout: Duration,
    ) -> Result<Bytes> {
        self.ensure_usable(Phase::WaitFor)?;
        if markers.is_empty() {
            return Err(self.invalid_markers(Phase::WaitFor, "no markers given"));
        }
        if markers.iter().any(|m| m.as_ref().is_empty()) {
            return Err(self.invalid_markers(Phase::WaitFor, "empty marker"));
        }

        let resume = self.state;
        self.state = SessionState::AwaitingPrompt;
        trace!(
            "[{}] waiting for {}",
            self.target.name,
            describe_markers(markers)
        );

        let deadline = Instant::now() + timeout;
        let mut buffer = CaptureBuffer::new();
        let mut scanner = MarkerScanner::new(markers);

        loop {
            if let Some(chunk) = self.read_available(Phase::WaitFor).await? {
                buffer.extend(&chunk);
                if let Some(m) = buffer.scan(&mut scanner) {
                    let marker = scanner.markers()[m.index].clone();
                    debug!(
                        "[{}] prompt remembered as {:?}",
                        self.target.name,
                        String::from_utf8_lossy(&marker)
                    );
                    self.remembered_prompt = Some(marker);
                    self.state = SessionState::PromptKnown;
                    return Ok(buffer.take());
                }
            } else {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                tokio::time::sleep(self.policy.poll_interval.min(deadline - now)).await;
                continue;
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        self.state = resume;
        debug!(
            "[{}] wait_for timed out after {:?}",
            self.target.name, timeout
        );
        Err(SessionError::Timeout {
            target: self.target.name.clone(),
            phase: Phase::WaitFor,
            markers: describe_markers(markers),
            timeout,
            received: buffer.len(),
        }
        .into())
    }

    /// Send a line of input, adding the newline if it is missing.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        self.ensure_usable(Phase::Send)?;
        self.write_line(text, Phase::Send, false).await
    }

    /// Send bytes exactly as given.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_usable(Phase::Send)?;
        trace!("[{}] sending raw {:?}", self.target.name, data);
        self.write(data, Phase::Send).await
    }

    /// Execute a command, ending at the remembered prompt.
    pub async fn execute(&mut self, command: &str) -> Result<CommandResult> {
        self.execute_with(command, &ExecuteOptions::default()).await
    }

    /// Execute a command with explicit terminator, pager or timeout.
    ///
    /// Fails with `PromptUnknown` before sending anything when there is
    /// neither a terminator in `options` nor a remembered prompt. On timeout
    /// the error carries the partial capture.
    pub async fn execute_with(
        &mut self,
        command: &str,
        options: &ExecuteOptions,
    ) -> Result<CommandResult> {
        self.ensure_usable(Phase::Execute)?;

        let Some(terminator) = options
            .terminator
            .clone()
            .or_else(|| self.remembered_prompt.clone())
        else {
            return Err(SessionError::PromptUnknown {
                target: self.target.name.clone(),
                command: command.to_string(),
            }
            .into());
        };
        if terminator.is_empty() {
            return Err(self.invalid_markers(Phase::Execute, "empty terminator"));
        }
        let page_prompt = options
            .page_prompt
            .clone()
            .unwrap_or_else(|| self.profile.page_prompt.clone());
        let continuation = options
            .continuation
            .clone()
            .unwrap_or_else(|| self.profile.continuation.clone());
        let timeout = options.timeout.unwrap_or(self.policy.read);

        let resume = self.state;
        self.state = SessionState::Executing;
        let start = Instant::now();
        let deadline = start + timeout;

        self.write_line(command, Phase::Execute, false).await?;

        let mut buffer = CaptureBuffer::new();
        let mut banners = (!page_prompt.is_empty()).then(|| MarkerScanner::new(&[&page_prompt]));
        let mut terminators = MarkerScanner::new(&[&terminator]);
        let mut pages = 0;

        loop {
            if let Some(chunk) = self.read_available(Phase::Execute).await? {
                buffer.extend(&chunk);

                if let Some(scanner) = banners.as_mut() {
                    while let Some(m) = buffer.scan(scanner) {
                        pages += 1;
                        debug!(
                            "[{}] page {} of '{}', sending continuation",
                            self.target.name, pages, command
                        );
                        terminators.skip_to(m.end);
                        self.write(&continuation, Phase::Execute).await?;
                    }
                }

                if buffer.scan(&mut terminators).is_some() {
                    self.state = resume;
                    let raw = buffer.take();
                    return Ok(self.build_result(command, raw, Some(terminator.as_slice()), pages, start));
                }
            } else {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                tokio::time::sleep(self.policy.poll_interval.min(deadline - now)).await;
                continue;
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        self.state = resume;
        debug!(
            "[{}] '{}' timed out after {:?} ({} bytes captured)",
            self.target.name,
            command,
            timeout,
            buffer.len()
        );
        let partial = self.build_result(command, buffer.take(), None, pages, start);
        Err(SessionError::ExecutionTimeout {
            target: self.target.name.clone(),
            command: command.to_string(),
            timeout,
            partial: Box::new(partial),
        }
        .into())
    }

    /// Execute several commands in order, stopping at the first error.
    pub async fn execute_many(&mut self, commands: &[&str]) -> Result<Vec<CommandResult>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.execute(command).await?);
        }
        Ok(results)
    }

    /// Execute a command and run `template` over the sanitized output.
    pub async fn execute_and_parse(
        &mut self,
        command: &str,
        template: &Template,
    ) -> Result<ParsedOutput> {
        let result = self.execute(command).await?;
        let mut records = template.records(&result.sanitized);
        let parsed: Vec<Record> = records.by_ref().collect();
        let stopped = records.stopped().map(String::from);
        if let Some(message) = &stopped {
            debug!(
                "[{}] template stopped on '{}': {}",
                self.target.name, command, message
            );
        }
        Ok(ParsedOutput {
            result,
            records: parsed,
            stopped,
        })
    }

    /// Apply configuration lines in the profile's configuration mode.
    ///
    /// Enters the mode, executes each line against the configuration
    /// prompt and returns to the remembered prompt. Lines the device
    /// rejects are reported through `failure_message`, not as errors.
    pub async fn configure(&mut self, commands: &[&str]) -> Result<Vec<CommandResult>> {
        self.ensure_usable(Phase::Execute)?;

        let profile = self.profile.clone();
        let (Some(enter), Some(config_prompt), Some(exit)) = (
            profile.config_enter.as_deref(),
            profile.config_prompt.as_deref(),
            profile.config_exit.as_deref(),
        ) else {
            return Err(SessionError::NoConfigMode {
                target: self.target.name.clone(),
                profile: profile.name.clone(),
            }
            .into());
        };
        let Some(previous) = self.remembered_prompt.clone() else {
            return Err(SessionError::PromptUnknown {
                target: self.target.name.clone(),
                command: enter.to_string(),
            }
            .into());
        };

        let in_config = ExecuteOptions::new().terminator(config_prompt);
        info!("[{}] entering configuration mode", self.target.name);
        self.execute_with(enter, &in_config).await?;

        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            let result = self.execute_with(command, &in_config).await?;
            if let Some(failure) = &result.failure_message {
                warn!("[{}] '{}' rejected: {}", self.target.name, command, failure);
            }
            results.push(result);
        }

        self.execute_with(exit, &ExecuteOptions::new().terminator(previous))
            .await?;
        info!("[{}] left configuration mode", self.target.name);
        Ok(results)
    }

    /// Close the transport. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        if let Some(mut transport) = self.transport.take() {
            info!("[{}] closing session", self.target.name);
            transport.close().await.map_err(|e| match e {
                Error::Transport(source) => SessionError::Io {
                    target: self.target.name.clone(),
                    phase: Phase::Close,
                    source,
                }
                .into(),
                other => other,
            })?;
        }
        Ok(())
    }

    fn ensure_usable(&self, phase: Phase) -> Result<()> {
        match self.state {
            SessionState::Closed => Err(self.closed(phase)),
            SessionState::Disconnected => Err(SessionError::NotConnected {
                target: self.target.name.clone(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn closed(&self, phase: Phase) -> Error {
        SessionError::Closed {
            target: self.target.name.clone(),
            operation: phase,
        }
        .into()
    }

    fn invalid_markers(&self, phase: Phase, reason: &str) -> Error {
        SessionError::InvalidMarkers {
            target: self.target.name.clone(),
            phase,
            reason: reason.to_string(),
        }
        .into()
    }

    fn transport_mut(&mut self) -> Result<&mut C::Transport> {
        match self.transport.as_mut() {
            Some(transport) => Ok(transport),
            None => Err(SessionError::NotConnected {
                target: self.target.name.clone(),
            }
            .into()),
        }
    }

    /// Write `text`, terminated by a newline, masking it in logs if `hidden`.
    async fn write_line(&mut self, text: &str, phase: Phase, hidden: bool) -> Result<()> {
        if hidden {
            trace!("[{}] sending ********", self.target.name);
        } else {
            trace!("[{}] sending {:?}", self.target.name, text);
        }
        if text.ends_with('\n') {
            self.write(text.as_bytes(), phase).await
        } else {
            let mut line = Vec::with_capacity(text.len() + 1);
            line.extend_from_slice(text.as_bytes());
            line.push(b'\n');
            self.write(&line, phase).await
        }
    }

    async fn write(&mut self, data: &[u8], phase: Phase) -> Result<()> {
        let outcome = self.transport_mut()?.send(data).await;
        match outcome {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(phase, e).await),
        }
    }

    /// Take whatever the transport holds right now.
    ///
    /// A closed transport is an I/O failure, so a session whose channel was
    /// closed under it errors on the next read instead of polling forever.
    async fn read_available(&mut self, phase: Phase) -> Result<Option<Bytes>> {
        let max_bytes = self.policy.read_chunk;
        let transport = self.transport_mut()?;
        if !transport.bytes_available() {
            if transport.is_open() {
                return Ok(None);
            }
            return Err(self.fail(phase, TransportError::Disconnected.into()).await);
        }
        let received = transport.receive(max_bytes).await;
        match received {
            Ok(data) => {
                trace!(
                    "[{}] received {} bytes: {:?}",
                    self.target.name,
                    data.len(),
                    String::from_utf8_lossy(&data)
                );
                Ok((!data.is_empty()).then_some(data))
            }
            Err(e) => Err(self.fail(phase, e).await),
        }
    }

    /// Tear down after a transport failure and attribute the error.
    async fn fail(&mut self, phase: Phase, error: Error) -> Error {
        let error = match error {
            Error::Transport(source) => SessionError::Io {
                target: self.target.name.clone(),
                phase,
                source,
            }
            .into(),
            other => other,
        };
        warn!("[{}] {}", self.target.name, error);
        self.state = SessionState::Closed;
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("[{}] close after failure: {}", self.target.name, e);
            }
        }
        error
    }

    fn build_result(
        &self,
        command: &str,
        raw: Bytes,
        terminator: Option<&[u8]>,
        pages: usize,
        start: Instant,
    ) -> CommandResult {
        let sanitized = self
            .sanitizer
            .sanitize(&String::from_utf8_lossy(&raw), command);
        let failure_message = self.profile.detect_failure(&sanitized);
        CommandResult {
            command: command.to_string(),
            raw,
            sanitized,
            terminated_by_prompt: terminator.is_some(),
            prompt: terminator.map(|t| String::from_utf8_lossy(t).into_owned()),
            pages,
            elapsed: start.elapsed(),
            failure_message,
        }
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        if self.transport.is_some() && self.state != SessionState::Closed {
            debug!(
                "[{}] session dropped without close(), transport released",
                self.target.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ProfileRegistry;
    use crate::transport::testing::{ScriptHandle, ScriptedConnector, Step, chunk};
    use tokio_test::{assert_err, assert_ok};

    fn session_with(profile: &str, steps: Vec<Step>) -> (Session<ScriptedConnector>, ScriptHandle) {
        let (connector, handle) = ScriptedConnector::new(steps);
        let policy = TimeoutPolicy {
            read: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let session = Session::new(
            connector,
            Target::new("192.0.2.1", 22).with_name("r1"),
            ProfileRegistry::lookup(profile).unwrap(),
            policy,
        );
        (session, handle)
    }

    fn session(steps: Vec<Step>) -> (Session<ScriptedConnector>, ScriptHandle) {
        session_with("huawei_vrp", steps)
    }

    /// Connected session that has already seen `<R1>`.
    async fn ready(mut steps: Vec<Step>) -> (Session<ScriptedConnector>, ScriptHandle) {
        steps.insert(0, chunk("Info: The max number of VTY users is 5.\r\n<R1>"));
        let (mut session, handle) = session(steps);
        session.connect().await.unwrap();
        session
            .wait_for(&[">", "]"], Duration::from_secs(1))
            .await
            .unwrap();
        (session, handle)
    }

    fn session_error(err: Error) -> SessionError {
        match err {
            Error::Session(e) => e,
            other => panic!("expected a session error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_remembers_matched_marker() {
        let (mut session, _) = session(vec![chunk("Info: welcome\r\n"), chunk("...\nrouter]")]);
        session.connect().await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);

        let data = session
            .wait_for(&["]", ">"], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(&data[..], b"Info: welcome\r\n...\nrouter]");
        assert_eq!(session.remembered_prompt(), Some(&b"]"[..]));
        assert_eq!(session.state(), SessionState::PromptKnown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_lowest_offset_wins() {
        let (mut session, _) = session(vec![chunk("[R1]<R1>")]);
        session.connect().await.unwrap();
        session
            .wait_for(&[">", "]"], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(session.remembered_prompt(), Some(&b"]"[..]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_timeout() {
        let (mut session, _) = session(vec![chunk("Password expires soon\r\n")]);
        session.connect().await.unwrap();

        let err = session
            .wait_for(&[">"], Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        match session_error(err) {
            SessionError::Timeout {
                target,
                phase,
                received,
                ..
            } => {
                assert_eq!(target, "r1");
                assert_eq!(phase, Phase::WaitFor);
                assert_eq!(received, 23);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Connected);
        assert!(session.remembered_prompt().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_rejects_empty_markers() {
        let (mut session, _) = session(vec![]);
        session.connect().await.unwrap();
        let empty: [&str; 0] = [];
        assert!(matches!(
            session_error(session.wait_for(&empty, Duration::from_secs(1)).await.unwrap_err()),
            SessionError::InvalidMarkers { .. }
        ));
        assert!(matches!(
            session_error(session.wait_for(&[""], Duration::from_secs(1)).await.unwrap_err()),
            SessionError::InvalidMarkers { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_dismisses_page_banner_once() {
        let (mut session, handle) = ready(vec![
            Step::AwaitWrite,
            chunk("display interface brief\r\nGE0/0/1  up  up\r\n  ---- More ----"),
            Step::AwaitWrite,
            chunk("  \x1b[16D                \x1b[16DGE0/0/2  down  down\r\n<R1>"),
        ])
        .await;

        let result = session.execute("display interface brief").await.unwrap();

        assert_eq!(handle.writes_as_strings(), vec!["display interface brief\n", " "]);
        assert_eq!(result.pages, 1);
        assert!(result.is_complete());
        assert_eq!(result.prompt.as_deref(), Some(">"));
        assert_eq!(result.sanitized, "GE0/0/1  up  up\nGE0/0/2  down  down");
        assert!(result.raw_str().contains("---- More ----"));
        assert_eq!(session.state(), SessionState::PromptKnown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_banner_split_across_reads() {
        let (mut session, handle) = ready(vec![
            Step::AwaitWrite,
            chunk("display arp\r\n10.0.0.1\r\n---- Mo"),
            chunk("re ----"),
            Step::AwaitWrite,
            chunk("10.0.0.2\r\n---- More ----"),
            Step::AwaitWrite,
            chunk("10.0.0.3\r\n<R1>"),
        ])
        .await;

        let result = session.execute("display arp").await.unwrap();

        assert_eq!(handle.writes_as_strings(), vec!["display arp\n", " ", " "]);
        assert_eq!(result.pages, 2);
        assert_eq!(result.sanitized, "10.0.0.1\n10.0.0.2\n10.0.0.3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_without_prompt_sends_nothing() {
        let (mut session, handle) = session(vec![chunk("<R1>")]);
        session.connect().await.unwrap();

        let err = session.execute("show x").await.unwrap_err();
        match session_error(err) {
            SessionError::PromptUnknown { target, command } => {
                assert_eq!(target, "r1");
                assert_eq!(command, "show x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(handle.writes().is_empty());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_with_explicit_terminator() {
        let (mut session, handle) = session(vec![
            Step::AwaitWrite,
            chunk("display clock\r\n2024-05-01 10:00:00\r\n<R1>"),
        ]);
        session.connect().await.unwrap();

        let options = ExecuteOptions::new().terminator(">");
        let result = session.execute_with("display clock", &options).await.unwrap();
        assert_eq!(result.sanitized, "2024-05-01 10:00:00");
        assert_eq!(handle.writes_as_strings(), vec!["display clock\n"]);
        assert!(session.remembered_prompt().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_timeout_keeps_partial_output() {
        let (mut session, handle) = ready(vec![
            Step::AwaitWrite,
            chunk("display logbuffer\r\nline1\r\n"),
        ])
        .await;

        let options = ExecuteOptions::new().timeout(Duration::from_secs(1));
        let err = session
            .execute_with("display logbuffer", &options)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        let partial = err.partial_result().unwrap();
        assert!(!partial.terminated_by_prompt);
        assert!(partial.prompt.is_none());
        assert_eq!(partial.sanitized, "line1");
        assert_eq!(session.state(), SessionState::PromptKnown);

        // The session stays usable.
        handle.push(Step::AwaitWrite);
        handle.push(chunk("display clock\r\n10:00\r\n<R1>"));
        let result = session.execute("display clock").await.unwrap();
        assert_eq!(result.sanitized, "10:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_closed_mid_execute() {
        let (mut session, _) = ready(vec![
            Step::AwaitWrite,
            chunk("display version\r\nHuawei"),
            Step::Close,
        ])
        .await;

        let err = session.execute("display version").await.unwrap_err();
        match session_error(err) {
            SessionError::Io { phase, source, .. } => {
                assert_eq!(phase, Phase::Execute);
                assert!(matches!(source, TransportError::Disconnected));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_alive());

        let err = session.execute("display version").await.unwrap_err();
        assert!(matches!(session_error(err), SessionError::Closed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let (mut session, handle) = ready(vec![]).await;
        assert!(session.is_alive());

        assert_ok!(session.close().await);
        assert_ok!(session.close().await);
        assert_eq!(handle.close_calls(), 1);
        assert_eq!(session.state(), SessionState::Closed);

        for err in [
            assert_err!(session.execute("display clock").await),
            assert_err!(session.send("display clock").await),
            assert_err!(session.connect().await),
        ] {
            assert!(matches!(session_error(err), SessionError::Closed { .. }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_before_connect() {
        let (mut session, handle) = session(vec![]);
        assert_ok!(session.close().await);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(handle.close_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure() {
        let mut session = Session::new(
            ScriptedConnector::unreachable(),
            Target::new("192.0.2.9", 22),
            ProfileRegistry::lookup("generic").unwrap(),
            TimeoutPolicy::default(),
        );
        let err = session.connect().await.unwrap_err();
        assert!(err.is_connect());
        assert!(err.to_string().contains("192.0.2.9"));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_twice() {
        let (mut session, _) = session(vec![]);
        session.connect().await.unwrap();
        assert!(matches!(
            session_error(session.connect().await.unwrap_err()),
            SessionError::AlreadyConnected { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_before_connect() {
        let (mut session, _) = session(vec![]);
        assert!(matches!(
            session_error(session.send("x").await.unwrap_err()),
            SessionError::NotConnected { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_appends_newline_once() {
        let (mut session, handle) = session(vec![]);
        session.connect().await.unwrap();
        session.send("display clock").await.unwrap();
        session.send("quit\n").await.unwrap();
        session.send_raw(b" ").await.unwrap();
        assert_eq!(handle.writes_as_strings(), vec!["display clock\n", "quit\n", " "]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_pattern_reported() {
        let (mut session, _) = ready(vec![
            Step::AwaitWrite,
            chunk("display foo\r\n              ^\r\nError: Unrecognized command found at '^' position.\r\n<R1>"),
        ])
        .await;

        let result = session.execute("display foo").await.unwrap();
        assert!(result.is_complete());
        assert!(!result.is_success());
        assert_eq!(
            result.failure_message.as_deref(),
            Some("Error: Unrecognized command")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_and_parse() {
        let template = Template::load(
            "Value CPU (\\d+)\n\nStart\n  ^CPU utilization for five seconds: ${CPU}% -> Record\n",
        )
        .unwrap();
        let (mut session, _) = ready(vec![
            Step::AwaitWrite,
            chunk("display cpu-usage\r\nCPU utilization for five seconds: 12%\r\n<R1>"),
        ])
        .await;

        let parsed = session
            .execute_and_parse("display cpu-usage", &template)
            .await
            .unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0]["cpu"], "12");
        assert!(parsed.stopped.is_none());
        assert!(parsed.result.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_configure_enters_and_leaves_system_view() {
        let (mut session, handle) = ready(vec![
            Step::AwaitWrite,
            chunk("system-view\r\nEnter system view, return user view with return command.\r\n[R1]"),
            Step::AwaitWrite,
            chunk("sysname CORE1\r\n[CORE1]"),
            Step::AwaitWrite,
            chunk("undo foo\r\nError: Unrecognized command found at '^' position.\r\n[CORE1]"),
            Step::AwaitWrite,
            chunk("return\r\n<CORE1>"),
        ])
        .await;

        let results = session.configure(&["sysname CORE1", "undo foo"]).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert_eq!(
            handle.writes_as_strings(),
            vec!["system-view\n", "sysname CORE1\n", "undo foo\n", "return\n"]
        );
        assert_eq!(session.remembered_prompt(), Some(&b">"[..]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configure_needs_config_mode() {
        let (mut session, handle) = session_with("linux", vec![chunk("user@host:~$ ")]);
        session.connect().await.unwrap();
        session.wait_for(&["$ "], Duration::from_secs(1)).await.unwrap();

        let err = session.configure(&["echo hi"]).await.unwrap_err();
        assert!(matches!(session_error(err), SessionError::NoConfigMode { .. }));
        assert!(handle.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_waits_for_profile_prompt() {
        let (mut session, _) = session(vec![chunk("Info: welcome\r\n<R1>")]);
        let greeting = session.open().await.unwrap();
        assert!(greeting.ends_with(b"<R1>"));
        assert_eq!(session.remembered_prompt(), Some(&b">"[..]));
    }
}
