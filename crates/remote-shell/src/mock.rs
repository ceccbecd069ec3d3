//! Scripted transport and recording logger for tests.
//!
//! [`MockTransport`] stands in for SSH: each handshake, exec and teardown
//! follows a queued script, and every call is recorded for assertions.
//! [`MockLogger`] captures what the session logs.
//!
//! # Example
//!
//! ```rust
//! use remote_shell::mock::{MockExec, MockLogger, MockTransport};
//! use remote_shell::{RemoteSession, SessionConfig};
//!
//! # tokio_test_block_on(async {
//! let transport = MockTransport::new();
//! transport.queue_exec(MockExec::new().stdout("hello\n").exit(0));
//!
//! let config = SessionConfig::new("host", 22, "user", "pass");
//! let mut session = RemoteSession::new(config, transport.clone(), MockLogger::shared());
//! session.connect().await.unwrap();
//!
//! let result = session.raw_exec("echo hello").await.unwrap();
//! assert_eq!(result.text(), "hello\n");
//! assert_eq!(transport.commands(), vec!["echo hello"]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, SessionError};
use crate::logger::{Level, Logger};
use crate::result::{ExitInfo, OutputChunk};
use crate::transport::{
    ChannelEvent, CommandChannel, ConnectOptions, TransportClient, TransportFactory,
};

/// How a scripted handshake or teardown behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Succeed.
    Ok,
    /// Fail with the given reason.
    Fail(String),
    /// Never settle.
    Hang,
}

/// Script for one command execution.
#[derive(Debug, Clone)]
pub struct MockExec {
    open_error: Option<String>,
    events: Vec<ChannelEvent>,
    close: Option<ExitInfo>,
    hang: bool,
}

impl MockExec {
    /// A command that produces no output and closes with exit code 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            open_error: None,
            events: Vec::new(),
            close: Some(ExitInfo::code(0)),
            hang: false,
        }
    }

    /// A command whose channel fails to open.
    #[must_use]
    pub fn open_error(reason: impl Into<String>) -> Self {
        Self {
            open_error: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Emit a stdout chunk.
    #[must_use]
    pub fn stdout(mut self, data: impl AsRef<[u8]>) -> Self {
        self.events.push(ChannelEvent::Output(OutputChunk::stdout(
            data.as_ref().to_vec(),
        )));
        self
    }

    /// Emit a stderr chunk.
    #[must_use]
    pub fn stderr(mut self, data: impl AsRef<[u8]>) -> Self {
        self.events.push(ChannelEvent::Output(OutputChunk::stderr(
            data.as_ref().to_vec(),
        )));
        self
    }

    /// Close with an exit code.
    #[must_use]
    pub fn exit(self, code: u32) -> Self {
        self.close_with(ExitInfo::code(code))
    }

    /// Close with a terminating signal and no exit code.
    #[must_use]
    pub fn signal(self, name: impl Into<String>) -> Self {
        self.close_with(ExitInfo::signal(name))
    }

    /// Close with arbitrary exit information.
    #[must_use]
    pub fn close_with(mut self, exit: ExitInfo) -> Self {
        self.close = Some(exit);
        self
    }

    /// End the event stream without a close event.
    #[must_use]
    pub fn without_close(mut self) -> Self {
        self.close = None;
        self
    }

    /// Never close after the scripted output.
    #[must_use]
    pub fn hang(mut self) -> Self {
        self.close = None;
        self.hang = true;
        self
    }
}

impl Default for MockExec {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct MockState {
    handshakes: VecDeque<MockOutcome>,
    teardowns: VecDeque<MockOutcome>,
    execs: VecDeque<MockExec>,
    clients_created: usize,
    connect_attempts: Vec<ConnectOptions>,
    commands: Vec<String>,
    ends: usize,
}

/// Scripted transport factory.
///
/// Clones share state, so keep one clone for assertions after handing the
/// other to a session. Unscripted handshakes and teardowns succeed;
/// unscripted commands close with exit code 0 and no output.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script the next handshake.
    pub fn queue_handshake(&self, outcome: MockOutcome) {
        self.lock().handshakes.push_back(outcome);
    }

    /// Script the next teardown.
    pub fn queue_teardown(&self, outcome: MockOutcome) {
        self.lock().teardowns.push_back(outcome);
    }

    /// Script the next command execution.
    pub fn queue_exec(&self, exec: MockExec) {
        self.lock().execs.push_back(exec);
    }

    /// Number of clients the factory has created.
    #[must_use]
    pub fn clients_created(&self) -> usize {
        self.lock().clients_created
    }

    /// Options passed to every handshake, in order.
    #[must_use]
    pub fn connect_attempts(&self) -> Vec<ConnectOptions> {
        self.lock().connect_attempts.clone()
    }

    /// Command lines received by exec, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Number of teardown requests.
    #[must_use]
    pub fn ends(&self) -> usize {
        self.lock().ends
    }
}

impl TransportFactory for MockTransport {
    type Client = MockClient;

    fn create(&self) -> MockClient {
        self.lock().clients_created += 1;
        MockClient {
            transport: self.clone(),
            connected: false,
        }
    }
}

/// Client produced by [`MockTransport`].
#[derive(Debug)]
pub struct MockClient {
    transport: MockTransport,
    connected: bool,
}

async fn settle(outcome: MockOutcome, fail: impl FnOnce(String) -> SessionError) -> Result<()> {
    match outcome {
        MockOutcome::Ok => Ok(()),
        MockOutcome::Fail(reason) => Err(fail(reason)),
        MockOutcome::Hang => std::future::pending().await,
    }
}

impl TransportClient for MockClient {
    type Channel = MockChannel;

    async fn connect(&mut self, options: &ConnectOptions) -> Result<()> {
        let outcome = {
            let mut state = self.transport.lock();
            state.connect_attempts.push(options.clone());
            state.handshakes.pop_front().unwrap_or(MockOutcome::Ok)
        };

        settle(outcome, |reason| {
            SessionError::handshake(&options.host, options.port, reason)
        })
        .await?;
        self.connected = true;
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<MockChannel> {
        if !self.connected {
            return Err(SessionError::transport("mock client is not connected"));
        }

        let script = {
            let mut state = self.transport.lock();
            state.commands.push(command.to_string());
            state.execs.pop_front().unwrap_or_else(MockExec::new)
        };

        if let Some(reason) = script.open_error {
            return Err(SessionError::transport(reason));
        }

        let mut events: VecDeque<ChannelEvent> = script.events.into();
        if let Some(exit) = script.close {
            events.push_back(ChannelEvent::Closed(exit));
        }

        Ok(MockChannel {
            events,
            hang: script.hang,
        })
    }

    async fn end(&mut self) -> Result<()> {
        let outcome = {
            let mut state = self.transport.lock();
            state.ends += 1;
            state.teardowns.pop_front().unwrap_or(MockOutcome::Ok)
        };

        settle(outcome, SessionError::transport).await?;
        self.connected = false;
        Ok(())
    }
}

/// Channel produced by [`MockClient`].
#[derive(Debug)]
pub struct MockChannel {
    events: VecDeque<ChannelEvent>,
    hang: bool,
}

impl CommandChannel for MockChannel {
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        None
    }
}

/// Logger that records every entry.
#[derive(Debug, Default)]
pub struct MockLogger {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MockLogger {
    /// Create a recording logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared recording logger.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// All entries, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages logged at `level`.
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Check if any message at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages(level).iter().any(|m| m.contains(needle))
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Level, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}
