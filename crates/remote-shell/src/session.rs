//! Remote session lifecycle and command execution.
//!
//! A [`RemoteSession`] owns at most one connected transport client. It is
//! driven through `&mut self`, so one session runs one handshake or one
//! command at a time.
//!
//! # Example
//!
//! ```ignore
//! use remote_shell::prelude::*;
//!
//! let config = SessionConfig::new("build-01", 22, "deploy", "hunter2");
//! let mut session = RemoteSession::ssh(config);
//! session.connect().await?;
//!
//! let result = session.execute("ls", Some(["-la", "/var/log/app dir"])).await?;
//! println!("{} (exit {:?})", result.text(), result.exit_code);
//!
//! session.close().await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::error::{Operation, Result, SessionError};
use crate::escape::build_command;
use crate::logger::{Logger, TracingLogger};
use crate::result::{ExecutionResult, OutputCollector};
use crate::transport::{
    ChannelEvent, CommandChannel, ConnectOptions, TransportClient, TransportFactory,
};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport handle.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Authenticated and ready for commands.
    Connected,
    /// Teardown in progress.
    Closing,
}

/// A remote shell session over one transport connection.
pub struct RemoteSession<T: TransportFactory> {
    config: SessionConfig,
    transport: T,
    logger: Arc<dyn Logger>,
    state: SessionState,
    client: Option<T::Client>,
}

impl<T: TransportFactory> std::fmt::Debug for RemoteSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

#[cfg(feature = "ssh")]
impl RemoteSession<crate::transport::ssh::SshTransport> {
    /// Create an SSH session that logs through `tracing`.
    #[must_use]
    pub fn ssh(config: SessionConfig) -> Self {
        Self::new(
            config,
            crate::transport::ssh::SshTransport::new(),
            TracingLogger::shared(),
        )
    }
}

impl<T: TransportFactory> RemoteSession<T> {
    /// Create a disconnected session.
    pub fn new(config: SessionConfig, transport: T, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            transport,
            logger,
            state: SessionState::Disconnected,
            client: None,
        }
    }

    /// Create a disconnected session that logs through `tracing`.
    pub fn with_tracing(config: SessionConfig, transport: T) -> Self {
        Self::new(config, transport, TracingLogger::shared())
    }

    /// Get configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Target host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Target port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.config.port
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the session holds an authenticated transport.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected && self.client.is_some()
    }

    fn address(&self) -> String {
        self.config.address()
    }

    /// Validate parameters, perform the handshake and keep the transport.
    ///
    /// Failures are logged at critical level and leave the session
    /// disconnected. Connecting an already connected session is a no-op.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Configuration`] if host, port, username or password
    ///   is unset
    /// - [`SessionError::Handshake`] if the transport rejects the handshake
    /// - [`SessionError::Timeout`] if the connect deadline elapses
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        match self.establish().await {
            Ok(client) => {
                self.client = Some(client);
                self.state = SessionState::Connected;
                self.logger.debug(&format!("connected to {}", self.address()));
                Ok(())
            }
            Err(e) => {
                self.client = None;
                self.state = SessionState::Disconnected;
                self.logger
                    .critical(&format!("failed to connect to {}: {e}", self.address()));
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<T::Client> {
        self.config.validate()?;
        let _connecting = Transition::begin(&mut self.state, SessionState::Connecting);
        Self::handshake(&self.transport, &self.config).await
    }

    /// Perform a handshake without keeping the connection.
    ///
    /// Returns `true` once the transport reports ready. The check connection
    /// is ended straight away; the session's own state is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if a parameter is unset, the
    /// handshake error, or [`SessionError::Timeout`].
    pub async fn test(&self) -> Result<bool> {
        self.config.validate()?;
        let mut client = Self::handshake(&self.transport, &self.config).await?;
        if let Err(e) = client.end().await {
            self.logger.warning(&format!(
                "check connection to {} did not end cleanly: {e}",
                self.address()
            ));
        }
        Ok(true)
    }

    async fn handshake(transport: &T, config: &SessionConfig) -> Result<T::Client> {
        let mut client = transport.create();
        let options = connect_options(config);
        with_deadline(
            Operation::Connect,
            config.timeouts.connect,
            client.connect(&options),
        )
        .await?;
        Ok(client)
    }

    /// Run a command line verbatim and collect its output.
    ///
    /// Stdout and stderr are appended to one buffer in arrival order; the
    /// result is produced when the channel closes.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotConnected`] if the session is not connected
    /// - [`SessionError::Transport`] if the channel cannot be opened or ends
    ///   without a close event
    /// - [`SessionError::Timeout`] if the exec deadline elapses
    pub async fn raw_exec(&mut self, command: &str) -> Result<ExecutionResult> {
        if self.state != SessionState::Connected {
            return Err(SessionError::NotConnected);
        }
        let client = self.client.as_mut().ok_or(SessionError::NotConnected)?;

        tracing::debug!(command = %command, "Executing remote command");
        let result = with_deadline(Operation::Exec, self.config.timeouts.exec, async {
            let mut channel = client.exec(command).await?;
            collect_output(&mut channel).await
        })
        .await;

        match &result {
            Ok(output) => tracing::debug!(
                exit_code = ?output.exit_code,
                signal = ?output.signal,
                bytes = output.data.len(),
                "Remote command finished"
            ),
            Err(e) => self
                .logger
                .error(&format!("command on {} failed: {e}", self.address())),
        }
        result
    }

    /// Run `command` with each argument shell-quoted.
    ///
    /// See [`build_command`] for the exact spacing rules.
    ///
    /// # Errors
    ///
    /// Same as [`raw_exec`](Self::raw_exec).
    pub async fn execute<I>(&mut self, command: &str, args: Option<I>) -> Result<ExecutionResult>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let line = build_command(command, args);
        self.raw_exec(&line).await
    }

    /// End the transport and release it.
    ///
    /// The session is disconnected afterwards even if teardown fails or
    /// times out. Closing a disconnected session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the transport's teardown error or [`SessionError::Timeout`].
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut client) = self.client.take() else {
            self.state = SessionState::Disconnected;
            return Ok(());
        };

        let result = {
            let _closing = Transition::begin(&mut self.state, SessionState::Closing);
            with_deadline(Operation::Close, self.config.timeouts.close, client.end()).await
        };

        match &result {
            Ok(()) => self
                .logger
                .debug(&format!("connection to {} closed", self.address())),
            Err(e) => self.logger.warning(&format!(
                "connection to {} did not close cleanly: {e}",
                self.address()
            )),
        }
        result
    }
}

/// A transitional state held for the duration of one operation.
///
/// Dropping it, on completion or when the operation's future is dropped,
/// leaves the session `Disconnected`; a successful connect then marks it
/// `Connected` explicitly.
struct Transition<'a> {
    state: &'a mut SessionState,
}

impl<'a> Transition<'a> {
    fn begin(state: &'a mut SessionState, during: SessionState) -> Self {
        *state = during;
        Self { state }
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        *self.state = SessionState::Disconnected;
    }
}

fn connect_options(config: &SessionConfig) -> ConnectOptions {
    ConnectOptions {
        host: config.host.clone(),
        port: config.port,
        username: config.credentials.username.clone(),
        password: config.credentials.password.clone(),
    }
}

/// Drain a channel into one result, settling on its close event.
async fn collect_output<C: CommandChannel>(channel: &mut C) -> Result<ExecutionResult> {
    let mut collector = OutputCollector::new();
    loop {
        match channel.next_event().await {
            Some(ChannelEvent::Output(chunk)) => collector.push(chunk),
            Some(ChannelEvent::Closed(exit)) => return Ok(collector.finish(exit)),
            None => {
                return Err(SessionError::transport(format!(
                    "channel ended without close after {} bytes",
                    collector.len()
                )));
            }
        }
    }
}

/// Await `future`, bounded by `deadline` when one is set.
async fn with_deadline<F, V>(
    operation: Operation,
    deadline: Option<Duration>,
    future: F,
) -> Result<V>
where
    F: Future<Output = Result<V>>,
{
    match deadline {
        Some(duration) => tokio::time::timeout(duration, future)
            .await
            .map_err(|_| SessionError::timeout(operation, duration))?,
        None => future.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeoutConfig;
    use crate::logger::Level;
    use crate::mock::{MockExec, MockLogger, MockOutcome, MockTransport};

    fn config() -> SessionConfig {
        SessionConfig::new("box", 2222, "ops", "secret")
    }

    fn session_with(
        config: SessionConfig,
    ) -> (RemoteSession<MockTransport>, MockTransport, Arc<MockLogger>) {
        let transport = MockTransport::new();
        let logger = MockLogger::shared();
        let session = RemoteSession::new(config, transport.clone(), logger.clone());
        (session, transport, logger)
    }

    async fn connected() -> (RemoteSession<MockTransport>, MockTransport, Arc<MockLogger>) {
        let (mut session, transport, logger) = session_with(config());
        session.connect().await.unwrap();
        (session, transport, logger)
    }

    #[tokio::test]
    async fn connect_passes_parameters_and_becomes_connected() {
        let (mut session, transport, logger) = session_with(config());
        assert_eq!(session.state(), SessionState::Disconnected);

        session.connect().await.unwrap();

        assert!(session.is_connected());
        assert_eq!(session.state(), SessionState::Connected);
        let attempts = transport.connect_attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].host, "box");
        assert_eq!(attempts[0].port, 2222);
        assert_eq!(attempts[0].username, "ops");
        assert_eq!(attempts[0].password, "secret");
        assert!(logger.contains(Level::Debug, "connected to box:2222"));
    }

    #[tokio::test]
    async fn connect_twice_reuses_the_connection() {
        let (mut session, transport, _) = connected().await;
        session.connect().await.unwrap();
        assert_eq!(transport.clients_created(), 1);
    }

    #[tokio::test]
    async fn missing_parameters_fail_without_a_handshake() {
        let (mut session, transport, logger) = session_with(config().host("").password(""));

        let err = session.connect().await.unwrap_err();

        match &err {
            SessionError::Configuration { missing } => {
                assert_eq!(missing, &vec!["host", "password"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.clients_created(), 0);
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(logger.messages(Level::Critical).len(), 1);
        assert!(logger.contains(Level::Critical, "missing host, password"));
    }

    #[tokio::test]
    async fn zero_port_counts_as_missing() {
        let (mut session, _, _) = session_with(config().port(0));
        let err = session.connect().await.unwrap_err();
        assert!(err.to_string().contains("missing port"));
    }

    #[tokio::test]
    async fn handshake_failure_is_logged_critical() {
        let (mut session, transport, logger) = session_with(config());
        transport.queue_handshake(MockOutcome::Fail("auth rejected".into()));

        let err = session.connect().await.unwrap_err();

        assert!(err.is_connect_failure());
        assert!(!session.is_connected());
        assert!(logger.contains(Level::Critical, "auth rejected"));
    }

    #[tokio::test]
    async fn connect_can_be_retried_after_failure() {
        let (mut session, transport, _) = session_with(config());
        transport.queue_handshake(MockOutcome::Fail("refused".into()));

        assert!(session.connect().await.is_err());
        session.connect().await.unwrap();

        assert!(session.is_connected());
        assert_eq!(transport.clients_created(), 2);
    }

    #[tokio::test]
    async fn connect_deadline_elapses() {
        let (mut session, transport, logger) = session_with(
            config().timeouts(TimeoutConfig::new().connect(Duration::from_millis(20))),
        );
        transport.queue_handshake(MockOutcome::Hang);

        let err = session.connect().await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::Timeout {
                operation: Operation::Connect,
                ..
            }
        ));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(logger.contains(Level::Critical, "connect timed out"));
    }

    #[tokio::test]
    async fn test_does_not_change_state() {
        let (session, transport, _) = session_with(config());

        assert!(session.test().await.unwrap());

        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(transport.clients_created(), 1);
        assert_eq!(transport.ends(), 1);
    }

    #[tokio::test]
    async fn test_validates_parameters_first() {
        let (session, transport, _) = session_with(config().host("").port(0));

        let err = session.test().await.unwrap_err();

        match err {
            SessionError::Configuration { missing } => assert_eq!(missing, vec!["host", "port"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.clients_created(), 0);
    }

    #[tokio::test]
    async fn abandoned_connect_resets_state() {
        let (mut session, transport, _) = session_with(config());
        transport.queue_handshake(MockOutcome::Hang);

        let outer = tokio::time::timeout(Duration::from_millis(20), session.connect()).await;

        assert!(outer.is_err());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_connected());
        session.connect().await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn abandoned_close_resets_state() {
        let (mut session, transport, _) = connected().await;
        transport.queue_teardown(MockOutcome::Hang);

        let outer = tokio::time::timeout(Duration::from_millis(20), session.close()).await;

        assert!(outer.is_err());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(
            session.raw_exec("ls").await.unwrap_err(),
            SessionError::NotConnected
        ));
    }

    #[tokio::test]
    async fn test_reports_handshake_error() {
        let (session, transport, _) = session_with(config());
        transport.queue_handshake(MockOutcome::Fail("no route".into()));

        let err = session.test().await.unwrap_err();

        assert!(err.to_string().contains("no route"));
        assert_eq!(transport.ends(), 0);
    }

    #[tokio::test]
    async fn test_tolerates_unclean_end() {
        let (session, transport, logger) = session_with(config());
        transport.queue_teardown(MockOutcome::Fail("reset".into()));

        assert!(session.test().await.unwrap());
        assert!(logger.contains(Level::Warning, "reset"));
    }

    #[tokio::test]
    async fn raw_exec_requires_connection() {
        let (mut session, transport, _) = session_with(config());
        let err = session.raw_exec("ls").await.unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
        assert!(transport.commands().is_empty());
    }

    #[tokio::test]
    async fn raw_exec_collects_interleaved_output() {
        let (mut session, transport, _) = connected().await;
        transport.queue_exec(
            MockExec::new()
                .stdout("one ")
                .stderr("two ")
                .stdout("three")
                .exit(3),
        );

        let result = session.raw_exec("do-things").await.unwrap();

        assert_eq!(transport.commands(), vec!["do-things"]);
        assert_eq!(result.data, b"one two three");
        assert_eq!(result.stdout(), b"one three");
        assert_eq!(result.stderr(), b"two ");
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.signal, None);
    }

    #[tokio::test]
    async fn raw_exec_reports_signal() {
        let (mut session, transport, _) = connected().await;
        transport.queue_exec(MockExec::new().stdout("partial").signal("KILL"));

        let result = session.raw_exec("sleep 100").await.unwrap();

        assert_eq!(result.exit_code, None);
        assert_eq!(result.signal.as_deref(), Some("KILL"));
        assert_eq!(result.text(), "partial");
    }

    #[tokio::test]
    async fn raw_exec_with_no_output() {
        let (mut session, _, _) = connected().await;
        let result = session.raw_exec("true").await.unwrap();
        assert!(result.data.is_empty());
        assert!(result.success());
    }

    #[tokio::test]
    async fn open_failure_is_logged_and_session_stays_usable() {
        let (mut session, transport, logger) = connected().await;
        transport.queue_exec(MockExec::open_error("channel refused"));

        let err = session.raw_exec("ls").await.unwrap_err();

        assert!(err.is_transport());
        assert!(logger.contains(Level::Error, "channel refused"));
        assert!(session.is_connected());
        assert!(session.raw_exec("ls").await.unwrap().success());
    }

    #[tokio::test]
    async fn channel_ending_without_close_is_an_error() {
        let (mut session, transport, _) = connected().await;
        transport.queue_exec(MockExec::new().stdout("abc").without_close());

        let err = session.raw_exec("ls").await.unwrap_err();

        assert!(err.to_string().contains("after 3 bytes"));
    }

    #[tokio::test]
    async fn exec_deadline_elapses() {
        let (mut session, transport, logger) = session_with(
            config().timeouts(TimeoutConfig::new().exec(Duration::from_millis(20))),
        );
        session.connect().await.unwrap();
        transport.queue_exec(MockExec::new().stdout("tick").hang());

        let err = session.raw_exec("tail -f log").await.unwrap_err();

        assert!(err.is_timeout());
        assert!(logger.contains(Level::Error, "exec timed out"));
    }

    #[tokio::test]
    async fn execute_builds_quoted_command_lines() {
        let (mut session, transport, _) = connected().await;

        session.execute("ls", None::<&[&str]>).await.unwrap();
        session.execute("ls", Some(Vec::<String>::new())).await.unwrap();
        session.execute("ls", Some(["a b", "it's"])).await.unwrap();

        assert_eq!(
            transport.commands(),
            vec!["ls", "ls ", r"ls 'a b' 'it'\''s'"]
        );
    }

    #[tokio::test]
    async fn commands_run_in_call_order() {
        let (mut session, transport, _) = connected().await;
        transport.queue_exec(MockExec::new().stdout("1").exit(0));
        transport.queue_exec(MockExec::new().stdout("2").exit(1));

        let first = session.raw_exec("first").await.unwrap();
        let second = session.raw_exec("second").await.unwrap();

        assert_eq!(first.text(), "1");
        assert_eq!(second.text(), "2");
        assert_eq!(second.exit_code, Some(1));
        assert_eq!(transport.commands(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn close_releases_the_transport() {
        let (mut session, transport, logger) = connected().await;

        session.close().await.unwrap();

        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(transport.ends(), 1);
        assert!(logger.contains(Level::Debug, "closed"));
        assert!(matches!(
            session.raw_exec("ls").await.unwrap_err(),
            SessionError::NotConnected
        ));
    }

    #[tokio::test]
    async fn close_when_disconnected_is_a_no_op() {
        let (mut session, transport, _) = session_with(config());
        session.close().await.unwrap();
        assert_eq!(transport.ends(), 0);
    }

    #[tokio::test]
    async fn failed_close_still_disconnects() {
        let (mut session, transport, logger) = connected().await;
        transport.queue_teardown(MockOutcome::Fail("broken pipe".into()));

        assert!(session.close().await.is_err());

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(logger.contains(Level::Warning, "broken pipe"));
        session.close().await.unwrap();
        assert_eq!(transport.ends(), 1);
    }

    #[tokio::test]
    async fn close_deadline_elapses() {
        let (mut session, transport, _) = session_with(
            config().timeouts(TimeoutConfig::new().close(Duration::from_millis(20))),
        );
        session.connect().await.unwrap();
        transport.queue_teardown(MockOutcome::Hang);

        let err = session.close().await.unwrap_err();

        assert!(err.is_timeout());
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn reconnect_after_close() {
        let (mut session, transport, _) = connected().await;
        session.close().await.unwrap();
        session.connect().await.unwrap();
        assert!(session.is_connected());
        assert_eq!(transport.clients_created(), 2);
    }

    #[test]
    fn debug_hides_client_internals() {
        let (session, _, _) = session_with(config());
        let debug = format!("{session:?}");
        assert!(debug.contains("has_client: false"));
        assert!(!debug.contains("secret"));
    }
}
