//! Transport abstraction for remote sessions.
//!
//! A [`TransportFactory`] creates fresh [`TransportClient`]s. A client is
//! connected once, opens one [`CommandChannel`] per executed command and is
//! finally ended. The SSH implementation lives in [`ssh`]; the `mock`
//! feature provides a scripted one for tests.

use std::future::Future;

use crate::error::Result;
use crate::result::{ExitInfo, OutputChunk};

#[cfg(feature = "ssh")]
pub mod ssh;

/// Parameters for the authenticated handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Host to connect to.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// An event read from a command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A chunk of stdout or stderr.
    Output(OutputChunk),
    /// The channel closed; always the last event.
    Closed(ExitInfo),
}

/// Creates unconnected transport clients.
pub trait TransportFactory: Send + Sync {
    /// The client type produced.
    type Client: TransportClient;

    /// Create a fresh, unconnected client.
    fn create(&self) -> Self::Client;
}

/// A connection to one remote host.
pub trait TransportClient: Send {
    /// The command channel type.
    type Channel: CommandChannel;

    /// Perform the handshake. `Ok` is "ready", `Err` is the transport's error.
    fn connect(&mut self, options: &ConnectOptions) -> impl Future<Output = Result<()>> + Send;

    /// Open a command channel running `command` verbatim.
    fn exec(&mut self, command: &str) -> impl Future<Output = Result<Self::Channel>> + Send;

    /// End the connection.
    fn end(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// A running remote command.
pub trait CommandChannel: Send {
    /// Wait for the next event; `None` once the channel is exhausted.
    fn next_event(&mut self) -> impl Future<Output = Option<ChannelEvent>> + Send;
}
