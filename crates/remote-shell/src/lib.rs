//! remote-shell: run commands on a remote host over SSH
//!
//! This crate opens one authenticated connection to a host, runs commands on
//! it and reports each command's exit code, terminating signal and combined
//! output.
//!
//! # Features
//!
//! - **Async-first design** with Tokio runtime
//! - **Password-authenticated SSH** via `russh` (feature: `ssh`)
//! - **POSIX argument quoting** through [`build_command`]
//! - **Optional deadlines** for connect, exec and close
//! - **Scripted transport** for testing (feature: `mock`)
//!
//! # Example
//!
//! ```ignore
//! use remote_shell::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::from_env()?;
//!     let mut session = RemoteSession::ssh(config);
//!     session.connect().await?;
//!
//!     let result = session.execute("ls", Some(["-la", "/tmp"])).await?;
//!     print!("{}", result.text());
//!
//!     session.close().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod escape;
pub mod logger;
pub mod prelude;
pub mod result;
pub mod session;
pub mod transport;

/// Scripted transport for testing.
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{Credentials, DEFAULT_PORT, SessionConfig, TimeoutConfig};
pub use error::{Operation, Result, SessionError};
pub use escape::{build_command, escape_arg};
pub use logger::{Level, Logger, TracingLogger, init_console_logging};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockExec, MockLogger, MockOutcome, MockTransport};
pub use result::{ExecutionResult, ExitInfo, OutputChunk, OutputCollector, StreamSource};
pub use session::{RemoteSession, SessionState};
#[cfg(feature = "ssh")]
pub use transport::ssh::{HostKeyPolicy, SshTransport};
pub use transport::{ChannelEvent, CommandChannel, ConnectOptions, TransportClient, TransportFactory};
