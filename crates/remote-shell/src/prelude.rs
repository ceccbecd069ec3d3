//! Convenient re-exports for common remote-shell usage.
//!
//! # Example
//!
//! ```ignore
//! use remote_shell::prelude::*;
//!
//! let mut session = RemoteSession::ssh(SessionConfig::from_env()?);
//! session.connect().await?;
//! let result = session.raw_exec("uptime").await?;
//! ```

// Configuration
pub use crate::config::{SessionConfig, TimeoutConfig};

// Error handling
pub use crate::error::{Result, SessionError};

// Session types
pub use crate::result::ExecutionResult;
pub use crate::session::{RemoteSession, SessionState};

// Quoting
pub use crate::escape::{build_command, escape_arg};

// Logging
pub use crate::logger::{Level, Logger, TracingLogger};

// Transport
#[cfg(feature = "ssh")]
pub use crate::transport::ssh::{HostKeyPolicy, SshTransport};
pub use crate::transport::TransportFactory;
