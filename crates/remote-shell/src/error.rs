//! Error types for remote-shell.
//!
//! Connection failures, exec failures and configuration problems all surface
//! as [`SessionError`]. Constructor helpers keep call sites short and the
//! predicates let callers branch on the error class without matching every
//! variant.

use std::time::Duration;

use thiserror::Error;

/// Operations that can be bounded by a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// The authenticated handshake.
    Connect,
    /// A single command execution.
    Exec,
    /// Transport teardown.
    Close,
}

impl Operation {
    /// Get the operation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Exec => "exec",
            Self::Close => "close",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The main error type for remote-shell operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Required connection parameters are missing.
    #[error("configuration error: missing {}", missing.join(", "))]
    Configuration {
        /// Names of the missing fields.
        missing: Vec<&'static str>,
    },

    /// The transport reported an error during the handshake.
    #[error("handshake with {host}:{port} failed: {reason}")]
    Handshake {
        /// The host that was contacted.
        host: String,
        /// The port that was used.
        port: u16,
        /// The reason for the failure.
        reason: String,
    },

    /// A command channel could not be opened or broke mid-stream.
    #[error("transport error: {reason}")]
    Transport {
        /// The reason for the failure.
        reason: String,
    },

    /// A command was issued on a session that is not connected.
    #[error("session is not connected")]
    NotConnected,

    /// A configured deadline elapsed.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// The operation that was bounded.
        operation: Operation,
        /// The deadline that elapsed.
        duration: Duration,
    },

    /// Configuration file or environment could not be parsed.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for remote-shell operations.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Create a configuration error for the given missing fields.
    #[must_use]
    pub const fn configuration(missing: Vec<&'static str>) -> Self {
        Self::Configuration { missing }
    }

    /// Create a handshake error.
    pub fn handshake(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Handshake {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub const fn timeout(operation: Operation, duration: Duration) -> Self {
        Self::Timeout {
            operation,
            duration,
        }
    }

    /// Create a config parse error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error comes from the command channel layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::NotConnected)
    }

    /// Check if this error means the session could not be established.
    #[must_use]
    pub const fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::Handshake { .. }
                | Self::Timeout {
                    operation: Operation::Connect,
                    ..
                }
        )
    }
}
