//! Leveled logging capability consumed by [`RemoteSession`].
//!
//! The session never logs through a global; it is handed an
//! `Arc<dyn Logger>` at construction. [`TracingLogger`] forwards to
//! `tracing`, and [`init_console_logging`] installs a console subscriber for
//! binaries and examples that want one.
//!
//! [`RemoteSession`]: crate::RemoteSession

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Log levels understood by [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Something unexpected that was recovered from.
    Warning,
    /// An operation failed.
    Error,
    /// The session could not be established.
    Critical,
}

impl Level {
    /// Get the level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget leveled writes.
///
/// Implementations must not panic and must not block the caller for long;
/// they are called from error paths.
pub trait Logger: Send + Sync {
    /// Write a message at the given level.
    fn log(&self, level: Level, message: &str);

    /// Write a debug message.
    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    /// Write an info message.
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Write a warning message.
    fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    /// Write an error message.
    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    /// Write a critical message.
    fn critical(&self, message: &str) {
        self.log(Level::Critical, message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Logger that forwards to `tracing`.
///
/// `tracing` has no critical level, so critical messages are emitted as
/// errors carrying `critical = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Create a new tracing logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Create a shared tracing logger.
    #[must_use]
    pub fn shared() -> Arc<dyn Logger> {
        Arc::new(Self)
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "remote_shell", "{message}"),
            Level::Info => tracing::info!(target: "remote_shell", "{message}"),
            Level::Warning => tracing::warn!(target: "remote_shell", "{message}"),
            Level::Error => tracing::error!(target: "remote_shell", "{message}"),
            Level::Critical => {
                tracing::error!(target: "remote_shell", critical = true, "{message}");
            }
        }
    }
}

/// Install a console `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; `default_filter` (for example
/// `"remote_shell=debug"`) applies when it is unset. Returns `false` if a
/// global subscriber was already installed.
pub fn init_console_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
