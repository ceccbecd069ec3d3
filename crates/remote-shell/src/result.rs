//! Command output collection.
//!
//! A command channel produces tagged [`OutputChunk`]s followed by one
//! [`ExitInfo`]. [`OutputCollector`] folds them, in arrival order, into an
//! [`ExecutionResult`].

use bytes::Bytes;

/// Which remote stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// A piece of command output tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// Source stream.
    pub source: StreamSource,
    /// Raw bytes.
    pub data: Bytes,
}

impl OutputChunk {
    /// Create a stdout chunk.
    pub fn stdout(data: impl Into<Bytes>) -> Self {
        Self {
            source: StreamSource::Stdout,
            data: data.into(),
        }
    }

    /// Create a stderr chunk.
    pub fn stderr(data: impl Into<Bytes>) -> Self {
        Self {
            source: StreamSource::Stderr,
            data: data.into(),
        }
    }
}

/// How the remote process terminated.
///
/// Either field may be absent: a process killed by a signal reports no exit
/// code, and a normal exit reports no signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code.
    pub exit_code: Option<u32>,
    /// Signal name, without the `SIG` prefix.
    pub signal: Option<String>,
}

impl ExitInfo {
    /// Normal exit with a code.
    #[must_use]
    pub const fn code(exit_code: u32) -> Self {
        Self {
            exit_code: Some(exit_code),
            signal: None,
        }
    }

    /// Termination by signal.
    #[must_use]
    pub fn signal(signal: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            signal: Some(signal.into()),
        }
    }
}

/// The outcome of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code, absent when the process was killed by a signal.
    pub exit_code: Option<u32>,
    /// Terminating signal, if any.
    pub signal: Option<String>,
    /// Stdout and stderr interleaved in arrival order.
    pub data: Vec<u8>,
    /// The same output, still tagged by source.
    pub chunks: Vec<OutputChunk>,
}

impl ExecutionResult {
    /// Combined output as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Bytes that arrived on stdout only.
    #[must_use]
    pub fn stdout(&self) -> Vec<u8> {
        self.collect_source(StreamSource::Stdout)
    }

    /// Bytes that arrived on stderr only.
    #[must_use]
    pub fn stderr(&self) -> Vec<u8> {
        self.collect_source(StreamSource::Stderr)
    }

    /// Check if the command exited with code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && self.signal.is_none()
    }

    fn collect_source(&self, source: StreamSource) -> Vec<u8> {
        self.chunks
            .iter()
            .filter(|c| c.source == source)
            .flat_map(|c| c.data.iter().copied())
            .collect()
    }
}

/// Append-only accumulator for one command's output.
#[derive(Debug, Default)]
pub struct OutputCollector {
    data: Vec<u8>,
    chunks: Vec<OutputChunk>,
}

impl OutputCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    pub fn push(&mut self, chunk: OutputChunk) {
        self.data.extend_from_slice(&chunk.data);
        self.chunks.push(chunk);
    }

    /// Number of bytes collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Finish with the close event's exit information.
    #[must_use]
    pub fn finish(self, exit: ExitInfo) -> ExecutionResult {
        ExecutionResult {
            exit_code: exit.exit_code,
            signal: exit.signal,
            data: self.data,
            chunks: self.chunks,
        }
    }
}
