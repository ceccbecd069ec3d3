//! Server host key verification.

use std::path::{Path, PathBuf};

use russh::client;
use russh::keys::PublicKey;

/// Host key verification policy.
///
/// The default checks the server key against the user's `known_hosts`
/// file. `AcceptAny` exists only with the `insecure-skip-verify` feature.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HostKeyPolicy {
    /// Accept every key without verification.
    ///
    /// **DANGEROUS:** allows man-in-the-middle attacks. Testing only.
    #[cfg(feature = "insecure-skip-verify")]
    AcceptAny,
    /// Check against a `known_hosts` file; `None` uses the default location.
    KnownHosts(Option<PathBuf>),
    /// Reject every key. Useful to prove a handshake fails closed.
    RejectAll,
}

impl HostKeyPolicy {
    /// Check against the default `known_hosts` location.
    #[must_use]
    pub const fn known_hosts() -> Self {
        Self::KnownHosts(None)
    }

    /// Check against a specific `known_hosts` file.
    #[must_use]
    pub fn known_hosts_file(path: impl Into<PathBuf>) -> Self {
        Self::KnownHosts(Some(path.into()))
    }
}

impl Default for HostKeyPolicy {
    fn default() -> Self {
        Self::known_hosts()
    }
}

/// Result of looking a host up in `known_hosts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownHostStatus {
    /// A stored key for the host equals the presented key.
    Match,
    /// The host is listed with a different key of the same type.
    Mismatch {
        /// Line of the conflicting entry, as reported by russh.
        line: usize,
    },
    /// The host is not listed, or the file does not exist.
    Unknown,
}

/// Name under which `known_hosts` records a host.
///
/// OpenSSH writes bare names for port 22 and `[host]:port` otherwise.
#[must_use]
pub fn known_hosts_name(host: &str, port: u16) -> String {
    if port == 22 {
        host.to_string()
    } else {
        format!("[{host}]:{port}")
    }
}

/// Look a presented key up in a `known_hosts` file.
///
/// Plain and hashed (`|1|salt|hmac`) host entries are both understood.
///
/// # Errors
///
/// Returns the russh error if the file exists but cannot be read or parsed.
pub fn check_known_hosts(
    host: &str,
    port: u16,
    key: &PublicKey,
    path: &Path,
) -> Result<KnownHostStatus, russh::keys::Error> {
    match russh::keys::check_known_hosts_path(host, port, key, path) {
        Ok(true) => Ok(KnownHostStatus::Match),
        Ok(false) => Ok(KnownHostStatus::Unknown),
        Err(russh::keys::Error::KeyChanged { line }) => Ok(KnownHostStatus::Mismatch { line }),
        Err(e) => Err(e),
    }
}

/// Default `known_hosts` path: `$SSH_KNOWN_HOSTS`, else `~/.ssh/known_hosts`.
#[must_use]
pub fn default_known_hosts_path() -> PathBuf {
    if let Ok(path) = std::env::var("SSH_KNOWN_HOSTS") {
        return PathBuf::from(path);
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".ssh").join("known_hosts")
}

/// russh client handler enforcing a [`HostKeyPolicy`].
#[derive(Debug)]
pub struct ClientHandler {
    policy: HostKeyPolicy,
    host: String,
    port: u16,
}

impl ClientHandler {
    /// Create a handler for one connection attempt.
    #[must_use]
    pub fn new(policy: HostKeyPolicy, host: impl Into<String>, port: u16) -> Self {
        Self {
            policy,
            host: host.into(),
            port,
        }
    }

    fn verify_known_hosts(&self, path: &Path, key: &PublicKey) -> bool {
        match check_known_hosts(&self.host, self.port, key, path) {
            Ok(KnownHostStatus::Match) => {
                tracing::debug!(host = %self.host, "Host key verified against known_hosts");
                true
            }
            Ok(KnownHostStatus::Mismatch { line }) => {
                tracing::error!(
                    host = %self.host,
                    port = self.port,
                    path = %path.display(),
                    line,
                    "HOST KEY MISMATCH! Possible man-in-the-middle attack!"
                );
                false
            }
            Ok(KnownHostStatus::Unknown) => {
                tracing::warn!(
                    host = %known_hosts_name(&self.host, self.port),
                    path = %path.display(),
                    "Host not found in known_hosts"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    host = %self.host,
                    path = %path.display(),
                    error = %e,
                    "Cannot check known_hosts, rejecting key"
                );
                false
            }
        }
    }
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.policy {
            #[cfg(feature = "insecure-skip-verify")]
            HostKeyPolicy::AcceptAny => {
                tracing::warn!(
                    host = %self.host,
                    "Accepting server key without verification (INSECURE)"
                );
                Ok(true)
            }
            HostKeyPolicy::KnownHosts(path) => {
                let path = path.clone().unwrap_or_else(default_known_hosts_path);
                Ok(self.verify_known_hosts(&path, server_public_key))
            }
            HostKeyPolicy::RejectAll => {
                tracing::debug!(host = %self.host, "Rejecting host key by policy");
                Ok(false)
            }
        }
    }
}
