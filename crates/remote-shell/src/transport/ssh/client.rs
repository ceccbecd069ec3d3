//! russh-backed transport client.

use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};

use super::channel::SshCommandChannel;
use super::host_key::{ClientHandler, HostKeyPolicy};
use crate::error::{Result, SessionError};
use crate::transport::{ConnectOptions, TransportClient, TransportFactory};

/// Factory for SSH transport clients.
///
/// Every [`create`](TransportFactory::create) call yields an unconnected
/// client sharing this factory's russh configuration and host key policy.
#[derive(Debug, Clone)]
pub struct SshTransport {
    config: Arc<client::Config>,
    host_key_policy: HostKeyPolicy,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SshTransport {
    /// Create a factory with default russh settings and `known_hosts`
    /// verification.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Arc::new(client::Config::default()),
            host_key_policy: HostKeyPolicy::default(),
        }
    }

    /// Set the host key verification policy.
    #[must_use]
    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    /// Send SSH keepalives at the given interval.
    ///
    /// Replaces any configuration set earlier with
    /// [`with_config`](Self::with_config) by russh defaults plus this
    /// interval; set `keepalive_interval` on a custom configuration instead.
    #[must_use]
    pub fn keepalive(mut self, interval: Duration) -> Self {
        self.config = Arc::new(client::Config {
            keepalive_interval: Some(interval),
            ..Default::default()
        });
        self
    }

    /// Use a custom russh client configuration.
    #[must_use]
    pub fn with_config(mut self, config: client::Config) -> Self {
        self.config = Arc::new(config);
        self
    }
}

impl TransportFactory for SshTransport {
    type Client = SshClient;

    fn create(&self) -> SshClient {
        SshClient {
            config: Arc::clone(&self.config),
            host_key_policy: self.host_key_policy.clone(),
            handle: None,
        }
    }
}

/// One SSH connection.
pub struct SshClient {
    config: Arc<client::Config>,
    host_key_policy: HostKeyPolicy,
    handle: Option<Handle<ClientHandler>>,
}

impl std::fmt::Debug for SshClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshClient")
            .field("host_key_policy", &self.host_key_policy)
            .field("connected", &self.handle.is_some())
            .finish()
    }
}

impl TransportClient for SshClient {
    type Channel = SshCommandChannel;

    async fn connect(&mut self, options: &ConnectOptions) -> Result<()> {
        let handler = ClientHandler::new(
            self.host_key_policy.clone(),
            options.host.clone(),
            options.port,
        );

        tracing::info!(
            host = %options.host,
            port = options.port,
            "Connecting to SSH server"
        );

        let mut handle = client::connect(
            Arc::clone(&self.config),
            (options.host.as_str(), options.port),
            handler,
        )
        .await
        .map_err(|e| SessionError::handshake(&options.host, options.port, e.to_string()))?;

        tracing::debug!(user = %options.username, "Attempting password authentication");
        let auth = handle
            .authenticate_password(options.username.clone(), options.password.clone())
            .await
            .map_err(|e| SessionError::handshake(&options.host, options.port, e.to_string()))?;

        if !auth.success() {
            tracing::debug!(user = %options.username, "Password authentication failed");
            return Err(SessionError::handshake(
                &options.host,
                options.port,
                format!("authentication failed for user '{}'", options.username),
            ));
        }

        tracing::info!(user = %options.username, "Password authentication successful");
        self.handle = Some(handle);
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<SshCommandChannel> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| SessionError::transport("SSH client is not connected"))?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SessionError::transport(format!("channel open failed: {e}")))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| SessionError::transport(format!("exec request failed: {e}")))?;

        tracing::debug!(command = %command, "Remote command started");
        Ok(SshCommandChannel::new(channel))
    }

    async fn end(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| SessionError::transport(format!("disconnect failed: {e}")))
    }
}
