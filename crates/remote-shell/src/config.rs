//! Configuration types for remote-shell.
//!
//! A [`SessionConfig`] carries the four connection parameters plus optional
//! per-operation deadlines. It can be built in code, parsed from TOML, or
//! overlaid from `REMOTE_SHELL_*` environment variables.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SessionError};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "REMOTE_SHELL";

/// Username and password for password authentication.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let password = if self.password.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &password)
            .finish()
    }
}

/// Optional deadlines for session operations.
///
/// `None` means wait indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Deadline for the authenticated handshake.
    pub connect: Option<Duration>,
    /// Deadline for a single command, from channel open to close.
    pub exec: Option<Duration>,
    /// Deadline for transport teardown.
    pub close: Option<Duration>,
}

impl TimeoutConfig {
    /// Create a configuration with no deadlines.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect: None,
            exec: None,
            close: None,
        }
    }

    /// Set the connect deadline.
    #[must_use]
    pub const fn connect(mut self, timeout: Duration) -> Self {
        self.connect = Some(timeout);
        self
    }

    /// Set the exec deadline.
    #[must_use]
    pub const fn exec(mut self, timeout: Duration) -> Self {
        self.exec = Some(timeout);
        self
    }

    /// Set the close deadline.
    #[must_use]
    pub const fn close(mut self, timeout: Duration) -> Self {
        self.close = Some(timeout);
        self
    }

    /// Apply the same deadline to every operation.
    #[must_use]
    pub const fn uniform(timeout: Duration) -> Self {
        Self {
            connect: Some(timeout),
            exec: Some(timeout),
            close: Some(timeout),
        }
    }
}

/// Connection parameters for one remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Host to connect to.
    pub host: String,
    /// Port; zero counts as missing.
    pub port: u16,
    /// Credentials.
    pub credentials: Credentials,
    /// Operation deadlines.
    pub timeouts: TimeoutConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            credentials: Credentials::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration from the four connection parameters.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: Credentials::new(username, password),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// Set the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.credentials.username = username.into();
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.credentials.password = password.into();
        self
    }

    /// Set the operation deadlines.
    #[must_use]
    pub const fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Get the `host:port` address string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Names of the connection parameters that are unset.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host.is_empty() {
            missing.push("host");
        }
        if self.port == 0 {
            missing.push("port");
        }
        if self.credentials.username.is_empty() {
            missing.push("username");
        }
        if self.credentials.password.is_empty() {
            missing.push("password");
        }
        missing
    }

    /// Check that all four connection parameters are set.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] naming every missing field.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SessionError::configuration(missing))
        }
    }

    /// Parse a configuration from TOML.
    ///
    /// ```toml
    /// host = "build-01.internal"
    /// port = 22
    /// username = "deploy"
    /// password = "hunter2"
    ///
    /// [timeouts]
    /// connect_secs = 10
    /// exec_secs = 300
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the document is not valid.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| SessionError::config(e.to_string()))?;
        Ok(file.into())
    }

    /// Load a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Build a configuration from `REMOTE_SHELL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Overlay `REMOTE_SHELL_*` environment variables onto this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if a numeric variable does not parse.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(format!("{ENV_PREFIX}_{name}")).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_var("PORT", &port)?;
        }
        if let Some(username) = lookup("USERNAME") {
            self.credentials.username = username;
        }
        if let Some(password) = lookup("PASSWORD") {
            self.credentials.password = password;
        }
        if let Some(secs) = lookup("CONNECT_TIMEOUT_SECS") {
            self.timeouts.connect = Some(Duration::from_secs(parse_var(
                "CONNECT_TIMEOUT_SECS",
                &secs,
            )?));
        }
        if let Some(secs) = lookup("EXEC_TIMEOUT_SECS") {
            self.timeouts.exec = Some(Duration::from_secs(parse_var("EXEC_TIMEOUT_SECS", &secs)?));
        }
        if let Some(secs) = lookup("CLOSE_TIMEOUT_SECS") {
            self.timeouts.close = Some(Duration::from_secs(parse_var(
                "CLOSE_TIMEOUT_SECS",
                &secs,
            )?));
        }
        Ok(self)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        SessionError::config(format!("{ENV_PREFIX}_{name} has invalid value '{value}'"))
    })
}

/// On-disk layout of a configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    timeouts: TimeoutsFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeoutsFile {
    connect_secs: Option<u64>,
    exec_secs: Option<u64>,
    close_secs: Option<u64>,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl From<ConfigFile> for SessionConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            host: file.host,
            port: file.port,
            credentials: Credentials::new(file.username, file.password),
            timeouts: TimeoutConfig {
                connect: file.timeouts.connect_secs.map(Duration::from_secs),
                exec: file.timeouts.exec_secs.map(Duration::from_secs),
                close: file.timeouts.close_secs.map(Duration::from_secs),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn complete_config_validates() {
        let config = SessionConfig::new("example.com", 22, "admin", "secret");
        assert!(config.validate().is_ok());
        assert_eq!(config.address(), "example.com:22");
    }

    #[test]
    fn every_missing_field_is_reported() {
        let config = SessionConfig::new("", 0, "", "");
        assert_eq!(
            config.missing_fields(),
            vec!["host", "port", "username", "password"]
        );
        assert!(matches!(
            config.validate(),
            Err(SessionError::Configuration { .. })
        ));
    }

    #[test]
    fn builder_sets_fields() {
        let config = SessionConfig::default()
            .host("db-2")
            .port(2200)
            .username("ops")
            .password("pw")
            .timeouts(TimeoutConfig::new().exec(Duration::from_secs(5)));

        assert_eq!(config.host, "db-2");
        assert_eq!(config.port, 2200);
        assert_eq!(config.credentials.username, "ops");
        assert_eq!(config.timeouts.exec, Some(Duration::from_secs(5)));
        assert_eq!(config.timeouts.connect, None);
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let config = SessionConfig::new("h", 22, "u", "topsecret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn parses_toml() {
        let config = SessionConfig::from_toml_str(
            r#"
            host = "build-01"
            username = "deploy"
            password = "pw"

            [timeouts]
            connect_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "build-01");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.credentials, Credentials::new("deploy", "pw"));
        assert_eq!(config.timeouts.connect, Some(Duration::from_secs(10)));
        assert_eq!(config.timeouts.exec, None);
    }

    #[test]
    fn rejects_bad_toml() {
        let err = SessionConfig::from_toml_str("port = \"twenty-two\"").unwrap_err();
        assert!(matches!(err, SessionError::Config { .. }));
    }

    #[test]
    fn overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("HOST", "override.example"),
            ("PORT", "2022"),
            ("EXEC_TIMEOUT_SECS", "7"),
        ]
        .into_iter()
        .collect();

        let config = SessionConfig::new("orig", 22, "u", "p")
            .with_overrides(|name| vars.get(name).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.host, "override.example");
        assert_eq!(config.port, 2022);
        assert_eq!(config.credentials.username, "u");
        assert_eq!(config.timeouts.exec, Some(Duration::from_secs(7)));
    }

    #[test]
    fn bad_override_is_an_error() {
        let err = SessionConfig::default()
            .with_overrides(|name| (name == "PORT").then(|| "ssh".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("REMOTE_SHELL_PORT"));
    }
}
