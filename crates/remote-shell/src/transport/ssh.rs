//! SSH transport built on russh.
//!
//! This module provides:
//! - Password authentication over a TCP connection
//! - Host key verification against `known_hosts`
//! - Exec channels with separate stdout/stderr and exit status or signal

pub mod channel;
pub mod client;
pub mod host_key;

// Re-export commonly used types
pub use channel::SshCommandChannel;
pub use client::{SshClient, SshTransport};
pub use host_key::{
    ClientHandler, HostKeyPolicy, KnownHostStatus, check_known_hosts, default_known_hosts_path,
    known_hosts_name,
};
