//! Host reachability capability.
//!
//! [`HostProber`] answers "can this host be reached right now?". The caller
//! bounds every probe with its own deadline and treats errors as unreachable.

pub mod mock;
pub mod tcp;

use async_trait::async_trait;

use crate::execution::RemoteTarget;

/// Errors a probe can report instead of a plain yes/no.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The address could not be resolved.
    #[error("Could not resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure while probing.
    #[error("Probe I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Checks whether a host is reachable.
///
/// Implementations must release any sockets when the returned future is
/// dropped, since timeouts are enforced by dropping it.
#[async_trait]
pub trait HostProber: Send + Sync {
    /// `Ok(true)` if reachable, `Ok(false)` if definitely not.
    async fn probe(&self, target: &RemoteTarget) -> Result<bool, ProbeError>;
}
