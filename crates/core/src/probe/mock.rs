//! [`HostProber`] that reports every host as reachable.

use async_trait::async_trait;

use super::{HostProber, ProbeError};
use crate::execution::RemoteTarget;

/// Always answers `true`. Paired with the mock runner for local development.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProber;

#[async_trait]
impl HostProber for MockProber {
    async fn probe(&self, target: &RemoteTarget) -> Result<bool, ProbeError> {
        tracing::trace!(server_id = target.server_id, "Mock probe");
        Ok(true)
    }
}
