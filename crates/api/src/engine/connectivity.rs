//! Connectivity aggregator: concurrent reachability probes.
//!
//! Each probe is bounded by its own timeout. A probe that errors or times
//! out counts as unreachable, so a group ping always returns an entry for
//! every member and never fails as a whole once the group is found.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_core::error::CoreError;
use fleet_core::execution::RemoteTarget;
use fleet_core::probe::HostProber;
use fleet_core::types::DbId;
use fleet_db::models::server::PingResult;
use fleet_db::repositories::{GroupRepo, ServerRepo};
use fleet_db::DbPool;
use futures::stream::{self, StreamExt};

pub struct ConnectivityAggregator {
    pool: DbPool,
    prober: Arc<dyn HostProber>,
    timeout: Duration,
    max_concurrent: usize,
}

impl ConnectivityAggregator {
    pub fn new(
        pool: DbPool,
        prober: Arc<dyn HostProber>,
        timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            pool,
            prober,
            timeout,
            max_concurrent,
        }
    }

    /// Probe a single registered server.
    pub async fn ping_server(&self, server_id: DbId) -> Result<PingResult, CoreError> {
        let server = ServerRepo::find_by_id(&self.pool, server_id)
            .await
            .ok_or(CoreError::NotFound {
                entity: "Server",
                id: server_id,
            })?;

        let alive = self.probe_one(&server.target()).await;
        Ok(PingResult {
            server_id,
            alive,
            checked_at: Utc::now(),
        })
    }

    /// Probe every member of a group concurrently.
    ///
    /// Members that vanished from the directory since they were added are
    /// reported unreachable rather than omitted.
    pub async fn ping_group(&self, group_id: DbId) -> Result<BTreeMap<DbId, bool>, CoreError> {
        let member_ids = GroupRepo::member_ids(&self.pool, group_id).await?;

        let mut results = BTreeMap::new();
        let mut targets = Vec::with_capacity(member_ids.len());
        for server_id in member_ids {
            match ServerRepo::find_by_id(&self.pool, server_id).await {
                Some(server) => targets.push(server.target()),
                None => {
                    results.insert(server_id, false);
                }
            }
        }

        let probed: Vec<(DbId, bool)> = stream::iter(targets)
            .map(|target| async move {
                let alive = self.probe_one(&target).await;
                (target.server_id, alive)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        results.extend(probed);

        let reachable = results.values().filter(|alive| **alive).count();
        tracing::info!(group_id, total = results.len(), reachable, "Group ping completed");
        Ok(results)
    }

    async fn probe_one(&self, target: &RemoteTarget) -> bool {
        match tokio::time::timeout(self.timeout, self.prober.probe(target)).await {
            Ok(Ok(alive)) => alive,
            Ok(Err(e)) => {
                tracing::warn!(server_id = target.server_id, error = %e, "Probe failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    server_id = target.server_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Probe timed out",
                );
                false
            }
        }
    }
}
