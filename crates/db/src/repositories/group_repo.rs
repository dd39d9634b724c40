//! Repository for server groups and their membership.

use std::collections::BTreeSet;

use chrono::Utc;
use fleet_core::error::CoreError;
use fleet_core::types::DbId;

use crate::models::group::{CreateServerGroup, ServerGroup};
use crate::Store;

/// Provides CRUD and membership operations for server groups.
pub struct GroupRepo;

impl GroupRepo {
    /// Create an empty group. Names are unique.
    pub async fn create(store: &Store, input: &CreateServerGroup) -> Result<ServerGroup, CoreError> {
        let mut rows = store.groups.rows.write().await;
        if rows.values().any(|g| g.name == input.name) {
            return Err(CoreError::Conflict(format!(
                "Group '{}' already exists",
                input.name
            )));
        }
        let group = ServerGroup {
            id: store.groups.next_id(),
            name: input.name.clone(),
            server_ids: BTreeSet::new(),
            created_at: Utc::now(),
        };
        rows.insert(group.id, group.clone());
        Ok(group)
    }

    pub async fn find_by_id(store: &Store, id: DbId) -> Option<ServerGroup> {
        store.groups.rows.read().await.get(&id).cloned()
    }

    pub async fn list(store: &Store) -> Vec<ServerGroup> {
        store.groups.rows.read().await.values().cloned().collect()
    }

    pub async fn delete(store: &Store, id: DbId) -> bool {
        store.groups.rows.write().await.remove(&id).is_some()
    }

    /// Snapshot of the member ids of a group, ascending.
    pub async fn member_ids(store: &Store, group_id: DbId) -> Result<Vec<DbId>, CoreError> {
        let rows = store.groups.rows.read().await;
        let group = rows.get(&group_id).ok_or(CoreError::NotFound {
            entity: "ServerGroup",
            id: group_id,
        })?;
        Ok(group.server_ids.iter().copied().collect())
    }

    /// Add a server to a group. Adding an existing member is a no-op.
    ///
    /// The caller checks that the server exists.
    pub async fn add_server(
        store: &Store,
        group_id: DbId,
        server_id: DbId,
    ) -> Result<ServerGroup, CoreError> {
        let mut rows = store.groups.rows.write().await;
        let group = rows.get_mut(&group_id).ok_or(CoreError::NotFound {
            entity: "ServerGroup",
            id: group_id,
        })?;
        group.server_ids.insert(server_id);
        Ok(group.clone())
    }

    /// Remove a server from a group. Removing a non-member is a no-op.
    pub async fn remove_server(
        store: &Store,
        group_id: DbId,
        server_id: DbId,
    ) -> Result<ServerGroup, CoreError> {
        let mut rows = store.groups.rows.write().await;
        let group = rows.get_mut(&group_id).ok_or(CoreError::NotFound {
            entity: "ServerGroup",
            id: group_id,
        })?;
        group.server_ids.remove(&server_id);
        Ok(group.clone())
    }

    /// Drop a deleted server from every group it belonged to.
    pub async fn remove_server_everywhere(store: &Store, server_id: DbId) {
        let mut rows = store.groups.rows.write().await;
        for group in rows.values_mut() {
            group.server_ids.remove(&server_id);
        }
    }
}
