//! Repository for registered servers.

use chrono::Utc;
use fleet_core::error::CoreError;
use fleet_core::types::DbId;
use fleet_core::validation::DEFAULT_SSH_PORT;

use crate::models::server::{CreateServer, Server, UpdateServer};
use crate::Store;

/// Login name used when a server is registered without one.
const DEFAULT_USERNAME: &str = "root";

/// Provides CRUD operations for servers.
pub struct ServerRepo;

impl ServerRepo {
    /// Register a server. Hostnames and addresses are unique.
    pub async fn create(store: &Store, input: &CreateServer) -> Result<Server, CoreError> {
        let mut rows = store.servers.rows.write().await;

        if rows.values().any(|s| s.hostname == input.hostname) {
            return Err(CoreError::Conflict(format!(
                "Server with hostname '{}' already exists",
                input.hostname
            )));
        }
        if rows.values().any(|s| s.ip_address == input.ip_address) {
            return Err(CoreError::Conflict(format!(
                "Server with address '{}' already exists",
                input.ip_address
            )));
        }

        let server = Server {
            id: store.servers.next_id(),
            hostname: input.hostname.clone(),
            ip_address: input.ip_address.clone(),
            port: input.port.unwrap_or(DEFAULT_SSH_PORT),
            username: input
                .username
                .clone()
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            created_at: Utc::now(),
        };
        rows.insert(server.id, server.clone());
        Ok(server)
    }

    /// Apply a partial update. Omitted fields keep their value; a new
    /// hostname or address must not belong to another server.
    pub async fn update(
        store: &Store,
        id: DbId,
        input: &UpdateServer,
    ) -> Result<Server, CoreError> {
        let mut rows = store.servers.rows.write().await;
        if !rows.contains_key(&id) {
            return Err(CoreError::NotFound {
                entity: "Server",
                id,
            });
        }

        if let Some(hostname) = &input.hostname {
            if rows.values().any(|s| s.id != id && &s.hostname == hostname) {
                return Err(CoreError::Conflict(format!(
                    "Server with hostname '{hostname}' already exists"
                )));
            }
        }
        if let Some(address) = &input.ip_address {
            if rows.values().any(|s| s.id != id && &s.ip_address == address) {
                return Err(CoreError::Conflict(format!(
                    "Server with address '{address}' already exists"
                )));
            }
        }

        let server = rows.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "Server",
            id,
        })?;
        if let Some(hostname) = &input.hostname {
            server.hostname = hostname.clone();
        }
        if let Some(address) = &input.ip_address {
            server.ip_address = address.clone();
        }
        if let Some(port) = input.port {
            server.port = port;
        }
        if let Some(username) = &input.username {
            server.username = username.clone();
        }
        Ok(server.clone())
    }

    pub async fn find_by_id(store: &Store, id: DbId) -> Option<Server> {
        store.servers.rows.read().await.get(&id).cloned()
    }

    /// Resolve every id, failing on the first one that does not exist.
    pub async fn find_many(store: &Store, ids: &[DbId]) -> Result<Vec<Server>, CoreError> {
        let rows = store.servers.rows.read().await;
        ids.iter()
            .map(|id| {
                rows.get(id).cloned().ok_or(CoreError::NotFound {
                    entity: "Server",
                    id: *id,
                })
            })
            .collect()
    }

    /// All servers, oldest first.
    pub async fn list(store: &Store) -> Vec<Server> {
        store.servers.rows.read().await.values().cloned().collect()
    }

    /// Servers registered under exactly `hostname`.
    pub async fn list_by_hostname(store: &Store, hostname: &str) -> Vec<Server> {
        store
            .servers
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.hostname == hostname)
            .cloned()
            .collect()
    }

    /// Remove a server. Returns `true` if it existed.
    pub async fn delete(store: &Store, id: DbId) -> bool {
        store.servers.rows.write().await.remove(&id).is_some()
    }
}
