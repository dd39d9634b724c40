//! Server (remote host) entity and DTOs.

use fleet_core::execution::RemoteTarget;
use fleet_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

/// A registered remote host.
#[derive(Debug, Clone, Serialize)]
pub struct Server {
    pub id: DbId,
    pub hostname: String,
    pub ip_address: String,
    pub port: u16,
    pub username: String,
    pub created_at: Timestamp,
}

impl Server {
    /// Connection details handed to the execution and probe capabilities.
    pub fn target(&self) -> RemoteTarget {
        RemoteTarget {
            server_id: self.id,
            hostname: self.hostname.clone(),
            address: self.ip_address.clone(),
            port: self.port,
            username: self.username.clone(),
        }
    }
}

/// DTO for `POST /api/v1/servers`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateServer {
    pub hostname: String,
    pub ip_address: String,
    /// Defaults to 22.
    pub port: Option<u16>,
    /// Defaults to `root`.
    pub username: Option<String>,
}

/// DTO for `PUT /api/v1/servers/{id}`. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateServer {
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
}

/// Query of `GET /api/v1/servers`.
#[derive(Debug, Deserialize)]
pub struct ServerListQuery {
    pub hostname: Option<String>,
}

/// Response of `GET /api/v1/servers/{id}/ping`.
#[derive(Debug, Clone, Serialize)]
pub struct PingResult {
    pub server_id: DbId,
    pub alive: bool,
    pub checked_at: Timestamp,
}
