//! Server group entity and DTOs.

use std::collections::BTreeSet;

use fleet_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

/// A named set of servers. Members are kept in ascending id order, which is
/// also the order fan-out creates tasks in.
#[derive(Debug, Clone, Serialize)]
pub struct ServerGroup {
    pub id: DbId,
    pub name: String,
    pub server_ids: BTreeSet<DbId>,
    pub created_at: Timestamp,
}

/// DTO for `POST /api/v1/groups`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateServerGroup {
    pub name: String,
}

/// Body of `POST /api/v1/groups/{id}/execute`.
#[derive(Debug, Deserialize)]
pub struct ExecuteGroup {
    pub script_id: Option<DbId>,
}
