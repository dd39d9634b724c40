//! Script library entity and DTOs.

use fleet_core::execution::ScriptSource;
use fleet_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Script {
    pub id: DbId,
    pub name: String,
    pub content: String,
    pub created_at: Timestamp,
}

impl Script {
    pub fn source(&self) -> ScriptSource {
        ScriptSource {
            script_id: self.id,
            name: self.name.clone(),
            content: self.content.clone(),
        }
    }
}

/// DTO for `POST /api/v1/scripts`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScript {
    pub name: String,
    pub content: String,
}
