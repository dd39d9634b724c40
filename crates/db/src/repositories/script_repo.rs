//! Repository for the script library.

use chrono::Utc;
use fleet_core::types::DbId;

use crate::models::script::{CreateScript, Script};
use crate::Store;

/// Provides CRUD operations for scripts.
pub struct ScriptRepo;

impl ScriptRepo {
    pub async fn create(store: &Store, input: &CreateScript) -> Script {
        let script = Script {
            id: store.scripts.next_id(),
            name: input.name.clone(),
            content: input.content.clone(),
            created_at: Utc::now(),
        };
        store
            .scripts
            .rows
            .write()
            .await
            .insert(script.id, script.clone());
        script
    }

    pub async fn find_by_id(store: &Store, id: DbId) -> Option<Script> {
        store.scripts.rows.read().await.get(&id).cloned()
    }

    pub async fn list(store: &Store) -> Vec<Script> {
        store.scripts.rows.read().await.values().cloned().collect()
    }

    pub async fn delete(store: &Store, id: DbId) -> bool {
        store.scripts.rows.write().await.remove(&id).is_some()
    }
}
