//! In-memory record store for the fleet task engine.
//!
//! [`Store`] plays the role a connection pool plays for a SQL-backed
//! repository layer: it is created once at startup, shared as a [`DbPool`],
//! and passed by reference to the zero-sized repositories in
//! [`repositories`]. Records live for the lifetime of the process.

pub mod models;
pub mod repositories;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use fleet_core::types::DbId;
use tokio::sync::RwLock;

use models::group::ServerGroup;
use models::script::Script;
use models::server::Server;
use models::task::Task;

pub type DbPool = Arc<Store>;

/// Create an empty store.
pub fn create_pool() -> DbPool {
    Arc::new(Store::default())
}

/// All tables of the fleet store.
///
/// Task rows are individually locked so that updates to different tasks
/// never contend; the table lock is only taken to look a row up or insert.
#[derive(Debug, Default)]
pub struct Store {
    pub(crate) tasks: Table<Arc<RwLock<Task>>>,
    pub(crate) servers: Table<Server>,
    pub(crate) scripts: Table<Script>,
    pub(crate) groups: Table<ServerGroup>,
}

/// An id-keyed table with a monotonically increasing id sequence.
#[derive(Debug)]
pub(crate) struct Table<T> {
    pub(crate) rows: RwLock<BTreeMap<DbId, T>>,
    next_id: AtomicI64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<T> Table<T> {
    /// Allocate the next id. Ids are never reused, even after deletes.
    pub(crate) fn next_id(&self) -> DbId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}
