//! Task execution engine.
//!
//! - [`driver`] runs one task through its lifecycle.
//! - [`dispatcher`] creates tasks (single, bulk, group fan-out), starts a
//!   driver per task, and handles cancellation and shutdown.
//! - [`connectivity`] fans reachability probes out over a group.
//! - [`stats`] keeps execution counters.

pub mod connectivity;
pub mod dispatcher;
pub mod driver;
pub mod stats;

use std::sync::Arc;

use fleet_core::execution::mock::MockRunner;
use fleet_core::execution::ssh::SshRunner;
use fleet_core::execution::ScriptRunner;
use fleet_core::probe::mock::MockProber;
use fleet_core::probe::tcp::TcpProber;
use fleet_core::probe::HostProber;

use crate::config::{EngineConfig, ExecutorKind};

/// Build the execution and probe capabilities selected by `config.executor`.
pub fn build_capabilities(config: &EngineConfig) -> (Arc<dyn ScriptRunner>, Arc<dyn HostProber>) {
    match config.executor {
        ExecutorKind::Mock => (Arc::new(MockRunner::default()), Arc::new(MockProber)),
        ExecutorKind::Ssh => (
            Arc::new(SshRunner::new(config.ssh_connect_timeout)),
            Arc::new(TcpProber),
        ),
    }
}
