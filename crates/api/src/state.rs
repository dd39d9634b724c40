use std::sync::Arc;

use fleet_core::execution::ScriptRunner;
use fleet_core::probe::HostProber;

use crate::config::ServerConfig;
use crate::engine::connectivity::ConnectivityAggregator;
use crate::engine::dispatcher::TaskDispatcher;
use crate::engine::driver::ExecutionDriver;
use crate::engine::stats::ExecutionStats;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// In-memory record store.
    pub pool: fleet_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Starts, cancels, and tracks task drivers.
    pub dispatcher: Arc<TaskDispatcher>,
    /// Fans reachability probes out over servers and groups.
    pub connectivity: Arc<ConnectivityAggregator>,
    /// Execution counters.
    pub stats: Arc<ExecutionStats>,
}

impl AppState {
    /// Wire the engine around `pool` using the given capabilities.
    pub fn new(
        pool: fleet_db::DbPool,
        config: ServerConfig,
        runner: Arc<dyn ScriptRunner>,
        prober: Arc<dyn HostProber>,
    ) -> Self {
        let engine = &config.engine;
        let stats = Arc::new(ExecutionStats::default());

        let driver = ExecutionDriver::new(
            pool.clone(),
            runner,
            engine.max_concurrent_executions,
            engine.execution_timeout,
            Arc::clone(&stats),
        );
        let dispatcher = Arc::new(TaskDispatcher::new(pool.clone(), driver, Arc::clone(&stats)));
        let connectivity = Arc::new(ConnectivityAggregator::new(
            pool.clone(),
            prober,
            engine.probe_timeout,
            engine.max_concurrent_probes,
        ));

        Self {
            pool,
            config: Arc::new(config),
            dispatcher,
            connectivity,
            stats,
        }
    }
}
