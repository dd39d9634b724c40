use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Task engine settings.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    ///
    /// See [`EngineConfig::from_env`] for the engine variables.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            engine: EngineConfig::from_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Which execution and probe capabilities to wire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    /// Simulated runs, every host reachable.
    Mock,
    /// System `ssh` client, TCP connect probes.
    Ssh,
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "ssh" => Ok(Self::Ssh),
            other => Err(format!("unknown executor type '{other}' (expected 'mock' or 'ssh')")),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => f.write_str("mock"),
            Self::Ssh => f.write_str("ssh"),
        }
    }
}

/// Task engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub executor: ExecutorKind,
    /// Wall-clock limit for one task run.
    pub execution_timeout: Duration,
    /// Limit for a single host probe.
    pub probe_timeout: Duration,
    /// `ConnectTimeout` handed to the ssh client.
    pub ssh_connect_timeout: Duration,
    /// Tasks allowed to run at once; the rest wait `queued`.
    pub max_concurrent_executions: usize,
    /// Probes allowed in flight per group ping.
    pub max_concurrent_probes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorKind::Mock,
            execution_timeout: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(3),
            ssh_connect_timeout: Duration::from_secs(10),
            max_concurrent_executions: 64,
            max_concurrent_probes: 64,
        }
    }
}

impl EngineConfig {
    /// Load engine settings from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `EXECUTOR_TYPE`             | `mock`  |
    /// | `EXECUTION_TIMEOUT_SECS`    | `300`   |
    /// | `PROBE_TIMEOUT_SECS`        | `3`     |
    /// | `SSH_CONNECT_TIMEOUT_SECS`  | `10`    |
    /// | `MAX_CONCURRENT_EXECUTIONS` | `64`    |
    /// | `MAX_CONCURRENT_PROBES`     | `64`    |
    pub fn from_env() -> Self {
        let executor: ExecutorKind = std::env::var("EXECUTOR_TYPE")
            .unwrap_or_else(|_| "mock".into())
            .parse()
            .unwrap_or_else(|e| panic!("EXECUTOR_TYPE is invalid: {e}"));

        let execution_timeout_secs: u64 = std::env::var("EXECUTION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("EXECUTION_TIMEOUT_SECS must be a valid u64");

        let probe_timeout_secs: u64 = std::env::var("PROBE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("PROBE_TIMEOUT_SECS must be a valid u64");

        let ssh_connect_timeout_secs: u64 = std::env::var("SSH_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("SSH_CONNECT_TIMEOUT_SECS must be a valid u64");

        let max_concurrent_executions: usize = std::env::var("MAX_CONCURRENT_EXECUTIONS")
            .unwrap_or_else(|_| "64".into())
            .parse()
            .expect("MAX_CONCURRENT_EXECUTIONS must be a valid usize");

        let max_concurrent_probes: usize = std::env::var("MAX_CONCURRENT_PROBES")
            .unwrap_or_else(|_| "64".into())
            .parse()
            .expect("MAX_CONCURRENT_PROBES must be a valid usize");

        assert!(
            max_concurrent_executions > 0 && max_concurrent_probes > 0,
            "MAX_CONCURRENT_EXECUTIONS and MAX_CONCURRENT_PROBES must be positive"
        );

        Self {
            executor,
            execution_timeout: Duration::from_secs(execution_timeout_secs),
            probe_timeout: Duration::from_secs(probe_timeout_secs),
            ssh_connect_timeout: Duration::from_secs(ssh_connect_timeout_secs),
            max_concurrent_executions,
            max_concurrent_probes,
        }
    }
}
