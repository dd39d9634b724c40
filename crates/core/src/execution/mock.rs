//! Simulated [`ScriptRunner`] for development without real hosts.

use std::time::Duration;

use async_trait::async_trait;

use super::{OutputSink, RemoteTarget, RunError, RunOutcome, ScriptRunner, ScriptSource};

/// Default simulated execution time.
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_secs(2);

/// Pretends to connect, waits, and always exits 0.
#[derive(Debug, Clone)]
pub struct MockRunner {
    delay: Duration,
}

impl MockRunner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DELAY)
    }
}

#[async_trait]
impl ScriptRunner for MockRunner {
    async fn run(
        &self,
        target: &RemoteTarget,
        script: &ScriptSource,
        output: OutputSink,
    ) -> Result<RunOutcome, RunError> {
        let _ = output.send(format!("Connected to {}\n", target.hostname));
        tokio::time::sleep(self.delay).await;
        let _ = output.send(format!("Executing: {}\n", script.name));
        let _ = output.send("Done. Exit code 0.\n".to_string());
        Ok(RunOutcome { exit_code: 0 })
    }
}
