//! Ambient log generator.
//!
//! A long-lived task that appends a synthetic log entry every 5–15
//! seconds, simulating system activity while the dashboard is not
//! wired to a live gateway. Runs until its cancellation token fires at
//! process shutdown.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::logs::LogBroadcaster;
use crate::store::LogLevel;

pub(crate) const AMBIENT_LEVELS: [LogLevel; 4] = [
    LogLevel::Debug,
    LogLevel::Info,
    LogLevel::Warn,
    LogLevel::Error,
];

pub(crate) const AMBIENT_SOURCES: [&str; 5] =
    ["gateway", "scheduler", "api", "database", "system"];

pub(crate) const AMBIENT_MESSAGES: [&str; 10] = [
    "Connected to gateway",
    "Job executed successfully",
    "API request received",
    "Database query executed",
    "Cache cleared",
    "Agent initialized",
    "Skill loaded",
    "Heartbeat received",
    "Token usage updated",
    "Configuration reloaded",
];

const MIN_INTERVAL_SECS: u64 = 5;
const MAX_INTERVAL_SECS: u64 = 15;

/// Start the generator. The returned handle completes once `shutdown`
/// is cancelled.
pub fn spawn(logs: Arc<LogBroadcaster>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run(logs, shutdown))
}

async fn run(logs: Arc<LogBroadcaster>, shutdown: CancellationToken) {
    info!("Ambient log generator started");
    loop {
        let secs = rand::thread_rng().gen_range(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS);
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
        }

        let (level, source, message) = {
            let mut rng = rand::thread_rng();
            (
                *AMBIENT_LEVELS.choose(&mut rng).unwrap_or(&LogLevel::Info),
                AMBIENT_SOURCES.choose(&mut rng).copied().unwrap_or("system"),
                AMBIENT_MESSAGES
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or("Heartbeat received"),
            )
        };
        // append is best-effort internally; a failed persist never
        // stops the loop
        logs.append(level, source, message);
    }
    info!("Ambient log generator stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;
    use crate::store::Store;

    fn test_logs() -> (Arc<LogBroadcaster>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(dir.path().join("gen.db")).expect("open store");
        (
            Arc::new(LogBroadcaster::new(store, EventChannel::new())),
            dir,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn generator_appends_on_a_timer() {
        let (logs, _dir) = test_logs();
        let shutdown = CancellationToken::new();
        let handle = spawn(Arc::clone(&logs), shutdown.clone());

        // Paused time auto-advances past several sleep cycles
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(!logs.is_empty());
        let entry = &logs.list(Some(1), None, None)[0];
        assert!(AMBIENT_SOURCES.contains(&entry.source.as_str()));
        assert!(AMBIENT_MESSAGES.contains(&entry.message.as_str()));

        shutdown.cancel();
        handle.await.expect("generator exits cleanly");
    }

    #[tokio::test]
    async fn generator_stops_on_cancellation() {
        let (logs, _dir) = test_logs();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let handle = spawn(logs, shutdown);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("stops promptly")
            .expect("no panic");
    }
}
