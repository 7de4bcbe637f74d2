//! Log broadcaster — the single authoritative path for recording and
//! distributing a log event.
//!
//! Owns a bounded, time-ordered in-memory buffer of the most recent
//! entries plus the id counter. Every append goes through one lock so
//! that concurrent writers (request handlers and the ambient
//! generator) get unique, strictly increasing ids and a consistent
//! durable order: assign id, insert, evict, persist, publish — in that
//! order, under the lock. Eviction only trims the in-memory buffer;
//! persisted copies are retained indefinitely.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::events::{DashboardEvent, EventChannel};
use crate::generator::{AMBIENT_LEVELS, AMBIENT_MESSAGES, AMBIENT_SOURCES};
use crate::store::{LogEntry, LogLevel, Store};

/// Maximum number of entries kept in memory; the oldest entry is
/// evicted beyond this.
pub const LOG_BUFFER_CAPACITY: usize = 1000;

/// Default `list` limit when the caller does not specify one.
const DEFAULT_LIST_LIMIT: usize = 50;

struct BufferState {
    /// Newest entry at the front.
    entries: VecDeque<LogEntry>,
    next_id: i64,
}

pub struct LogBroadcaster {
    state: Mutex<BufferState>,
    store: Store,
    events: EventChannel,
}

impl LogBroadcaster {
    pub fn new(store: Store, events: EventChannel) -> Self {
        Self {
            state: Mutex::new(BufferState {
                entries: VecDeque::with_capacity(LOG_BUFFER_CAPACITY),
                next_id: 1,
            }),
            store,
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one log event: assign the next id, timestamp it, insert
    /// at the head of the buffer (evicting the oldest entry beyond
    /// capacity), persist it, and publish it as `new_log`.
    ///
    /// Persistence is best-effort: a store failure is reported on the
    /// process's own diagnostic output and not retried — the in-memory
    /// append and the publish still happen. `source` and `message`
    /// must be non-empty.
    pub fn append(&self, level: LogLevel, source: &str, message: &str) -> LogEntry {
        debug_assert!(!source.is_empty() && !message.is_empty());

        // The lock is held across persist and publish so entries reach
        // the store in id order and no publish precedes its insert.
        let mut state = self.state();
        let entry = LogEntry {
            id: state.next_id,
            timestamp: Utc::now(),
            level,
            source: source.to_string(),
            message: message.to_string(),
        };
        state.next_id += 1;

        state.entries.push_front(entry.clone());
        if state.entries.len() > LOG_BUFFER_CAPACITY {
            state.entries.pop_back();
        }

        if let Err(err) = self.store.insert_log(&entry) {
            tracing::warn!("Failed to persist log entry {}: {}", entry.id, err);
        }

        self.events.publish(DashboardEvent::NewLog(entry.clone()));
        entry
    }

    /// Up to `limit` (default 50) most-recent entries, optionally
    /// filtered by level and source (source matched
    /// case-insensitively), sorted descending by timestamp. Pure read
    /// of the in-memory buffer.
    pub fn list(
        &self,
        limit: Option<usize>,
        level: Option<LogLevel>,
        source: Option<&str>,
    ) -> Vec<LogEntry> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let state = self.state();
        let mut entries: Vec<LogEntry> = state
            .entries
            .iter()
            .filter(|e| level.map_or(true, |l| e.level == l))
            .filter(|e| source.map_or(true, |s| e.source.eq_ignore_ascii_case(s)))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        entries
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// Fill an empty buffer with `count` backdated synthetic entries
    /// so the dashboard has history right after boot. In-memory only:
    /// nothing is persisted or published, and subsequent appends
    /// continue the id sequence.
    pub fn seed_history(&self, count: usize) {
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        let mut state = self.state();
        if !state.entries.is_empty() {
            return;
        }

        let mut seeded: Vec<LogEntry> = (0..count.min(LOG_BUFFER_CAPACITY))
            .map(|i| LogEntry {
                id: i as i64 + 1,
                timestamp: now - Duration::minutes(rng.gen_range(1..=120)),
                level: *AMBIENT_LEVELS.choose(&mut rng).unwrap_or(&LogLevel::Info),
                source: AMBIENT_SOURCES
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or("system")
                    .to_string(),
                message: AMBIENT_MESSAGES
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or("Heartbeat received")
                    .to_string(),
            })
            .collect();
        // Keep the buffer time-ordered, newest first
        seeded.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        state.next_id = seeded.len() as i64 + 1;
        state.entries = seeded.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn test_broadcaster() -> (Arc<LogBroadcaster>, EventChannel, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(dir.path().join("logs.db")).expect("open store");
        let events = EventChannel::new();
        (
            Arc::new(LogBroadcaster::new(store, events.clone())),
            events,
            dir,
        )
    }

    #[test]
    fn append_assigns_strictly_increasing_ids() {
        let (logs, _events, _dir) = test_broadcaster();
        let ids: Vec<i64> = (0..10)
            .map(|i| logs.append(LogLevel::Info, "api", &format!("request {i}")).id)
            .collect();
        assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(ids[0], 1);
    }

    #[test]
    fn concurrent_appends_produce_unique_contiguous_ids() {
        let (logs, _events, _dir) = test_broadcaster();
        const THREADS: usize = 4;
        const PER_THREAD: usize = 50;

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let logs = Arc::clone(&logs);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|i| {
                            logs.append(LogLevel::Debug, "system", &format!("t{t} op{i}"))
                                .id
                        })
                        .collect::<Vec<i64>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("thread completes") {
                assert!(ids.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(ids.len(), THREADS * PER_THREAD);
        // No gaps: the counter only ever advances by one per append
        assert_eq!(*ids.iter().max().expect("non-empty"), (THREADS * PER_THREAD) as i64);
    }

    #[test]
    fn buffer_is_bounded_and_evicts_oldest() {
        let (logs, _events, _dir) = test_broadcaster();
        for i in 0..(LOG_BUFFER_CAPACITY + 1) {
            logs.append(LogLevel::Info, "system", &format!("entry {i}"));
        }

        assert_eq!(logs.len(), LOG_BUFFER_CAPACITY);

        let listed = logs.list(Some(LOG_BUFFER_CAPACITY + 10), None, None);
        assert_eq!(listed.len(), LOG_BUFFER_CAPACITY);
        // The first entry was evicted from memory...
        assert!(listed.iter().all(|e| e.id != 1));
        // ...but its persisted copy survives.
        let persisted = logs
            .store
            .recent_logs(LOG_BUFFER_CAPACITY + 10)
            .expect("recent logs");
        assert_eq!(persisted.len(), LOG_BUFFER_CAPACITY + 1);
        assert!(persisted.iter().any(|e| e.message == "entry 0"));
    }

    #[test]
    fn list_respects_limit_and_descending_order() {
        let (logs, _events, _dir) = test_broadcaster();
        for i in 0..20 {
            logs.append(LogLevel::Info, "api", &format!("request {i}"));
        }

        let listed = logs.list(Some(5), None, None);
        assert_eq!(listed.len(), 5);
        assert!(listed.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        // Default limit is 50
        for i in 0..60 {
            logs.append(LogLevel::Info, "api", &format!("more {i}"));
        }
        assert_eq!(logs.list(None, None, None).len(), 50);
    }

    #[test]
    fn list_filters_by_level_and_source() {
        let (logs, _events, _dir) = test_broadcaster();
        logs.append(LogLevel::Info, "gateway", "Connected to gateway");
        logs.append(LogLevel::Error, "database", "Query failed");
        logs.append(LogLevel::Error, "gateway", "Connection lost");

        let errors = logs.list(None, Some(LogLevel::Error), None);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.level == LogLevel::Error));

        // Source matching is case-insensitive
        let gateway = logs.list(None, None, Some("Gateway"));
        assert_eq!(gateway.len(), 2);

        let both = logs.list(None, Some(LogLevel::Error), Some("GATEWAY"));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].message, "Connection lost");
    }

    #[tokio::test]
    async fn append_publishes_after_recording() {
        let (logs, events, _dir) = test_broadcaster();
        let mut rx = events.subscribe();

        let appended = logs.append(LogLevel::Warn, "system", "Gateway restart requested");

        let event = rx.recv().await.expect("receive event");
        match event {
            DashboardEvent::NewLog(entry) => {
                assert_eq!(entry.id, appended.id);
                assert_eq!(entry.message, "Gateway restart requested");
                // Already visible in the buffer when the event arrives
                assert!(logs.list(None, None, None).iter().any(|e| e.id == entry.id));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn seed_history_is_memory_only_and_continues_id_sequence() {
        let (logs, _events, _dir) = test_broadcaster();
        logs.seed_history(100);

        assert_eq!(logs.len(), 100);
        assert!(logs
            .store
            .recent_logs(10)
            .expect("recent logs")
            .is_empty());

        let next = logs.append(LogLevel::Info, "system", "Agent initialized");
        assert_eq!(next.id, 101);

        // Seeding a non-empty buffer is a no-op
        logs.seed_history(100);
        assert_eq!(logs.len(), 101);
    }
}
