//! Job progress event bus (spec.md §3 Event, §4.6 "Event bus").
//!
//! Grounded on the teacher's `crawl_events::bus` — a `broadcast` channel
//! wrapped with a backpressure mode, a shutdown `Notify`/`AtomicBool`
//! pair, and a consecutive-timeout circuit breaker — reduced to the
//! operations this system's terminal-event guarantee actually needs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Notify};

/// Strategy for handling channel saturation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackpressureMode {
    /// Wait for space, falling back to `DropOldest` past a consecutive
    /// timeout threshold (spec.md §9: never silently drop a terminal
    /// event). The default, per the same design note.
    #[default]
    Block,
    /// Drop the oldest buffered event to make room.
    DropOldest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    PhaseChange,
    Log,
    JobDone,
    JobCancelled,
    JobError,
    Keepalive,
}

/// A single event on a job's stream. `payload` carries the schema
/// described in spec.md §6 ("Event payload schema").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

impl Event {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::JobDone | EventKind::JobCancelled | EventKind::JobError)
    }
}

const CAPACITY: usize = 256;
const CIRCUIT_BREAKER_THRESHOLD: usize = 10;
const BLOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);
const BLOCK_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-job event bus: one producer (the runner), many consumers (event
/// stream callers).
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    mode: BackpressureMode,
    shutdown: Arc<Notify>,
    shutdown_flag: Arc<AtomicBool>,
    consecutive_timeouts: AtomicUsize,
}

impl EventBus {
    #[must_use]
    pub fn new(mode: BackpressureMode) -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self {
            sender,
            mode,
            shutdown: Arc::new(Notify::new()),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            consecutive_timeouts: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Acquire)
    }

    pub fn shut_down(&self) {
        self.shutdown_flag.store(true, Ordering::Release);
        self.shutdown.notify_waiters();
    }

    /// Publish `event`, honoring the configured backpressure mode.
    /// Terminal events always eventually publish — a publisher that
    /// can't find space after [`BLOCK_TOTAL_TIMEOUT`] falls back to
    /// `DropOldest`'s best-effort `send`, never silently discarding it.
    pub async fn publish(&self, event: Event) {
        match self.mode {
            BackpressureMode::DropOldest => {
                let _ = self.sender.send(event);
            }
            BackpressureMode::Block => {
                let timeouts = self.consecutive_timeouts.load(Ordering::Acquire);
                if timeouts > CIRCUIT_BREAKER_THRESHOLD {
                    log::warn!(
                        "event bus: circuit breaker open after {timeouts} consecutive timeouts, falling back to drop-oldest"
                    );
                    let _ = self.sender.send(event);
                    return;
                }

                let wait = async {
                    while self.sender.len() >= CAPACITY && !self.is_shutdown() {
                        tokio::time::sleep(BLOCK_POLL_INTERVAL).await;
                    }
                };
                match tokio::time::timeout(BLOCK_TOTAL_TIMEOUT, wait).await {
                    Ok(()) => {
                        self.consecutive_timeouts.store(0, Ordering::Release);
                    }
                    Err(_) => {
                        self.consecutive_timeouts.fetch_add(1, Ordering::AcqRel);
                        log::warn!("event bus: publish blocked past {BLOCK_TOTAL_TIMEOUT:?}, sending anyway");
                    }
                }
                let _ = self.sender.send(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_event() -> Event {
        Event { kind: EventKind::Log, payload: serde_json::json!({"message": "hi"}) }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new(BackpressureMode::DropOldest);
        let mut rx = bus.subscribe();
        bus.publish(log_event()).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::Log);
    }

    #[test]
    fn terminal_events_are_identified() {
        let done = Event { kind: EventKind::JobDone, payload: serde_json::json!({}) };
        let log = log_event();
        assert!(done.is_terminal());
        assert!(!log.is_terminal());
    }

    #[test]
    fn shutdown_flag_round_trips() {
        let bus = EventBus::new(BackpressureMode::Block);
        assert!(!bus.is_shutdown());
        bus.shut_down();
        assert!(bus.is_shutdown());
    }
}
