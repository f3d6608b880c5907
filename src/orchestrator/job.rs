//! Job data model (spec.md §3 Job).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::JobRequest;

use super::events::{Event, EventBus, EventKind};

/// `event_stream`'s dequeue timeout (spec.md §4.6, §9): past this, either
/// synthesize a terminal event (runner task gone) or a `keepalive`.
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed)
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

/// A job's mutable progress counters, read by the transport layer and
/// written only by its own runner task.
pub struct JobProgress {
    pub pages_total: AtomicU64,
    pub pages_completed: AtomicU64,
    pub current_url: RwLock<Option<String>>,
}

impl Default for JobProgress {
    fn default() -> Self {
        Self {
            pages_total: AtomicU64::new(0),
            pages_completed: AtomicU64::new(0),
            current_url: RwLock::new(None),
        }
    }
}

/// A job, exclusively owned by the [`super::registry::JobRegistry`].
pub struct Job {
    pub id: Uuid,
    pub request: JobRequest,
    pub status: RwLock<JobStatus>,
    pub progress: JobProgress,
    pub cancelled: AtomicBool,
    pub events: Arc<EventBus>,
    runner_finished: AtomicBool,
}

impl Job {
    #[must_use]
    pub fn new(id: Uuid, request: JobRequest, events: Arc<EventBus>) -> Self {
        Self {
            id,
            request,
            status: RwLock::new(JobStatus::Pending),
            progress: JobProgress::default(),
            cancelled: AtomicBool::new(false),
            events,
            runner_finished: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn status(&self) -> JobStatus {
        *self.status.read()
    }

    pub fn set_status(&self, status: JobStatus) {
        *self.status.write() = status;
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_runner_finished(&self) -> bool {
        self.runner_finished.load(Ordering::Acquire)
    }

    /// Mark the runner task as having ended, one way or another. Called
    /// from a drop guard in `runner::run` so it fires even if the task
    /// panics past its own terminal-event finalizer.
    pub fn mark_runner_finished(&self) {
        self.runner_finished.store(true, Ordering::Release);
    }

    /// `event_stream` (spec.md §4.6): dequeue the next event for `rx`,
    /// waiting at most [`KEEPALIVE_TIMEOUT`]. Past that timeout, synthesize
    /// `job_done(status=failed)` if the runner task has already ended
    /// without publishing a terminal event itself, otherwise a
    /// `keepalive`. Returns `None` once the bus is closed for good.
    pub async fn next_event(&self, rx: &mut broadcast::Receiver<Event>) -> Option<Event> {
        loop {
            match tokio::time::timeout(KEEPALIVE_TIMEOUT, rx.recv()).await {
                Ok(Ok(event)) => return Some(event),
                Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                    log::warn!("job {}: event stream lagged by {n} events", self.id);
                    continue;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => {
                    if self.is_runner_finished() {
                        return Some(Event {
                            kind: EventKind::JobDone,
                            payload: json!({
                                "status": "failed",
                                "error": "runner ended without terminal event",
                            }),
                        });
                    }
                    return Some(Event { kind: EventKind::Keepalive, payload: json!({}) });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::events::BackpressureMode;
    use crate::config::JobRequest;
    use std::path::PathBuf;

    fn sample_job() -> Job {
        let request = JobRequest {
            origin: "https://docs.example.com/".to_string(),
            crawl_model: "llama3".to_string(),
            pipeline_model: "llama3".to_string(),
            reasoning_model: "llama3".to_string(),
            output_path: PathBuf::from("/tmp"),
            delay_ms: 1000,
            max_concurrent: 1,
            max_depth: 1,
            respect_robots_txt: false,
            use_native_markdown: false,
            use_markdown_proxy: false,
            filter_sitemap_by_path: true,
            proxy_url: None,
            language: "all".to_string(),
        };
        Job::new(Uuid::new_v4(), request, Arc::new(EventBus::new(BackpressureMode::Block)))
    }

    #[tokio::test(start_paused = true)]
    async fn emits_keepalive_when_runner_still_alive() {
        let job = sample_job();
        let mut rx = job.events.subscribe();
        let event = job.next_event(&mut rx).await.unwrap();
        assert_eq!(event.kind, EventKind::Keepalive);
    }

    #[tokio::test(start_paused = true)]
    async fn synthesizes_job_done_failed_when_runner_finished_without_terminal_event() {
        let job = sample_job();
        job.mark_runner_finished();
        let mut rx = job.events.subscribe();
        let event = job.next_event(&mut rx).await.unwrap();
        assert_eq!(event.kind, EventKind::JobDone);
        assert_eq!(event.payload["status"], "failed");
    }

    #[tokio::test]
    async fn returns_real_event_before_timeout_elapses() {
        let job = sample_job();
        let mut rx = job.events.subscribe();
        job.events.publish(Event { kind: EventKind::Log, payload: json!({"message": "hi"}) }).await;
        let event = job.next_event(&mut rx).await.unwrap();
        assert_eq!(event.kind, EventKind::Log);
    }
}
