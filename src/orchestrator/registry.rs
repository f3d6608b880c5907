//! Job registry (C6): the process-wide `id → Job` map.
//!
//! Grounded on the concurrent-map registry shape the teacher uses for
//! `CrawlRegistry`-like structures (`mcp/registry.rs`): a `DashMap` gives
//! independent per-key mutation without a coarse-grained lock, matching
//! spec.md §5's "registry-scoped lock or confining registry mutations to
//! a single scheduling context".

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::JobRequest;
use crate::error::JobError;

use super::events::{BackpressureMode, EventBus};
use super::job::Job;
use super::runner::{self, RunnerDeps};

struct JobHandle {
    job: Arc<Job>,
    runner: Mutex<Option<JoinHandle<()>>>,
}

pub struct JobRegistry {
    jobs: DashMap<Uuid, JobHandle>,
    deps: RunnerDeps,
}

impl JobRegistry {
    #[must_use]
    pub fn new(deps: RunnerDeps) -> Self {
        Self { jobs: DashMap::new(), deps }
    }

    /// Validate `request`, assign a UUID, spawn the runner task, and
    /// store the job.
    pub fn create(&self, request: JobRequest, data_root: &Path) -> Result<Arc<Job>, JobError> {
        let validated = request.validate(data_root)?;
        let id = Uuid::new_v4();
        let events = Arc::new(EventBus::new(BackpressureMode::Block));
        let job = Arc::new(Job::new(id, validated, events));

        log::info!("job {id}: created for origin {}", job.request.origin);

        let job_for_runner = job.clone();
        let deps = self.deps.clone();
        let handle = tokio::spawn(async move { runner::run(job_for_runner, deps).await });

        self.jobs.insert(id, JobHandle { job: job.clone(), runner: Mutex::new(Some(handle)) });
        Ok(job)
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Arc<Job>> {
        self.jobs.get(&id).map(|h| h.job.clone())
    }

    /// Mark `id` cancelled. The runner observes the flag cooperatively;
    /// this does not await the runner task.
    pub fn cancel(&self, id: Uuid) -> Result<Arc<Job>, JobError> {
        let entry = self.jobs.get(&id).ok_or(JobError::NotFound)?;
        let job = entry.job.clone();
        job.cancel();
        log::info!("job {id}: cancellation requested");
        Ok(job)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.jobs.iter().filter(|h| h.job.status().is_active()).count()
    }

    /// Cancel every active job and await their runners.
    pub async fn shutdown(&self) {
        let mut handles = Vec::new();
        for entry in self.jobs.iter() {
            entry.job.cancel();
            if let Some(handle) = entry.runner.lock().await.take() {
                handles.push(handle);
            }
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::browser::ChromiumBrowser;
    use crate::fetch::markdown::HtmdConverter;
    use crate::llm::LlmGateway;
    use std::path::PathBuf;

    fn test_deps() -> RunnerDeps {
        let client = reqwest::Client::new();
        let provider_config = crate::config::ProviderConfig {
            data_root: PathBuf::from("/tmp"),
            ollama_url: "http://localhost:11434".to_string(),
            openrouter_url: "https://openrouter.ai/api/v1".to_string(),
            openrouter_api_key: None,
            opencode_url: "https://api.opencode.dev/v1".to_string(),
            opencode_api_key: None,
        };
        RunnerDeps {
            client: client.clone(),
            llm: Arc::new(LlmGateway::new(client, provider_config)),
            converter: Arc::new(HtmdConverter::new()),
            browser_factory: Arc::new(|| Arc::new(ChromiumBrowser::new())),
        }
    }

    fn sample_request(tmp: &Path) -> JobRequest {
        JobRequest {
            origin: "https://docs.example.com/guide/".to_string(),
            crawl_model: "llama3".to_string(),
            pipeline_model: "llama3".to_string(),
            reasoning_model: "llama3".to_string(),
            output_path: tmp.to_path_buf(),
            delay_ms: 100,
            max_concurrent: 1,
            max_depth: 1,
            respect_robots_txt: false,
            use_native_markdown: false,
            use_markdown_proxy: false,
            filter_sitemap_by_path: true,
            proxy_url: None,
            language: "all".to_string(),
        }
    }

    #[tokio::test]
    async fn active_count_is_zero_with_no_jobs() {
        let registry = JobRegistry::new(test_deps());
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn get_unknown_job_returns_none() {
        let registry = JobRegistry::new(test_deps());
        assert!(registry.get(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn cancel_unknown_job_returns_not_found() {
        let registry = JobRegistry::new(test_deps());
        assert!(matches!(registry.cancel(Uuid::new_v4()), Err(JobError::NotFound)));
    }

    #[tokio::test]
    async fn create_then_cancel_marks_job_cancelled() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = JobRegistry::new(test_deps());
        let request = sample_request(tmp.path());
        let job = registry.create(request, tmp.path()).unwrap();
        assert_eq!(registry.active_count(), 1);

        let cancelled = registry.cancel(job.id).unwrap();
        assert!(cancelled.is_cancelled());
    }
}
