//! Per-job runner state machine (spec.md §4.6 "Runner state machine").

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;

use crate::discovery;
use crate::error::SanitizedError;
use crate::fetch::browser::BrowserFetcher;
use crate::fetch::markdown::MarkdownConverter;
use crate::fetch::{chunk, preclean, PageFetcher};
use crate::filter;
use crate::filter::robots::RobotsRules;
use crate::llm::LlmGateway;

use super::events::{Event, EventKind};
use super::job::{Job, JobStatus};
use super::output;

/// Shared, process-wide collaborators a runner needs. Cheap to clone
/// (everything behind an `Arc`); one instance is built at startup and
/// handed to every spawned job.
#[derive(Clone)]
pub struct RunnerDeps {
    pub client: reqwest::Client,
    pub llm: Arc<LlmGateway>,
    pub converter: Arc<dyn MarkdownConverter>,
    pub browser_factory: Arc<dyn Fn() -> Arc<dyn BrowserFetcher> + Send + Sync>,
}

/// Marks the job's runner as finished on drop, including on panic-driven
/// unwind — [`Job::next_event`] uses this to tell a genuinely hung runner
/// apart from one that crashed past its own terminal-event finalizer.
struct FinishGuard<'a>(&'a Job);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_runner_finished();
    }
}

/// Run `job` to completion. Always emits exactly one terminal event,
/// even if an internal stage panics past recovery — the finalizer at
/// the bottom forces `job_done(status=failed)` if the job is still
/// `running` when this function returns.
pub async fn run(job: Arc<Job>, deps: RunnerDeps) {
    let _finish_guard = FinishGuard(&job);
    job.set_status(JobStatus::Running);
    let browser = (deps.browser_factory)();

    let outcome = run_inner(&job, &deps, &browser).await;

    browser.stop().await;

    match outcome {
        Ok(()) => {
            if job.status() == JobStatus::Running {
                job.set_status(JobStatus::Completed);
                emit_done(&job, "completed", None).await;
            }
        }
        Err(RunOutcome::Cancelled) => {
            job.set_status(JobStatus::Cancelled);
            job.events
                .publish(Event {
                    kind: EventKind::JobCancelled,
                    payload: json!({"status": "cancelled"}),
                })
                .await;
        }
        Err(RunOutcome::Failed(err)) => {
            job.set_status(JobStatus::Failed);
            emit_done(&job, "failed", Some(err)).await;
        }
    }

    // Terminal safety net: whatever happened above, the job must not be
    // left non-terminal.
    if !job.status().is_terminal() {
        job.set_status(JobStatus::Failed);
        emit_done(&job, "failed", Some(SanitizedError::new("runner ended without terminal event"))).await;
    }
}

enum RunOutcome {
    Cancelled,
    Failed(SanitizedError),
}

async fn run_inner(
    job: &Arc<Job>,
    deps: &RunnerDeps,
    browser: &Arc<dyn BrowserFetcher>,
) -> Result<(), RunOutcome> {
    // INIT
    emit_phase(job, "init", "validating models").await;
    for model in [&job.request.crawl_model, &job.request.pipeline_model, &job.request.reasoning_model] {
        deps.llm
            .validate_model(model)
            .await
            .map_err(|e| RunOutcome::Failed(SanitizedError::new(format!("model validation failed: {e}"))))?;
    }

    browser
        .start()
        .await
        .map_err(|e| RunOutcome::Failed(SanitizedError::new(format!("failed to start browser: {e}"))))?;

    let robots = if job.request.respect_robots_txt {
        load_robots(&deps.client, &job.request.origin).await
    } else {
        RobotsRules::default()
    };

    let effective_delay = Duration::from_millis(
        (job.request.delay_ms as f64).max(robots.crawl_delay_secs.unwrap_or(0.0) * 1000.0) as u64,
    );

    // DISCOVERY
    emit_phase(job, "discovery", "discovering URLs").await;
    let discovered = discovery::discover(
        &deps.client,
        browser,
        &job.request.origin,
        job.request.max_depth,
        job.request.filter_sitemap_by_path,
    )
    .await
    .map_err(|e| RunOutcome::Failed(SanitizedError::new(format!("SSRF check failed: {e}"))))?;

    // FILTER_BASIC
    emit_phase(job, "filter_basic", "applying deterministic filters").await;
    let basic_filtered = filter::filter(&discovered, &job.request.origin, &job.request.language);

    // FILTER_ROBOTS
    emit_phase(job, "filter_robots", "applying robots.txt").await;
    let origin_url = Url::parse(&job.request.origin)
        .map_err(|_| RunOutcome::Failed(SanitizedError::new("origin URL became invalid")))?;
    let base_path = origin_url.path().trim_end_matches('/').to_string();
    let robots_filtered: Vec<String> = basic_filtered
        .into_iter()
        .filter(|u| {
            Url::parse(u).map(|parsed| robots.is_allowed(parsed.path())).unwrap_or(false)
        })
        .collect();

    // FILTER_LLM
    emit_phase(job, "filter_llm", "applying LLM relevance filter").await;
    let final_urls = deps.llm.filter_urls(&robots_filtered, &job.request.crawl_model).await;

    job.progress.pages_total.store(final_urls.len() as u64, Ordering::Release);

    let fetcher = PageFetcher::new(
        deps.client.clone(),
        job.request.use_native_markdown,
        job.request.use_markdown_proxy,
        job.request.proxy_url.clone(),
        browser.clone(),
        deps.converter.clone(),
    );

    let mut written_paths = Vec::new();

    // PAGE_LOOP
    for url in &final_urls {
        if job.is_cancelled() {
            return Err(RunOutcome::Cancelled);
        }

        *job.progress.current_url.write() = Some(url.clone());

        let (raw_markdown, native_tokens, _method) = match fetcher.page_markdown(url).await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("page fetch failed for {url}: {e}");
                job.progress.pages_completed.fetch_add(1, Ordering::AcqRel);
                tokio::time::sleep(effective_delay).await;
                continue;
            }
        };

        let cleaned_input = preclean::preclean(&raw_markdown);
        let chunks = chunk::chunk(&cleaned_input, native_tokens, chunk::DEFAULT_CHUNK_SIZE);

        let mut chunks_failed = 0usize;
        let mut page_body = String::new();
        for piece in &chunks {
            if job.is_cancelled() {
                return Err(RunOutcome::Cancelled);
            }
            let cleaned = if crate::llm::cleanup::needs_cleanup(piece) {
                let result = deps.llm.cleanup(piece, &job.request.pipeline_model).await;
                if result.trim().is_empty() || result == *piece {
                    chunks_failed += 1;
                }
                result
            } else {
                piece.clone()
            };
            page_body.push_str(&cleaned);
            page_body.push('\n');
        }

        let relative = output::relative_path_for_url(url, &base_path);
        let full_path = job.request.output_path.join(&relative);
        if let Some(parent) = full_path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(e) = tokio::fs::write(&full_path, page_body).await {
            log::warn!("failed to write {}: {e}", full_path.display());
        } else {
            written_paths.push(relative);
        }

        if chunks_failed > 0 {
            log::info!("page {url} written with {chunks_failed} chunk(s) falling back to raw content");
        }

        job.progress.pages_completed.fetch_add(1, Ordering::AcqRel);
        emit_phase(
            job,
            "page_loop",
            &format!("completed {url}"),
        )
        .await;

        tokio::time::sleep(effective_delay).await;
    }

    // POSTPROCESS
    emit_phase(job, "postprocess", "writing index").await;
    if let Err(e) = output::write_index(&job.request.output_path, written_paths).await {
        return Err(RunOutcome::Failed(SanitizedError::new(format!("failed to write index: {e}"))));
    }

    Ok(())
}

async fn load_robots(client: &reqwest::Client, origin: &str) -> RobotsRules {
    let Ok(parsed) = Url::parse(origin) else { return RobotsRules::default() };
    let Some(host) = parsed.host_str() else { return RobotsRules::default() };
    let url = format!("{}://{}/robots.txt", parsed.scheme(), host);
    match client.get(&url).timeout(Duration::from_secs(10)).send().await {
        Ok(resp) => match resp.text().await {
            Ok(body) => RobotsRules::parse(&body),
            Err(_) => RobotsRules::default(),
        },
        Err(_) => RobotsRules::default(),
    }
}

async fn emit_phase(job: &Arc<Job>, phase: &str, message: &str) {
    let total = job.progress.pages_total.load(Ordering::Acquire);
    let completed = job.progress.pages_completed.load(Ordering::Acquire);
    job.events
        .publish(Event {
            kind: EventKind::PhaseChange,
            payload: json!({
                "phase": phase,
                "message": message,
                "progress": {"completed": completed, "total": total},
                "level": "info",
            }),
        })
        .await;
}

async fn emit_done(job: &Arc<Job>, status: &str, error: Option<SanitizedError>) {
    let total = job.progress.pages_total.load(Ordering::Acquire);
    let completed = job.progress.pages_completed.load(Ordering::Acquire);
    let mut payload = json!({
        "status": status,
        "pages_total": total,
        "pages_completed": completed,
    });
    if let Some(err) = error {
        payload["error"] = json!(err.message);
    }
    job.events.publish(Event { kind: EventKind::JobDone, payload }).await;
}
