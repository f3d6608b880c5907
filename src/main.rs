//! CLI driver: runs a single crawl job to completion against the
//! registry, printing its event stream to stdout.
//!
//! This is not the HTTP/SSE transport layer (out of scope for this
//! crate) — it's a local stand-in that consumes the job registry the
//! same way a transport would.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use doccrawl::config::{JobRequest, ProviderConfig};
use doccrawl::fetch::browser::ChromiumBrowser;
use doccrawl::fetch::markdown::HtmdConverter;
use doccrawl::llm::LlmGateway;
use doccrawl::orchestrator::{JobRegistry, RunnerDeps};

#[derive(Parser)]
#[command(name = "doccrawl", about = "Crawl a documentation site into local Markdown")]
struct Cli {
    /// Root URL of the documentation site.
    origin: String,

    /// Output directory, resolved under DOCCRAWL_DATA_ROOT (default /data).
    #[arg(long, default_value = "out")]
    output: PathBuf,

    /// Model used for the LLM URL-relevance filter.
    #[arg(long, default_value = "llama3")]
    crawl_model: String,

    /// Model used for chunk cleanup.
    #[arg(long, default_value = "llama3")]
    pipeline_model: String,

    /// Model validated at startup but not otherwise dispatched by this driver.
    #[arg(long, default_value = "llama3")]
    reasoning_model: String,

    #[arg(long, default_value_t = 1000)]
    delay_ms: u32,

    #[arg(long, default_value_t = 5)]
    max_depth: u8,

    #[arg(long, default_value = "all")]
    language: String,

    #[arg(long, default_value_t = true)]
    respect_robots_txt: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let provider_config = ProviderConfig::from_env();
    let client = reqwest::Client::new();
    let llm = Arc::new(LlmGateway::new(client.clone(), provider_config.clone()));
    let converter: Arc<dyn doccrawl::fetch::markdown::MarkdownConverter> = Arc::new(HtmdConverter::new());

    let deps = RunnerDeps {
        client,
        llm,
        converter,
        browser_factory: Arc::new(|| {
            Arc::new(ChromiumBrowser::new()) as Arc<dyn doccrawl::fetch::browser::BrowserFetcher>
        }),
    };

    let registry = JobRegistry::new(deps);

    let request = JobRequest {
        origin: cli.origin,
        crawl_model: cli.crawl_model,
        pipeline_model: cli.pipeline_model,
        reasoning_model: cli.reasoning_model,
        output_path: cli.output,
        delay_ms: cli.delay_ms,
        max_concurrent: 1,
        max_depth: cli.max_depth,
        respect_robots_txt: cli.respect_robots_txt,
        use_native_markdown: true,
        use_markdown_proxy: false,
        filter_sitemap_by_path: true,
        proxy_url: None,
        language: cli.language,
    };

    let job = registry.create(request, &provider_config.data_root).context("failed to create job")?;
    let mut events = job.events.subscribe();

    // event_stream (spec.md §4.6): dequeue with a 20s keepalive timeout,
    // synthesizing a terminal event if the runner task has died without
    // publishing one itself.
    while let Some(event) = job.next_event(&mut events).await {
        println!("{}", serde_json::to_string(&event)?);
        if event.is_terminal() {
            break;
        }
    }

    Ok(())
}
