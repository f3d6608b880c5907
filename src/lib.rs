//! doccrawl: turns a documentation site's root URL into a local tree of
//! cleaned Markdown files, driven by a per-job pipeline with a live
//! progress event stream.

pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod llm;
pub mod orchestrator;
pub mod url_safety;
pub mod utils;
