//! Lead enrichment: page summaries, icebreaker synthesis and the pipelines
//! that drive them.
//!
//! This crate ties together discovery, fetching and text extraction into the
//! per-lead [`LeadPipeline`] and the multi-lead [`process_batch`] runner.

pub mod batch;
pub mod llm;
pub mod pipeline;
pub mod summarize;
pub mod synthesize;

#[cfg(test)]
mod test_support;

pub use batch::{BatchProgress, BatchReport, SilentProgress, process_batch};
pub use llm::{ChatMessage, ChatModel, ChatRequest, OpenRouterClient};
pub use pipeline::{LeadPipeline, ModelSettings, PipelineOptions, PipelineStage};
pub use summarize::{NO_CONTENT_SENTINEL, PageAbstract, summarize_page};
pub use synthesize::{ICEBREAKER_TEMPLATE, synthesize_icebreaker};
