//! Per-lead enrichment pipeline.
//!
//! `FetchHome → DiscoverLinks → (FetchHomeFallback | FetchSubpages) →
//! Summarize → Synthesize`. Each stage yields an `Option`; the first empty
//! result that cannot be recovered from ends the lead with a
//! [`FailureReason`]. Nothing in here returns `Err` or panics for an
//! expected condition.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use icebreaker_crawler::PageFetcher;
use icebreaker_discovery::{discover_links, normalize_website};
use icebreaker_markdown::extract_text;
use icebreaker_shared::{AppConfig, FailureReason, Lead, LeadOutcome};

use crate::llm::ChatModel;
use crate::summarize::{PageAbstract, summarize_page};
use crate::synthesize::synthesize_icebreaker;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Model id and sampling temperature for one kind of call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
        }
    }
}

/// Runtime options for [`LeadPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Settings for per-page abstracts.
    pub summary: ModelSettings,
    /// Settings for the final icebreaker.
    pub icebreaker: ModelSettings,
    /// Fetch and summarize sub-pages concurrently.
    pub parallel_subpages: bool,
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            summary: ModelSettings::new(&config.llm.summary_model, config.llm.summary_temperature),
            icebreaker: ModelSettings::new(
                &config.llm.icebreaker_model,
                config.llm.icebreaker_temperature,
            ),
            parallel_subpages: config.defaults.parallel_subpages,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Where a lead is in the pipeline. Used for stage-transition logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    FetchHome,
    DiscoverLinks,
    FetchHomeFallback,
    FetchSubpages,
    Summarize,
    Synthesize,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FetchHome => "fetch_home",
            Self::DiscoverLinks => "discover_links",
            Self::FetchHomeFallback => "fetch_home_fallback",
            Self::FetchSubpages => "fetch_subpages",
            Self::Summarize => "summarize",
            Self::Synthesize => "synthesize",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LeadPipeline
// ---------------------------------------------------------------------------

/// Enriches one lead at a time. Cheap to clone; holds only shared handles.
#[derive(Clone)]
pub struct LeadPipeline {
    fetcher: Arc<dyn PageFetcher>,
    model: Arc<dyn ChatModel>,
    options: PipelineOptions,
}

impl fmt::Debug for LeadPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeadPipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl LeadPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        model: Arc<dyn ChatModel>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            model,
            options,
        }
    }

    /// Run the full pipeline for one lead.
    #[instrument(skip_all, fields(email = %lead.email, website = %lead.website))]
    pub async fn process_lead(&self, lead: &Lead) -> LeadOutcome {
        let lead = with_normalized_website(lead);
        info!(website = %lead.website, "processing lead");

        match self.enrich(&lead).await {
            Ok((icebreaker, pages_used)) => {
                info!(pages_used, "icebreaker generated");
                LeadOutcome::Success {
                    icebreaker,
                    lead,
                    pages_used,
                }
            }
            Err(reason) => {
                info!(reason = reason.code(), "lead failed");
                LeadOutcome::Failure { reason, lead }
            }
        }
    }

    /// [`process_lead`](Self::process_lead), abandoned as soon as `cancel` fires.
    ///
    /// In-flight fetches and model calls are dropped; the outcome is then
    /// [`FailureReason::Cancelled`], never a partial success.
    pub async fn process_lead_cancellable(
        &self,
        lead: &Lead,
        cancel: &CancellationToken,
    ) -> LeadOutcome {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(email = %lead.email, "lead cancelled");
                LeadOutcome::Failure {
                    reason: FailureReason::Cancelled,
                    lead: with_normalized_website(lead),
                }
            }
            outcome = self.process_lead(lead) => outcome,
        }
    }

    async fn enrich(&self, lead: &Lead) -> Result<(String, usize), FailureReason> {
        enter_stage(PipelineStage::FetchHome);
        let base = match Url::parse(&lead.website) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "website is not a valid URL");
                return Err(FailureReason::FetchFailed);
            }
        };
        let home_html = self
            .fetcher
            .fetch(&base)
            .await
            .ok_or(FailureReason::FetchFailed)?;

        enter_stage(PipelineStage::DiscoverLinks);
        let links = discover_links(&home_html, base.as_str());

        let abstracts: Vec<PageAbstract> = if links.is_empty() {
            enter_stage(PipelineStage::FetchHomeFallback);
            self.summarize_html(&base, &home_html).await.into_iter().collect()
        } else {
            enter_stage(PipelineStage::FetchSubpages);
            self.summarize_subpages(&base, &links).await
        };

        if abstracts.is_empty() {
            return Err(FailureReason::NoContent);
        }

        enter_stage(PipelineStage::Synthesize);
        let icebreaker = synthesize_icebreaker(
            self.model.as_ref(),
            &self.options.icebreaker,
            lead,
            &abstracts,
        )
        .await
        .ok_or(FailureReason::SynthesisFailed)?;

        Ok((icebreaker, abstracts.len()))
    }

    /// Abstracts for every sub-page that yields one, in link order.
    async fn summarize_subpages(&self, base: &Url, links: &[String]) -> Vec<PageAbstract> {
        let targets: Vec<Url> = links
            .iter()
            .filter_map(|path| match base.join(path) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(%path, error = %e, "could not resolve link");
                    None
                }
            })
            .collect();

        if self.options.parallel_subpages {
            join_all(targets.iter().map(|url| self.fetch_and_summarize(url)))
                .await
                .into_iter()
                .flatten()
                .collect()
        } else {
            let mut abstracts = Vec::with_capacity(targets.len());
            for url in &targets {
                if let Some(summary) = self.fetch_and_summarize(url).await {
                    abstracts.push(summary);
                }
            }
            abstracts
        }
    }

    async fn fetch_and_summarize(&self, url: &Url) -> Option<PageAbstract> {
        let Some(html) = self.fetcher.fetch(url).await else {
            debug!(%url, "sub-page unavailable, skipping");
            return None;
        };
        self.summarize_html(url, &html).await
    }

    async fn summarize_html(&self, url: &Url, html: &str) -> Option<PageAbstract> {
        let text = extract_text(html);
        if text.trim().is_empty() {
            debug!(%url, "page has no readable text, skipping");
            return None;
        }

        enter_stage(PipelineStage::Summarize);
        summarize_page(
            self.model.as_ref(),
            &self.options.summary,
            url.as_str(),
            &text,
        )
        .await
    }
}

fn enter_stage(stage: PipelineStage) {
    debug!(stage = stage.as_str(), "entering stage");
}

fn with_normalized_website(lead: &Lead) -> Lead {
    Lead {
        website: normalize_website(&lead.website),
        ..lead.clone()
    }
}
