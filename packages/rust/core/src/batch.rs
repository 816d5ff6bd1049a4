//! Batch enrichment of a lead list under a concurrency cap.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use icebreaker_discovery::normalize_website;
use icebreaker_shared::{FailureReason, Lead, LeadOutcome, RunId};

use crate::pipeline::LeadPipeline;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Callback trait for batch progress reporting.
pub trait BatchProgress: Send + Sync {
    /// A lead entered the pipeline.
    fn lead_started(&self, lead: &Lead);
    /// A lead reached its outcome; `completed` counts finished leads so far.
    fn lead_finished(&self, completed: usize, total: usize, outcome: &LeadOutcome);
}

/// No-op progress reporter.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn lead_started(&self, _lead: &Lead) {}
    fn lead_finished(&self, _completed: usize, _total: usize, _outcome: &LeadOutcome) {}
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Result of one batch run. Outcomes are in input order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<LeadOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Enrich every lead, at most `concurrency` at a time.
///
/// Invalid leads fail with [`FailureReason::InvalidLead`] without touching
/// the network. Once `cancel` fires, leads in flight and leads not yet
/// started end as [`FailureReason::Cancelled`].
#[instrument(skip_all, fields(leads = leads.len(), concurrency = concurrency))]
pub async fn process_batch(
    pipeline: &LeadPipeline,
    leads: Vec<Lead>,
    concurrency: usize,
    progress: Arc<dyn BatchProgress>,
    cancel: &CancellationToken,
) -> BatchReport {
    let run_id = RunId::new();
    let started_at = Utc::now();
    let total = leads.len();
    info!(%run_id, total, "batch started");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let completed = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::with_capacity(total);

    for lead in leads.iter().cloned() {
        let pipeline = pipeline.clone();
        let sem = semaphore.clone();
        let cancel = cancel.clone();
        let progress = progress.clone();
        let completed = completed.clone();

        handles.push(tokio::spawn(async move {
            let outcome = run_one(&pipeline, lead, &sem, &cancel, progress.as_ref()).await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress.lead_finished(done, total, &outcome);
            outcome
        }));
    }

    let mut outcomes = Vec::with_capacity(total);
    for (handle, lead) in handles.into_iter().zip(leads) {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(email = %lead.email, error = %e, "lead task aborted");
                outcomes.push(cancelled(&lead));
            }
        }
    }

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let failed = outcomes.len() - succeeded;
    info!(%run_id, succeeded, failed, "batch finished");

    BatchReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        succeeded,
        failed,
        outcomes,
    }
}

async fn run_one(
    pipeline: &LeadPipeline,
    lead: Lead,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
    progress: &dyn BatchProgress,
) -> LeadOutcome {
    if let Err(e) = lead.validate() {
        return LeadOutcome::Failure {
            reason: FailureReason::InvalidLead(e.to_string()),
            lead,
        };
    }

    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return cancelled(&lead),
        permit = semaphore.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return cancelled(&lead),
        },
    };

    progress.lead_started(&lead);
    pipeline.process_lead_cancellable(&lead, cancel).await
}

fn cancelled(lead: &Lead) -> LeadOutcome {
    LeadOutcome::Failure {
        reason: FailureReason::Cancelled,
        lead: Lead {
            website: normalize_website(&lead.website),
            ..lead.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::pipeline::{ModelSettings, PipelineOptions};
    use crate::test_support::{StaticFetcher, lead, page_model};

    fn options() -> PipelineOptions {
        PipelineOptions {
            summary: ModelSettings::new("test-summary", 0.5),
            icebreaker: ModelSettings::new("test-icebreaker", 0.5),
            parallel_subpages: false,
        }
    }

    fn page(marker: &str) -> String {
        format!("<html><body><main><p>{marker} builds things.</p></main></body></html>")
    }

    fn lead_for(first_name: &str, website: &str) -> Lead {
        Lead {
            first_name: first_name.into(),
            website: website.into(),
            email: format!("{}@{website}", first_name.to_lowercase()),
            ..lead()
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        started: Mutex<Vec<String>>,
        finished: Mutex<Vec<(usize, usize)>>,
    }

    impl BatchProgress for RecordingProgress {
        fn lead_started(&self, lead: &Lead) {
            self.started.lock().unwrap().push(lead.first_name.clone());
        }

        fn lead_finished(&self, completed: usize, total: usize, _outcome: &LeadOutcome) {
            self.finished.lock().unwrap().push((completed, total));
        }
    }

    #[tokio::test]
    async fn outcomes_keep_input_order_and_counts() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page("https://alpha.io/", page("marker-alpha"))
                .page("https://gamma.io/", page("marker-gamma"))
                .delay("https://alpha.io/", Duration::from_millis(40)),
        );
        let pipeline = LeadPipeline::new(fetcher, Arc::new(page_model()), options());
        let leads = vec![
            lead_for("Ana", "alpha.io"),
            lead_for("Ben", "beta.io"),
            lead_for("Cy", "gamma.io"),
        ];
        let progress = Arc::new(RecordingProgress::default());

        let report = process_batch(
            &pipeline,
            leads,
            2,
            progress.clone(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        let names: Vec<&str> = report
            .outcomes
            .iter()
            .map(|o| o.lead().first_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ana", "Ben", "Cy"]);
        assert_eq!(
            report.outcomes[1].failure_reason(),
            Some(&FailureReason::FetchFailed)
        );
        assert!(report.finished_at >= report.started_at);

        assert_eq!(progress.started.lock().unwrap().len(), 3);
        let mut finished = progress.finished.lock().unwrap().clone();
        finished.sort();
        assert_eq!(finished, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn invalid_leads_fail_without_fetching() {
        let fetcher = Arc::new(StaticFetcher::new());
        let pipeline = LeadPipeline::new(fetcher.clone(), Arc::new(page_model()), options());
        let mut missing_site = lead();
        missing_site.website = "  ".into();

        let report = process_batch(
            &pipeline,
            vec![missing_site],
            4,
            Arc::new(SilentProgress),
            &CancellationToken::new(),
        )
        .await;

        let reason = report.outcomes[0].failure_reason().cloned();
        assert!(matches!(reason, Some(FailureReason::InvalidLead(ref m)) if m.contains("website")));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn cancelled_batch_marks_every_lead_cancelled() {
        let fetcher = Arc::new(StaticFetcher::new().page("https://alpha.io/", page("marker-alpha")));
        let pipeline = LeadPipeline::new(fetcher.clone(), Arc::new(page_model()), options());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = process_batch(
            &pipeline,
            vec![lead_for("Ana", "alpha.io"), lead_for("Ben", "alpha.io")],
            1,
            Arc::new(SilentProgress),
            &cancel,
        )
        .await;

        assert_eq!(report.succeeded, 0);
        assert!(
            report
                .outcomes
                .iter()
                .all(|o| o.failure_reason() == Some(&FailureReason::Cancelled))
        );
        assert_eq!(report.outcomes[0].lead().website, "https://alpha.io");
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn report_serializes_as_camel_case_records() {
        let fetcher = Arc::new(StaticFetcher::new());
        let pipeline = LeadPipeline::new(fetcher, Arc::new(page_model()), options());

        let report = process_batch(
            &pipeline,
            vec![lead()],
            1,
            Arc::new(SilentProgress),
            &CancellationToken::new(),
        )
        .await;

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["runId"].is_string());
        assert!(json["startedAt"].is_string());
        assert_eq!(json["failed"], 1);
        assert_eq!(json["outcomes"][0]["success"], false);
        assert_eq!(json["outcomes"][0]["error"], "Failed to fetch website");
        assert_eq!(json["outcomes"][0]["lead"]["website"], "https://grioagency.com");
    }
}
