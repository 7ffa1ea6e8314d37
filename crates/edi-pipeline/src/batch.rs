//! Concurrent batch runs
//!
//! Every request of a batch runs on its own task. A semaphore sized by
//! `max_concurrency` bounds how many extractions are in flight; outcomes are
//! returned in request order whatever order the tasks finish in. A failed
//! request does not stop the others.

use std::sync::Arc;
use std::time::{Duration, Instant};

use edi_extract::{MarkupSource, MessageRequest};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::pipeline::{Pipeline, RunResult};
use crate::{Error, Result};

/// Outcome of one request in a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub request: MessageRequest,
    pub result: Result<RunResult>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Counts over a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_lines: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut summary, outcome| {
            match &outcome.result {
                Ok(run) => {
                    summary.succeeded += 1;
                    summary.skipped_lines += run.skipped;
                }
                Err(_) => summary.failed += 1,
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Runs batches of message requests against one markup source
pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    source: Arc<dyn MarkupSource>,
    semaphore: Arc<Semaphore>,
}

impl BatchRunner {
    pub fn new(pipeline: Pipeline, source: Arc<dyn MarkupSource>) -> Self {
        let permits = pipeline.config().max_concurrency.max(1);
        Self {
            pipeline: Arc::new(pipeline),
            source,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run every request, returning outcomes in request order
    pub async fn run(&self, requests: Vec<MessageRequest>) -> Vec<BatchOutcome> {
        let started = Instant::now();
        let total = requests.len();

        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let pipeline = Arc::clone(&self.pipeline);
                let source = Arc::clone(&self.source);
                let semaphore = Arc::clone(&self.semaphore);
                let task_request = request.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| Error::Batch(format!("Semaphore error: {}", e)))?;
                    debug!("Running {} {}", task_request.revision, task_request.document);
                    tokio::task::spawn_blocking(move || pipeline.run(&task_request, source.as_ref()))
                        .await
                        .map_err(|e| Error::Batch(format!("Extraction task failed: {}", e)))?
                });
                (request, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(total);
        for (request, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::Batch(format!("Task failed: {}", e))),
            };
            if let Err(e) = &result {
                warn!("{} {} failed: {}", request.revision, request.document, e);
            }
            outcomes.push(BatchOutcome { request, result });
        }

        log_summary(&outcomes, started.elapsed());
        outcomes
    }
}

fn log_summary(outcomes: &[BatchOutcome], elapsed: Duration) {
    let summary = BatchSummary::from_outcomes(outcomes);
    info!(
        "Batch finished in {:?}: {} of {} succeeded, {} failed, {} lines skipped",
        elapsed,
        summary.succeeded,
        summary.total(),
        summary.failed,
        summary.skipped_lines
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineConfig;
    use edi_extract::MemorySource;

    fn listing(tag: &str) -> String {
        format!(
            r#"<div class="isotope-container"><h3 class="deep"><a>{tag}</a></h3><span>M(1)</span><p>{tag}</p></div>"#
        )
    }

    fn source() -> Arc<dyn MarkupSource> {
        Arc::new(
            MemorySource::new()
                .with_listing("D97A", "ORDERS", &listing("BGM"))
                .with_listing("D97A", "INVOIC", &listing("BGM"))
                .with_listing("D97A", "DESADV", &listing("BGM"))
                .with_segment("D97A", "BGM", "1004 Document identifier  M  1 an..35"),
        )
    }

    #[tokio::test]
    async fn test_outcomes_follow_request_order() {
        let runner = BatchRunner::new(Pipeline::new(PipelineConfig::new().max_concurrency(2)), source());
        let documents = ["ORDERS", "INVOIC", "DESADV"];
        let requests = documents
            .iter()
            .map(|doc| MessageRequest::new("EDIFACT", "D97A", *doc))
            .collect();

        let outcomes = runner.run(requests).await;
        assert_eq!(outcomes.len(), 3);
        for (outcome, document) in outcomes.iter().zip(documents) {
            assert_eq!(outcome.request.document, document);
            assert!(outcome.is_success());
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let runner = BatchRunner::new(Pipeline::default(), source());
        let requests = vec![
            MessageRequest::new("EDIFACT", "D97A", "ORDERS"),
            MessageRequest::new("EDIFACT", "D97A", "IFTMIN"),
            MessageRequest::new("TRADACOMS", "D97A", "INVOIC"),
        ];

        let outcomes = runner.run(requests).await;
        assert!(outcomes[0].is_success());
        assert!(matches!(outcomes[1].result, Err(Error::Extract(_))));
        assert!(matches!(outcomes[2].result, Err(Error::Format(_))));

        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary, BatchSummary { succeeded: 1, failed: 2, skipped_lines: 0 });
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let runner = BatchRunner::new(Pipeline::default(), source());
        assert!(runner.run(Vec::new()).await.is_empty());
    }
}
