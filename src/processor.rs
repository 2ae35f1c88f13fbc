use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::BatchConfig;
use crate::error::QueueError;
use crate::events::{
    ItemFinishedEvent, ItemStartedEvent, RunCompletedEvent, RunEvent, RunWarningEvent,
};
use crate::queue::MetadataQueue;
use crate::types::{ErrorDetail, ErrorKind, ItemMetadata, ItemStatus, RunSummary};
use crate::CompletionService;

/// Sequential batch processor.
///
/// Drains the queue one item at a time: at most one service call is
/// outstanding at any instant, and items are processed strictly in
/// queue order. Per-item failures never abort a run; the processor
/// settles the item as errored and moves on. A run ends when no
/// pending items remain or the cancellation flag is raised between
/// items.
pub struct Processor<S: CompletionService> {
    service: S,
    cancel: Option<Arc<AtomicBool>>,
    running: AtomicBool,
}

impl<S: CompletionService> Processor<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            cancel: None,
            running: AtomicBool::new(false),
        }
    }

    /// Attach a cooperative cancellation flag, checked between items
    /// only. A dispatched service call is never interrupted.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether a run is currently active on this processor.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Run until the queue has no pending items. See
    /// [`run_with_events`](Self::run_with_events).
    pub async fn run(
        &self,
        queue: &MetadataQueue,
        config: &BatchConfig,
    ) -> Result<RunSummary, QueueError> {
        self.run_with_events(queue, config, |_| {}).await
    }

    /// Run until the queue has no pending items, delivering progress
    /// events to `on_event`.
    ///
    /// The configuration is validated once and snapshotted for the
    /// whole run; later changes never affect items of the active run.
    /// Items enqueued mid-run extend the FIFO and are reached in
    /// order. Returns [`QueueError::RunInProgress`] if a run is
    /// already active on this processor.
    pub async fn run_with_events<F>(
        &self,
        queue: &MetadataQueue,
        config: &BatchConfig,
        mut on_event: F,
    ) -> Result<RunSummary, QueueError>
    where
        F: FnMut(RunEvent),
    {
        config.validate()?;
        let config = config.clone();

        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| QueueError::RunInProgress)?;

        let mut processed: usize = 0;
        let mut completed: usize = 0;
        let mut failed: usize = 0;
        let mut auth_failures: usize = 0;
        let mut rate_limited: usize = 0;
        let mut total_duration_ms: u64 = 0;

        loop {
            if self.cancelled() {
                break;
            }
            let Some(item) = queue.next_pending() else {
                break;
            };

            // Status flips before the call is dispatched so readers
            // see the in-flight item immediately.
            if let Err(e) = queue.mark_processing(&item.id) {
                // Removed between selection and dispatch
                eprintln!(
                    "[stock-metadata-queue] Skipping item {}: {}",
                    item.id, e
                );
                continue;
            }
            on_event(RunEvent::ItemStarted(ItemStartedEvent {
                item_id: item.id.clone(),
                name: item.source.name().to_string(),
            }));

            let started = Instant::now();
            let result = self.service.generate(&item.source, &config).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            total_duration_ms += duration_ms;
            processed += 1;

            let (status, error) = match result {
                Ok(metadata) => match validate_result(&metadata, &config) {
                    Ok(()) => {
                        let mut metadata = metadata;
                        config.apply_affixes(&mut metadata);
                        if let Err(e) = queue.complete_item(&item.id, metadata, duration_ms) {
                            eprintln!(
                                "[stock-metadata-queue] Failed to settle item {}: {}",
                                item.id, e
                            );
                        }
                        completed += 1;
                        (ItemStatus::Completed, None)
                    }
                    Err(detail) => {
                        failed += 1;
                        if let Err(e) = queue.fail_item(&item.id, detail.clone(), duration_ms) {
                            eprintln!(
                                "[stock-metadata-queue] Failed to settle item {}: {}",
                                item.id, e
                            );
                        }
                        (ItemStatus::Error, Some(detail))
                    }
                },
                Err(err) => {
                    let detail = ErrorDetail::new(err.kind(), err.message());
                    match detail.kind {
                        ErrorKind::AuthenticationFailure => {
                            auth_failures += 1;
                            if auth_failures == 1 {
                                on_event(RunEvent::Warning(RunWarningEvent {
                                    kind: detail.kind,
                                    message:
                                        "Authentication failed; remaining items will likely fail with the same credentials"
                                            .to_string(),
                                }));
                            }
                        }
                        ErrorKind::RateLimited => {
                            rate_limited += 1;
                            on_event(RunEvent::Warning(RunWarningEvent {
                                kind: detail.kind,
                                message: detail.message.clone(),
                            }));
                        }
                        _ => {}
                    }
                    failed += 1;
                    if let Err(e) = queue.fail_item(&item.id, detail.clone(), duration_ms) {
                        eprintln!(
                            "[stock-metadata-queue] Failed to settle item {}: {}",
                            item.id, e
                        );
                    }
                    (ItemStatus::Error, Some(detail))
                }
            };

            on_event(RunEvent::ItemFinished(ItemFinishedEvent {
                item_id: item.id.clone(),
                status,
                error,
                duration_ms,
                processed,
                remaining: queue.pending_count(),
            }));

            tokio::time::sleep(config.throttle).await;
        }

        let summary = RunSummary {
            processed,
            completed,
            failed,
            auth_failures,
            rate_limited,
            total_duration_ms,
            avg_duration_ms: if processed > 0 {
                total_duration_ms / processed as u64
            } else {
                0
            },
            finished_at: chrono::Utc::now().to_rfc3339(),
        };
        on_event(RunEvent::RunCompleted(RunCompletedEvent {
            summary: summary.clone(),
        }));

        self.running.store(false, Ordering::SeqCst);
        Ok(summary)
    }
}

/// Check a service result against the active platform profile's
/// required fields.
fn validate_result(metadata: &ItemMetadata, config: &BatchConfig) -> Result<(), ErrorDetail> {
    let profile = config.platform;
    if profile.requires_title() && metadata.title.trim().is_empty() {
        return Err(ErrorDetail::new(
            ErrorKind::EmptyOrInvalidResponse,
            "Response is missing a title",
        ));
    }
    if profile.requires_description() && metadata.description.trim().is_empty() {
        return Err(ErrorDetail::new(
            ErrorKind::EmptyOrInvalidResponse,
            "Response is missing a description",
        ));
    }
    if profile.requires_keywords() && metadata.keywords.is_empty() {
        return Err(ErrorDetail::new(
            ErrorKind::EmptyOrInvalidResponse,
            "Response contains no keywords",
        ));
    }
    Ok(())
}
