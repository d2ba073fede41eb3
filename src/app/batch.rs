//! Sequential batch orchestration
//!
//! [`BatchController`] drives the whole export: it iterates the work source
//! in order, and per item reveals the detail view, waits for the download
//! locator to resolve, hands the transfer to [`ResilientTransfer`], collapses
//! the view again and settles before moving on. Cancellation is cooperative,
//! observed once per iteration boundary; an in-flight transfer always runs to
//! completion first. Per-item failures are recorded and never abort the run.
//!
//! Execution is strictly sequential: at most one wait or transfer is in
//! flight at any time, preserving the one-expanded-row invariant of the
//! underlying UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::app::presentation::Presentation;
use crate::app::source::{ResourceResolver, WorkSource};
use crate::app::template::FilenameTemplate;
use crate::app::transfer::{ResilientTransfer, TransferConfig};
use crate::app::transport::{TransferRequest, Transport};
use crate::app::wait::{wait_for, WaitConfig};
use crate::constants::{batch, messages};
use crate::errors::{BatchError, ItemResult};

/// Configuration of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Wait parameters for locator resolution
    pub wait: WaitConfig,
    /// Retry parameters for artifact transfers
    pub transfer: TransferConfig,
    /// Delay after collapsing an item before the next reveal
    pub settle_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            wait: WaitConfig::default(),
            transfer: TransferConfig::default(),
            settle_delay: batch::SETTLE_DELAY,
        }
    }
}

impl BatchConfig {
    /// Fast preset for tests
    pub fn testing() -> Self {
        Self {
            wait: WaitConfig::testing(),
            transfer: TransferConfig::testing(),
            settle_delay: Duration::from_millis(1),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        self.transfer.validate()
    }
}

/// Mutable state of one batch run, owned by the run itself
///
/// Only the two control flags need cross-task visibility (the activation
/// control fires from the embedding task); they live as atomics on the
/// controller instead.
#[derive(Debug)]
struct BatchState {
    processed: usize,
    total: usize,
    errors: Vec<String>,
}

impl BatchState {
    fn new(total: usize) -> Self {
        Self {
            processed: 0,
            total,
            errors: Vec::new(),
        }
    }
}

/// Final result of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items attempted (successes and recorded failures alike)
    pub processed: usize,
    /// Items the source reported at batch start
    pub total: usize,
    /// Aggregate error entries, in source order
    pub errors: Vec<String>,
    /// Whether the run stopped on a cancellation request
    pub cancelled: bool,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Total run duration
    pub duration: Duration,
}

impl BatchSummary {
    /// Whether every attempted item succeeded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Shared handle for requesting cooperative cancellation
///
/// Cloneable and cheap; the embedding can hold one to cancel a running batch
/// from shutdown paths without going through the activation toggle.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation; takes effect at the next iteration boundary
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sequential export state machine
pub struct BatchController {
    source: Arc<dyn WorkSource>,
    resolver: Arc<dyn ResourceResolver>,
    transfer: ResilientTransfer,
    presentation: Arc<dyn Presentation>,
    template: Arc<RwLock<FilenameTemplate>>,
    config: BatchConfig,
    running: AtomicBool,
    cancel_requested: Arc<AtomicBool>,
}

impl BatchController {
    /// Create a controller over the given collaborators
    ///
    /// `template` is the shared handle owned by the preference controller;
    /// each run reads it once at start, so an edit during a run only affects
    /// the next one.
    pub fn new(
        source: Arc<dyn WorkSource>,
        resolver: Arc<dyn ResourceResolver>,
        transport: Arc<dyn Transport>,
        presentation: Arc<dyn Presentation>,
        template: Arc<RwLock<FilenameTemplate>>,
        config: BatchConfig,
    ) -> Self {
        let transfer = ResilientTransfer::new(transport, config.transfer.clone());
        Self {
            source,
            resolver,
            transfer,
            presentation,
            template,
            config,
            running: AtomicBool::new(false),
            cancel_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a batch run is currently in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Handle for requesting cancellation of the current run
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancel_requested.clone())
    }

    /// Dual-purpose activation: start a run when idle, request cancellation
    /// of the in-progress run otherwise
    ///
    /// Returns `Ok(None)` when the activation was interpreted as a
    /// cancellation request.
    pub async fn activate(&self) -> Result<Option<BatchSummary>, BatchError> {
        if self.is_running() {
            info!("activation while running, requesting cancellation");
            self.cancel_handle().request();
            return Ok(None);
        }
        self.run().await.map(Some)
    }

    /// Run one batch to completion (exhaustion or cancellation)
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::AlreadyRunning`] when a run is in flight, or
    /// [`BatchError::Unexpected`] for failures outside the per-item guard.
    /// State returns to idle in every case.
    pub async fn run(&self) -> Result<BatchSummary, BatchError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BatchError::AlreadyRunning);
        }

        let outcome = self.run_batch().await;
        let result = self.report(outcome).await;

        self.cancel_requested.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.presentation.set_trigger_label(messages::IDLE_LABEL).await;

        result
    }

    async fn run_batch(&self) -> Result<BatchSummary, BatchError> {
        let started_at = Utc::now();
        let started = Instant::now();

        let total = self
            .source
            .count()
            .await
            .map_err(|e| BatchError::Unexpected {
                message: e.to_string(),
            })?;
        let template = self.template.read().await.clone();

        info!(total, template = %template, "starting batch export");
        let mut state = BatchState::new(total);
        let mut cancelled = false;

        for index in 0..total {
            if self.cancel_requested.load(Ordering::SeqCst) {
                info!(
                    processed = state.processed,
                    total, "cancellation observed, stopping iteration"
                );
                cancelled = true;
                break;
            }

            match self.process_item(index, &template).await {
                Ok(()) => debug!(index, "item exported"),
                Err(e) => {
                    warn!(index, error = %e, "item failed");
                    state
                        .errors
                        .push(messages::item_error(index + 1, &e.to_string()));
                }
            }

            // Progress reflects attempts, not successes
            state.processed += 1;
            self.presentation
                .set_trigger_label(&messages::progress_label(state.processed, state.total))
                .await;
        }

        Ok(BatchSummary {
            processed: state.processed,
            total: state.total,
            errors: state.errors,
            cancelled,
            started_at,
            duration: started.elapsed(),
        })
    }

    /// Process a single item; any error here is recorded, not fatal
    async fn process_item(&self, index: usize, template: &FilenameTemplate) -> ItemResult<()> {
        let fields = self.source.read_fields(index).await?;
        let destination_name = template.format(&fields);
        debug!(index, name = %destination_name, "processing item");

        self.source.toggle_detail(index).await?;

        let result = self.resolve_and_transfer(index, destination_name).await;

        // The detail view is a toggle: collapse exactly when the reveal
        // succeeded, also after a failed resolve or transfer. A collapse
        // failure is logged, never recorded as an item error.
        if let Err(e) = self.source.toggle_detail(index).await {
            debug!(index, error = %e, "collapse failed");
        }
        tokio::time::sleep(self.config.settle_delay).await;

        result
    }

    async fn resolve_and_transfer(&self, index: usize, destination_name: String) -> ItemResult<()> {
        let url = wait_for(|| self.resolver.try_resolve(index), &self.config.wait).await?;

        let request = TransferRequest {
            url,
            destination_name,
        };
        self.transfer.transfer(&request).await?;
        Ok(())
    }

    async fn report(
        &self,
        outcome: Result<BatchSummary, BatchError>,
    ) -> Result<BatchSummary, BatchError> {
        match outcome {
            Ok(summary) => {
                if summary.is_clean() {
                    info!(
                        processed = summary.processed,
                        total = summary.total,
                        cancelled = summary.cancelled,
                        "batch completed without errors"
                    );
                    self.presentation.notify(messages::ALL_SUCCESSFUL).await;
                } else {
                    // Full detail goes to the diagnostic log, only the count
                    // to the operator
                    for entry in &summary.errors {
                        error!("{entry}");
                    }
                    self.presentation
                        .notify(&messages::completed_with_errors(summary.errors.len()))
                        .await;
                }
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "batch aborted outside the per-item guard");
                let message = match &e {
                    BatchError::Unexpected { message } => message.clone(),
                    other => other.to_string(),
                };
                self.presentation
                    .notify(&messages::unexpected_error(&message))
                    .await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use url::Url;

    use crate::app::source::DocumentFields;
    use crate::app::transport::TransportSignal;
    use crate::errors::ExtractionError;

    fn doc(index: usize) -> DocumentFields {
        DocumentFields {
            day: "01".to_string(),
            month: "02".to_string(),
            year: "2024".to_string(),
            category: "Konto".to_string(),
            subject: format!("Dokument {index}"),
        }
    }

    /// Scripted in-memory work source recording every toggle
    struct MockSource {
        items: Vec<Result<DocumentFields, ExtractionError>>,
        count_error: Option<ExtractionError>,
        toggles: Mutex<Vec<usize>>,
    }

    impl MockSource {
        fn of(count: usize) -> Self {
            Self {
                items: (0..count).map(|i| Ok(doc(i))).collect(),
                count_error: None,
                toggles: Mutex::new(Vec::new()),
            }
        }

        fn failing_item(count: usize, failing: usize) -> Self {
            let mut source = Self::of(count);
            source.items[failing] = Err(ExtractionError::MissingField { field: "betreff" });
            source
        }

        fn toggles(&self) -> Vec<usize> {
            self.toggles.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkSource for MockSource {
        async fn count(&self) -> Result<usize, ExtractionError> {
            match &self.count_error {
                Some(e) => Err(e.clone()),
                None => Ok(self.items.len()),
            }
        }

        async fn read_fields(&self, index: usize) -> Result<DocumentFields, ExtractionError> {
            self.items[index].clone()
        }

        async fn toggle_detail(&self, index: usize) -> Result<(), ExtractionError> {
            self.toggles.lock().unwrap().push(index);
            Ok(())
        }
    }

    /// Resolver that is immediately ready, except for listed indices which
    /// never resolve
    struct MockResolver {
        never_resolves: Vec<usize>,
    }

    impl MockResolver {
        fn ready() -> Self {
            Self {
                never_resolves: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ResourceResolver for MockResolver {
        async fn try_resolve(&self, index: usize) -> Option<Url> {
            if self.never_resolves.contains(&index) {
                return None;
            }
            Url::parse(&format!("https://example.com/doc/{index}/download")).ok()
        }
    }

    /// Transport scripted per destination name, with an optional gate that
    /// blocks the first attempt until released
    #[derive(Default)]
    struct MockTransport {
        failing_names: Vec<String>,
        attempts: Mutex<Vec<String>>,
        gate_first_attempt: Option<Arc<Notify>>,
        calls: AtomicU32,
    }

    impl MockTransport {
        fn succeeding() -> Self {
            Self::default()
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn attempt(&self, request: &TransferRequest) -> TransportSignal {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(gate) = &self.gate_first_attempt {
                    gate.notified().await;
                }
            }
            self.attempts
                .lock()
                .unwrap()
                .push(request.destination_name.clone());
            if self.failing_names.contains(&request.destination_name) {
                TransportSignal::Failed {
                    cause: "HTTP 500".to_string(),
                }
            } else {
                TransportSignal::Completed { status: 200 }
            }
        }
    }

    /// Presentation recording labels and notifications in call order
    #[derive(Default)]
    struct RecordingPresentation {
        labels: Mutex<Vec<String>>,
        notifications: Mutex<Vec<String>>,
    }

    impl RecordingPresentation {
        fn labels(&self) -> Vec<String> {
            self.labels.lock().unwrap().clone()
        }

        fn notifications(&self) -> Vec<String> {
            self.notifications.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Presentation for RecordingPresentation {
        async fn set_trigger_label(&self, label: &str) {
            self.labels.lock().unwrap().push(label.to_string());
        }

        async fn notify(&self, message: &str) {
            self.notifications.lock().unwrap().push(message.to_string());
        }

        async fn prompt(&self, _message: &str, _current: &str) -> Option<String> {
            None
        }
    }

    struct Fixture {
        source: Arc<MockSource>,
        transport: Arc<MockTransport>,
        presentation: Arc<RecordingPresentation>,
        controller: Arc<BatchController>,
    }

    fn fixture(source: MockSource, resolver: MockResolver, transport: MockTransport) -> Fixture {
        let source = Arc::new(source);
        let transport = Arc::new(transport);
        let presentation = Arc::new(RecordingPresentation::default());
        let controller = Arc::new(BatchController::new(
            source.clone(),
            Arc::new(resolver),
            transport.clone(),
            presentation.clone(),
            Arc::new(RwLock::new(FilenameTemplate::default())),
            BatchConfig::testing(),
        ));
        Fixture {
            source,
            transport,
            presentation,
            controller,
        }
    }

    /// A clean run processes every item in order, reports unqualified
    /// success and restores the idle label.
    #[tokio::test(start_paused = true)]
    async fn test_clean_run() {
        let f = fixture(
            MockSource::of(3),
            MockResolver::ready(),
            MockTransport::succeeding(),
        );

        let summary = f.controller.run().await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.total, 3);
        assert!(summary.is_clean());
        assert!(!summary.cancelled);
        assert_eq!(
            f.transport.attempts(),
            vec![
                "01.02.2024_Konto_Dokument_0.pdf",
                "01.02.2024_Konto_Dokument_1.pdf",
                "01.02.2024_Konto_Dokument_2.pdf",
            ]
        );
        assert_eq!(
            f.presentation.notifications(),
            vec![messages::ALL_SUCCESSFUL]
        );
        assert_eq!(
            f.presentation.labels().last().map(String::as_str),
            Some(messages::IDLE_LABEL)
        );
        assert!(!f.controller.is_running());
    }

    /// Progress labels count attempts and the trigger is restored at the end.
    #[tokio::test(start_paused = true)]
    async fn test_progress_labels() {
        let f = fixture(
            MockSource::of(2),
            MockResolver::ready(),
            MockTransport::succeeding(),
        );

        f.controller.run().await.unwrap();

        assert_eq!(
            f.presentation.labels(),
            vec![
                messages::progress_label(1, 2),
                messages::progress_label(2, 2),
                messages::IDLE_LABEL.to_string(),
            ]
        );
    }

    /// Error isolation: one item failing extraction yields exactly one
    /// 1-based error entry while every item still counts as processed.
    #[tokio::test(start_paused = true)]
    async fn test_error_isolation() {
        let f = fixture(
            MockSource::failing_item(5, 2),
            MockResolver::ready(),
            MockTransport::succeeding(),
        );

        let summary = f.controller.run().await.unwrap();

        assert_eq!(summary.processed, 5);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Fehler bei Dokument 3:"));
        // The failing item was never revealed, so it was never toggled;
        // every other item gets a reveal/collapse pair.
        assert_eq!(f.source.toggles(), vec![0, 0, 1, 1, 3, 3, 4, 4]);
    }

    /// Two items, the first failing its transfer permanently: one error,
    /// both counted, partial-failure summary notification.
    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_summary() {
        let transport = MockTransport {
            failing_names: vec!["01.02.2024_Konto_Dokument_0.pdf".to_string()],
            ..MockTransport::default()
        };
        let f = fixture(MockSource::of(2), MockResolver::ready(), transport);

        let summary = f.controller.run().await.unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Fehler bei Dokument 1:"));
        assert_eq!(
            f.presentation.notifications(),
            vec![messages::completed_with_errors(1)]
        );
        // Retries exhausted for the first item, single attempt for the second
        assert_eq!(f.transport.attempts().len(), 3 + 1);
        // A failed transfer still collapses the revealed item
        assert_eq!(f.source.toggles(), vec![0, 0, 1, 1]);
    }

    /// A never-resolving locator times out, is recorded for that item only,
    /// and the batch continues.
    #[tokio::test(start_paused = true)]
    async fn test_resolve_timeout_is_per_item() {
        let resolver = MockResolver {
            never_resolves: vec![0],
        };
        let f = fixture(MockSource::of(2), resolver, MockTransport::succeeding());

        let summary = f.controller.run().await.unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Fehler bei Dokument 1:"));
        assert_eq!(
            f.transport.attempts(),
            vec!["01.02.2024_Konto_Dokument_1.pdf"]
        );
    }

    /// Dual-purpose activation: a second activation while running requests
    /// cancellation; items up to the current one complete, none after start.
    #[tokio::test(start_paused = true)]
    async fn test_activation_while_running_cancels() {
        let gate = Arc::new(Notify::new());
        let transport = MockTransport {
            gate_first_attempt: Some(gate.clone()),
            ..MockTransport::default()
        };
        let f = fixture(MockSource::of(4), MockResolver::ready(), transport);

        let controller = f.controller.clone();
        let run = tokio::spawn(async move { controller.activate().await });

        // Let the run reach the gated first transfer
        while !f.controller.is_running() {
            tokio::task::yield_now().await;
        }
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        // Second activation is interpreted as a cancellation request
        let second = f.controller.activate().await.unwrap();
        assert!(second.is_none());

        gate.notify_one();
        let summary = run.await.unwrap().unwrap().unwrap();

        // The in-flight item ran to completion, nothing after it started
        assert_eq!(summary.processed, 1);
        assert!(summary.cancelled);
        assert!(summary.is_clean());
        assert_eq!(f.transport.attempts().len(), 1);
        assert!(!f.controller.is_running());
        assert!(!f.controller.cancel_handle().is_requested());
    }

    /// Cancellation through the handle stops at the next iteration boundary.
    #[tokio::test(start_paused = true)]
    async fn test_cancel_handle_is_observed_at_boundary() {
        let f = fixture(
            MockSource::of(3),
            MockResolver::ready(),
            MockTransport::succeeding(),
        );

        f.controller.cancel_handle().request();
        let summary = f.controller.run().await.unwrap();

        assert_eq!(summary.processed, 0);
        assert!(summary.cancelled);
        assert!(f.transport.attempts().is_empty());
    }

    /// A failure outside the per-item guard aborts the run, is reported
    /// distinctly and still resets state to idle.
    #[tokio::test(start_paused = true)]
    async fn test_unexpected_failure_resets_state() {
        let source = MockSource {
            count_error: Some(ExtractionError::Interaction {
                message: "grid not rendered".to_string(),
            }),
            ..MockSource::of(0)
        };
        let f = fixture(source, MockResolver::ready(), MockTransport::succeeding());

        let result = f.controller.run().await;

        assert!(matches!(result, Err(BatchError::Unexpected { .. })));
        assert_eq!(
            f.presentation.notifications(),
            vec![messages::unexpected_error(
                "source interaction failed: grid not rendered"
            )]
        );
        assert_eq!(
            f.presentation.labels(),
            vec![messages::IDLE_LABEL.to_string()]
        );
        assert!(!f.controller.is_running());
    }

    /// A second `run` call while one is in flight is rejected.
    #[tokio::test(start_paused = true)]
    async fn test_run_while_running_is_rejected() {
        let gate = Arc::new(Notify::new());
        let transport = MockTransport {
            gate_first_attempt: Some(gate.clone()),
            ..MockTransport::default()
        };
        let f = fixture(MockSource::of(1), MockResolver::ready(), transport);

        let controller = f.controller.clone();
        let run = tokio::spawn(async move { controller.run().await });
        while !f.controller.is_running() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            f.controller.run().await,
            Err(BatchError::AlreadyRunning)
        ));

        gate.notify_one();
        run.await.unwrap().unwrap();
    }

    /// The template in effect at run start is used for every item of the run.
    #[tokio::test(start_paused = true)]
    async fn test_template_read_at_run_start() {
        let template = Arc::new(RwLock::new(
            FilenameTemplate::parse("YYYY-MM-DD ART BETREFF").unwrap(),
        ));
        let source = Arc::new(MockSource::of(1));
        let transport = Arc::new(MockTransport::succeeding());
        let controller = BatchController::new(
            source,
            Arc::new(MockResolver::ready()),
            transport.clone(),
            Arc::new(RecordingPresentation::default()),
            template,
            BatchConfig::testing(),
        );

        controller.run().await.unwrap();
        assert_eq!(
            transport.attempts(),
            vec!["2024-02-01 Konto Dokument_0.pdf"]
        );
    }

    #[test]
    fn test_config_presets() {
        assert!(BatchConfig::default().validate().is_ok());
        assert!(BatchConfig::testing().validate().is_ok());
        assert!(BatchConfig::default().settle_delay > BatchConfig::testing().settle_delay);
    }

    #[test]
    fn test_summary_accounting() {
        let summary = BatchSummary {
            processed: 2,
            total: 2,
            errors: vec!["Fehler bei Dokument 1: x".to_string()],
            cancelled: false,
            started_at: Utc::now(),
            duration: Duration::from_secs(1),
        };
        assert!(!summary.is_clean());
    }
}
