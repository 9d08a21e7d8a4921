//! Upload lifecycle
//!
//! [`UploadController`] drives one submission at a time through
//! `Idle → Submitting → (Success | Failure) → Idle` and owns the results
//! region every outcome is rendered into.
//!
//! A new submission cancels the one in flight. The stale submission notices
//! under the lock and returns [`SubmitOutcome::Superseded`] without touching
//! the region, so two renders never interleave.

use crate::api_client::{AnalyzeClient, AnalyzeResponse, ClientError, HttpAnalyzeClient, Upload};
use crate::help::HelpTopic;
use crate::view::{DashboardView, RegionSnapshot};
use maud::{Markup, html};
use parking_lot::Mutex;
use sentiment_core::config::BackendConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Label shown while no file is selected
pub const FILE_PLACEHOLDER: &str = "Agrega un archivo excel o csv";

/// Validation error for a submission without a file
pub const MISSING_FILE_MESSAGE: &str = "Por favor selecciona un archivo antes de continuar.";

/// Shown when the backend could not be reached or answered garbage
pub const GENERIC_ERROR_MESSAGE: &str = "Error al cargar el resultado.";

/// Shown after an explicit cancel
pub const CANCELLED_MESSAGE: &str = "Carga cancelada.";

/// Lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    /// Waiting for a submission
    #[default]
    Idle,
    /// Request in flight
    Submitting,
    /// Dashboard rendered
    Success,
    /// Error message rendered
    Failure,
}

/// How a call to [`UploadController::submit`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Dashboard rendered into the region
    Rendered,
    /// Backend rejected the file; its message was rendered
    BackendError(String),
    /// Transport, parse or timeout failure; the generic message was rendered
    Failed(String),
    /// A newer submission took over; the region was left alone
    Superseded,
    /// Aborted through [`UploadController::cancel`]
    Cancelled,
    /// No file was selected; nothing was sent
    MissingFile,
}

impl SubmitOutcome {
    /// Short machine-readable name
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::BackendError(_) => "backend_error",
            Self::Failed(_) => "failed",
            Self::Superseded => "superseded",
            Self::Cancelled => "cancelled",
            Self::MissingFile => "missing_file",
        }
    }

    /// User-facing message, when the outcome carries one
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::BackendError(message) | Self::Failed(message) => Some(message),
            Self::MissingFile => Some(MISSING_FILE_MESSAGE),
            Self::Rendered | Self::Superseded | Self::Cancelled => None,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: UploadState,
    file_label: String,
    validation_error: Option<String>,
    region: RegionSnapshot,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: UploadState::Idle,
            file_label: FILE_PLACEHOLDER.to_string(),
            validation_error: None,
            region: RegionSnapshot::default(),
            generation: 0,
            in_flight: None,
        }
    }
}

impl Inner {
    fn transition(&mut self, next: UploadState) {
        debug!(from = ?self.state, to = ?next, "upload state");
        self.state = next;
    }
}

/// Owns the submission state machine and the results region
pub struct UploadController {
    client: Arc<dyn AnalyzeClient>,
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for UploadController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadController")
            .field("timeout", &self.timeout)
            .field("inner", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

impl UploadController {
    /// Controller over any analysis client
    pub fn new(client: Arc<dyn AnalyzeClient>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Controller talking to the configured HTTP backend
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ClientError> {
        let client = HttpAnalyzeClient::new(config)?;
        Ok(Self::new(Arc::new(client), config.request_timeout()))
    }

    /// Current state; `Idle` once a submission has finished
    #[must_use]
    pub fn state(&self) -> UploadState {
        self.inner.lock().state
    }

    /// Text of the file label
    #[must_use]
    pub fn file_label(&self) -> String {
        self.inner.lock().file_label.clone()
    }

    /// Validation error currently shown, if any
    #[must_use]
    pub fn validation_error(&self) -> Option<String> {
        self.inner.lock().validation_error.clone()
    }

    /// Copy of the results region
    #[must_use]
    pub fn snapshot(&self) -> RegionSnapshot {
        self.inner.lock().region.clone()
    }

    /// React to the file input changing
    pub fn select_file(&self, file_name: Option<&str>) {
        let mut inner = self.inner.lock();
        inner.file_label = file_name.map_or_else(|| FILE_PLACEHOLDER.to_string(), str::to_string);
        inner.validation_error = None;
    }

    /// Swap a help panel into the region
    ///
    /// Does not cancel a submission in flight; its result replaces the panel
    /// when it lands.
    pub fn show_help(&self, topic: HelpTopic) {
        let mut inner = self.inner.lock();
        DashboardView::markup_only(topic.render()).apply(&mut inner.region);
    }

    /// Abort the submission in flight, returning whether there was one
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        let Some(token) = inner.in_flight.take() else {
            return false;
        };
        token.cancel();
        info!("upload cancelled");
        DashboardView::markup_only(html! { p { (CANCELLED_MESSAGE) } }).apply(&mut inner.region);
        inner.transition(UploadState::Idle);
        true
    }

    /// Submit a file for analysis and render the outcome
    pub async fn submit(&self, upload: Option<Upload>) -> SubmitOutcome {
        self.submit_with_view(upload).await.0
    }

    /// Like [`submit`](Self::submit), also returning the region exactly as
    /// this submission left it
    ///
    /// The region is `None` when the submission rendered nothing.
    pub async fn submit_with_view(
        &self,
        upload: Option<Upload>,
    ) -> (SubmitOutcome, Option<RegionSnapshot>) {
        let Some(upload) = upload else {
            debug!("submission without a file");
            self.inner.lock().validation_error = Some(MISSING_FILE_MESSAGE.to_string());
            return (SubmitOutcome::MissingFile, None);
        };

        let (generation, token) = self.begin();
        let guard = InFlightGuard {
            inner: &self.inner,
            generation,
            armed: true,
        };
        info!(file = %upload.file_name, generation, "submitting upload");

        let result = tokio::select! {
            biased;
            () = token.cancelled() => None,
            result = tokio::time::timeout(self.timeout, self.client.analyze(&upload)) => Some(result),
        };
        guard.disarm();

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(generation, "submission superseded");
            return (SubmitOutcome::Superseded, None);
        }
        if token.is_cancelled() {
            return (SubmitOutcome::Cancelled, None);
        }
        inner.in_flight = None;
        let Some(result) = result else {
            return (SubmitOutcome::Cancelled, None);
        };

        let outcome = match result {
            Ok(Ok(AnalyzeResponse::Payload(payload))) => {
                inner.transition(UploadState::Success);
                DashboardView::from_payload(&payload).apply(&mut inner.region);
                info!(charts = inner.region.charts.len(), "dashboard rendered");
                SubmitOutcome::Rendered
            }
            Ok(Ok(AnalyzeResponse::Rejected(message))) => {
                warn!(%message, "backend rejected upload");
                inner.transition(UploadState::Failure);
                DashboardView::markup_only(error_markup(&message)).apply(&mut inner.region);
                SubmitOutcome::BackendError(message)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "analysis request failed");
                Self::fail(&mut inner);
                SubmitOutcome::Failed(e.to_string())
            }
            Err(_) => {
                let e = ClientError::Timeout {
                    after: self.timeout,
                };
                warn!(error = %e, "analysis request timed out");
                Self::fail(&mut inner);
                SubmitOutcome::Failed(e.to_string())
            }
        };

        inner.transition(UploadState::Idle);
        (outcome, Some(inner.region.clone()))
    }

    /// Cancel whatever is in flight and enter `Submitting`
    fn begin(&self) -> (u64, CancellationToken) {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.in_flight.take() {
            info!(generation = inner.generation, "superseding submission in flight");
            previous.cancel();
        }

        inner.generation += 1;
        inner.validation_error = None;
        let token = CancellationToken::new();
        inner.in_flight = Some(token.clone());
        inner.transition(UploadState::Submitting);
        DashboardView::markup_only(progress_markup()).apply(&mut inner.region);

        (inner.generation, token)
    }

    fn fail(inner: &mut Inner) {
        inner.transition(UploadState::Failure);
        DashboardView::markup_only(html! { p { (GENERIC_ERROR_MESSAGE) } })
            .apply(&mut inner.region);
    }
}

/// Releases a submission whose future was dropped before it finished
///
/// Only touches the controller while the submission is still the newest.
struct InFlightGuard<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.generation != self.generation {
            return;
        }
        debug!(generation = self.generation, "submission dropped before finishing");
        inner.in_flight = None;
        if inner.state == UploadState::Submitting {
            inner.transition(UploadState::Idle);
        }
    }
}

/// Indeterminate progress indicator
#[must_use]
pub fn progress_markup() -> Markup {
    html! {
        div class="processing-animation" {
            div class="spinner" {}
            p { "Procesando datos..." }
        }
    }
}

/// Backend error message, styled apart from regular content
#[must_use]
pub fn error_markup(message: &str) -> Markup {
    html! {
        p style="color:red;" { (message) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use sentiment_core::ResultPayload;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a script; `None` entries never resolve
    struct ScriptedClient {
        calls: AtomicUsize,
        script: Vec<Option<Result<AnalyzeResponse, ClientError>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Option<Result<AnalyzeResponse, ClientError>>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalyzeClient for ScriptedClient {
        async fn analyze(&self, _upload: &Upload) -> Result<AnalyzeResponse, ClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.get(call) {
                Some(Some(Ok(response))) => Ok(response.clone()),
                Some(Some(Err(_))) => Err(ClientError::InvalidResponse {
                    message: "not json".to_string(),
                }),
                Some(None) | None => std::future::pending().await,
            }
        }
    }

    fn payload() -> AnalyzeResponse {
        AnalyzeResponse::Payload(ResultPayload::from_value(&json!({
            "sentiment_counts": {"positivo": 4, "neutro": 1},
            "top_words": [["hola", 3]]
        })))
    }

    fn controller(client: Arc<ScriptedClient>) -> Arc<UploadController> {
        Arc::new(UploadController::new(client, Duration::from_secs(5)))
    }

    fn upload() -> Option<Upload> {
        Some(Upload::new("posts.csv", "Post Body\nhola"))
    }

    async fn wait_for_calls(client: &ScriptedClient, n: usize) {
        while client.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_missing_file_makes_no_request() {
        let client = ScriptedClient::new(vec![Some(Ok(payload()))]);
        let controller = controller(client.clone());

        let outcome = controller.submit(None).await;

        assert_eq!(outcome, SubmitOutcome::MissingFile);
        assert_eq!(client.calls(), 0);
        assert_eq!(controller.validation_error().as_deref(), Some(MISSING_FILE_MESSAGE));
        assert_eq!(controller.snapshot(), RegionSnapshot::default());
        assert_eq!(controller.state(), UploadState::Idle);
    }

    #[tokio::test]
    async fn test_select_file_updates_label_and_clears_error() {
        let controller = controller(ScriptedClient::new(vec![]));
        controller.submit(None).await;

        controller.select_file(Some("encuesta.xlsx"));
        assert_eq!(controller.file_label(), "encuesta.xlsx");
        assert_eq!(controller.validation_error(), None);

        controller.select_file(None);
        assert_eq!(controller.file_label(), FILE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_payload_renders_dashboard_and_charts() {
        let controller = controller(ScriptedClient::new(vec![Some(Ok(payload()))]));

        let outcome = controller.submit(upload()).await;

        assert_eq!(outcome, SubmitOutcome::Rendered);
        let region = controller.snapshot();
        assert!(region.markup.contains(r#"id="sentimentPie""#));
        assert_eq!(region.charts.len(), 2);
        // progress indicator, then dashboard
        assert_eq!(region.revision, 2);
        assert_eq!(controller.state(), UploadState::Idle);
    }

    #[tokio::test]
    async fn test_backend_error_renders_only_the_message() {
        let controller = controller(ScriptedClient::new(vec![Some(Ok(
            AnalyzeResponse::Rejected("X".to_string()),
        ))]));

        let outcome = controller.submit(upload()).await;

        assert_eq!(outcome, SubmitOutcome::BackendError("X".to_string()));
        let region = controller.snapshot();
        assert_eq!(region.markup, r#"<p style="color:red;">X</p>"#);
        assert!(region.charts.is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_is_escaped() {
        let controller = controller(ScriptedClient::new(vec![Some(Ok(
            AnalyzeResponse::Rejected("<b>mal</b>".to_string()),
        ))]));

        controller.submit(upload()).await;

        assert!(controller.snapshot().markup.contains("&lt;b&gt;mal&lt;/b&gt;"));
    }

    #[tokio::test]
    async fn test_transport_failure_renders_generic_message() {
        let controller = controller(ScriptedClient::new(vec![Some(Err(
            ClientError::InvalidResponse {
                message: String::new(),
            },
        ))]));

        let outcome = controller.submit(upload()).await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(
            controller.snapshot().markup,
            format!("<p>{GENERIC_ERROR_MESSAGE}</p>")
        );
        assert_eq!(controller.state(), UploadState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_request_times_out() {
        let controller = Arc::new(UploadController::new(
            ScriptedClient::new(vec![None]),
            Duration::from_secs(1),
        ));

        let outcome = controller.submit(upload()).await;

        let SubmitOutcome::Failed(reason) = outcome else {
            panic!("expected a failure, got {outcome:?}");
        };
        assert!(reason.contains("did not answer"));
        assert!(controller.snapshot().markup.contains(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_newer_submission_supersedes_older() {
        let client = ScriptedClient::new(vec![None, Some(Ok(payload()))]);
        let controller = controller(client.clone());

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit(upload()).await }
        });
        wait_for_calls(&client, 1).await;
        assert_eq!(controller.state(), UploadState::Submitting);

        let second = controller.submit(upload()).await;
        let first = first.await.unwrap();

        assert_eq!(first, SubmitOutcome::Superseded);
        assert_eq!(second, SubmitOutcome::Rendered);
        let region = controller.snapshot();
        assert!(region.markup.contains(r#"class="parent""#));
        assert_eq!(region.charts.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_submission() {
        let client = ScriptedClient::new(vec![None]);
        let controller = controller(client.clone());
        assert!(!controller.cancel());

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit(upload()).await }
        });
        wait_for_calls(&client, 1).await;

        assert!(controller.cancel());
        assert_eq!(pending.await.unwrap(), SubmitOutcome::Cancelled);
        assert_eq!(controller.snapshot().markup, format!("<p>{CANCELLED_MESSAGE}</p>"));
        assert_eq!(controller.state(), UploadState::Idle);
    }

    #[tokio::test]
    async fn test_dropped_submission_returns_to_idle() {
        let client = ScriptedClient::new(vec![None]);
        let controller = controller(client.clone());

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit(upload()).await }
        });
        wait_for_calls(&client, 1).await;
        assert_eq!(controller.state(), UploadState::Submitting);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert_eq!(controller.state(), UploadState::Idle);
        assert!(!controller.cancel());
        assert!(!controller.snapshot().markup.contains(CANCELLED_MESSAGE));
    }

    #[tokio::test]
    async fn test_help_swaps_region_content() {
        let controller = controller(ScriptedClient::new(vec![Some(Ok(payload()))]));
        controller.submit(upload()).await;

        controller.show_help(HelpTopic::Tips);

        let region = controller.snapshot();
        assert!(region.markup.starts_with("<h2>Recomendaciones</h2>"));
        assert!(region.charts.is_empty());
    }

    #[tokio::test]
    async fn test_submit_with_view_returns_rendered_region() {
        let controller = controller(ScriptedClient::new(vec![Some(Ok(payload()))]));

        let (outcome, view) = controller.submit_with_view(upload()).await;
        assert_eq!(outcome, SubmitOutcome::Rendered);
        assert_eq!(view, Some(controller.snapshot()));

        let (outcome, view) = controller.submit_with_view(None).await;
        assert_eq!(outcome, SubmitOutcome::MissingFile);
        assert_eq!(view, None);
    }

    #[test]
    fn test_outcome_kinds() {
        assert_eq!(SubmitOutcome::Rendered.kind(), "rendered");
        assert_eq!(SubmitOutcome::MissingFile.message(), Some(MISSING_FILE_MESSAGE));
        assert_eq!(SubmitOutcome::Superseded.message(), None);
    }
}
