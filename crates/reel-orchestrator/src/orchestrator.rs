//! Generation orchestrator.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, Instrument};
use url::Url;

use reel_api_client::{poll_until_terminal, resolve_against, JobService, PollError};
use reel_library::VideoLibrary;
use reel_models::{
    AspectRatio, GenerationRequest, JobId, JobSnapshot, NewVideoRecord, RecordId, RecordPatch,
    StoryDuration, VisualStyle,
};

use crate::config::OrchestratorConfig;
use crate::error::{GenerationError, GenerationResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::state::{GenerationEvent, GenerationState};

/// Outcome of a generation that reached `completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub job_id: JobId,
    /// `None` when the library record could not be created
    pub record_id: Option<RecordId>,
    pub result_url: Option<String>,
}

/// Drives one generation at a time against the story service.
///
/// All methods take `&self`, so `cancel_generation` can run from another task
/// while `start_generation` is awaiting. State is published through a watch
/// channel; every change goes through [`GenerationState::apply`].
pub struct GenerationOrchestrator {
    config: OrchestratorConfig,
    result_base: Url,
    service: Arc<dyn JobService>,
    library: Arc<dyn VideoLibrary>,
    state: watch::Sender<GenerationState>,
    /// Cancellation signal of the job in flight
    cancel: Mutex<Option<watch::Sender<bool>>>,
}

impl GenerationOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        service: Arc<dyn JobService>,
        library: Arc<dyn VideoLibrary>,
    ) -> GenerationResult<Self> {
        let mut result_base = Url::parse(&config.result_base_url).map_err(|e| {
            GenerationError::config_error(format!(
                "invalid result base URL '{}': {}",
                config.result_base_url, e
            ))
        })?;
        if !result_base.path().ends_with('/') {
            let path = format!("{}/", result_base.path());
            result_base.set_path(&path);
        }

        let (state, _) = watch::channel(GenerationState::default());

        Ok(Self {
            config,
            result_base,
            service,
            library,
            state,
            cancel: Mutex::new(None),
        })
    }

    /// Create with configuration from environment variables.
    pub fn from_env(
        service: Arc<dyn JobService>,
        library: Arc<dyn VideoLibrary>,
    ) -> GenerationResult<Self> {
        Self::new(OrchestratorConfig::from_env(), service, library)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> GenerationState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published state change.
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    /// Run one generation to its terminal state.
    ///
    /// Returns once the job completes, fails or is cancelled. Validation
    /// failures and a job already in flight are rejected without touching
    /// state or calling the service.
    pub async fn start_generation(
        &self,
        owner_id: &str,
        request: GenerationRequest,
    ) -> GenerationResult<CompletedJob> {
        request.validate(self.config.min_prompt_len)?;

        if !self.apply(GenerationEvent::Started) {
            debug!("Rejected start: a generation is already in progress");
            return Err(GenerationError::AlreadyRunning);
        }

        let started = Instant::now();
        metrics::record_started();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        *self.cancel.lock().await = Some(cancel_tx);

        let pending = JobLogger::from_string("pending", "generate");
        pending.log_start(&format!(
            "style={} duration={}s aspect_ratio={}",
            request.style,
            request.duration.as_secs(),
            request.aspect_ratio
        ));

        let job_id = match self.service.create_job(&request).await {
            Ok(job_id) => job_id,
            Err(e) => {
                let err = GenerationError::from(e);
                pending.log_error(&err.to_string());
                self.apply(GenerationEvent::Failed {
                    job_id: None,
                    message: err.user_message(),
                });
                metrics::record_finished("failed", started.elapsed().as_secs_f64());
                return Err(err);
            }
        };

        let logger = JobLogger::new(&job_id, "generate");
        let span = logger.create_span();

        let result = self
            .run_job(owner_id, &request, job_id, cancel_rx, &logger)
            .instrument(span)
            .await;

        let outcome = match &result {
            Ok(_) => "completed",
            Err(e) if e.is_cancelled() => "cancelled",
            Err(_) => "failed",
        };
        metrics::record_finished(outcome, started.elapsed().as_secs_f64());

        result
    }

    /// Start a generation from the stored form fields.
    pub async fn start_from_form(&self, owner_id: &str) -> GenerationResult<CompletedJob> {
        let request = self.state.borrow().form.to_request();
        self.start_generation(owner_id, request).await
    }

    async fn run_job(
        &self,
        owner_id: &str,
        request: &GenerationRequest,
        job_id: JobId,
        cancel_rx: watch::Receiver<bool>,
        logger: &JobLogger,
    ) -> GenerationResult<CompletedJob> {
        info!("Story job accepted");
        self.apply(GenerationEvent::JobAccepted(job_id.clone()));

        let record_id = match self
            .library
            .create_record(owner_id, NewVideoRecord::from_request(job_id.clone(), request))
            .await
        {
            Ok(record_id) => {
                self.apply(GenerationEvent::RecordLinked {
                    job_id: job_id.clone(),
                    record_id: record_id.clone(),
                });
                Some(record_id)
            }
            Err(e) => {
                logger.log_warning(&format!("Failed to create library record: {}", e));
                metrics::record_library_failure("create");
                None
            }
        };

        let polled = poll_until_terminal(
            self.service.as_ref(),
            &job_id,
            self.config.poll_interval,
            |snapshot| {
                let applied = self.apply(GenerationEvent::Snapshot {
                    job_id: job_id.clone(),
                    snapshot: snapshot.clone(),
                });
                if applied {
                    metrics::record_snapshot();
                    let state = self.state.borrow();
                    logger.log_progress(state.progress, state.phase.as_str());
                }
            },
            Some(cancel_rx),
        )
        .await;

        match polled {
            Ok(snapshot) => self.finish_completed(job_id, record_id, snapshot, logger).await,
            Err(PollError::Cancelled) => {
                logger.log_completion("cancelled locally");
                Err(GenerationError::Cancelled)
            }
            Err(PollError::RemoteCancelled) => {
                logger.log_warning("job cancelled by the story service");
                self.apply(GenerationEvent::Cancelled {
                    job_id: job_id.clone(),
                });
                self.sync_library(record_id.as_ref(), RecordPatch::cancelled(), "cancel", logger)
                    .await;
                Err(GenerationError::Cancelled)
            }
            Err(e) => {
                let err = GenerationError::from(e);
                let message = err.user_message();
                logger.log_error(&message);
                let applied = self.apply(GenerationEvent::Failed {
                    job_id: Some(job_id),
                    message: message.clone(),
                });
                if !applied {
                    return Err(GenerationError::Cancelled);
                }
                self.sync_library(record_id.as_ref(), RecordPatch::failed(message), "fail", logger)
                    .await;
                Err(err)
            }
        }
    }

    async fn finish_completed(
        &self,
        job_id: JobId,
        record_id: Option<RecordId>,
        snapshot: JobSnapshot,
        logger: &JobLogger,
    ) -> GenerationResult<CompletedJob> {
        let raw = match snapshot.result_url() {
            Some(url) => Some(url.to_string()),
            None => match self.service.get_job_status(&job_id).await {
                Ok(latest) => latest.result_url().map(str::to_string),
                Err(e) => {
                    logger.log_warning(&format!("Failed to fetch finished story: {}", e));
                    None
                }
            },
        };

        let result_url = raw.map(|raw| {
            resolve_against(&self.result_base, &raw).unwrap_or_else(|e| {
                logger.log_warning(&format!("Keeping unresolvable result URL '{}': {}", raw, e));
                raw
            })
        });

        let applied = self.apply(GenerationEvent::Completed {
            job_id: job_id.clone(),
            result_url: result_url.clone(),
        });
        if !applied {
            // Cancelled while the last poll was in flight.
            return Err(GenerationError::Cancelled);
        }

        logger.log_completion(result_url.as_deref().unwrap_or("no result URL"));
        self.sync_library(
            record_id.as_ref(),
            RecordPatch::completed(result_url.clone()),
            "complete",
            logger,
        )
        .await;

        Ok(CompletedJob {
            job_id,
            record_id,
            result_url,
        })
    }

    /// Ask the service to cancel the job in flight.
    ///
    /// Returns false, without changing state, when nothing is generating, the
    /// job id is not known yet, or the service refused.
    pub async fn cancel_generation(&self) -> bool {
        let (job_id, record_id) = {
            let state = self.state.borrow();
            match (&state.job_id, state.is_generating()) {
                (Some(job_id), true) => (job_id.clone(), state.record_id.clone()),
                _ => return false,
            }
        };

        let logger = JobLogger::new(&job_id, "cancel");

        if let Err(e) = self.service.cancel_job(&job_id).await {
            logger.log_warning(&format!("Cancel request failed: {}", e));
            return false;
        }

        {
            // Held until the signal is sent so a new run cannot swap the sender in between.
            let cancel = self.cancel.lock().await;
            if !self.apply(GenerationEvent::Cancelled {
                job_id: job_id.clone(),
            }) {
                return false;
            }
            if let Some(cancel) = cancel.as_ref() {
                cancel.send_replace(true);
            }
        }

        logger.log_completion("cancelled on request");
        self.sync_library(record_id.as_ref(), RecordPatch::cancelled(), "cancel", &logger)
            .await;

        true
    }

    /// Clear job and form fields back to defaults. Refused while generating.
    pub fn reset_generation(&self) -> bool {
        let progress = &self.config.progress;
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.is_generating() {
                return false;
            }
            accepted = true;
            state.apply(GenerationEvent::Reset, progress)
        });
        accepted
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) -> bool {
        self.apply(GenerationEvent::SetPrompt(prompt.into()))
    }

    pub fn set_style(&self, style: VisualStyle) -> bool {
        self.apply(GenerationEvent::SetStyle(style))
    }

    pub fn set_duration(&self, duration: StoryDuration) -> bool {
        self.apply(GenerationEvent::SetDuration(duration))
    }

    pub fn set_aspect_ratio(&self, aspect_ratio: AspectRatio) -> bool {
        self.apply(GenerationEvent::SetAspectRatio(aspect_ratio))
    }

    pub fn clear_error(&self) -> bool {
        self.apply(GenerationEvent::ClearError)
    }

    /// Apply one event atomically and notify observers if it changed state.
    fn apply(&self, event: GenerationEvent) -> bool {
        let progress = &self.config.progress;
        self.state
            .send_if_modified(|state| state.apply(event, progress))
    }

    /// Best-effort library write; failures never change the job outcome.
    async fn sync_library(
        &self,
        record_id: Option<&RecordId>,
        patch: RecordPatch,
        operation: &'static str,
        logger: &JobLogger,
    ) {
        let Some(record_id) = record_id else {
            return;
        };

        if let Err(e) = self.library.update_record(record_id, patch).await {
            logger.log_warning(&format!(
                "Failed to update library record {} ({}): {}",
                record_id, operation, e
            ));
            metrics::record_library_failure(operation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use reel_api_client::ApiResult;
    use reel_library::MemoryVideoLibrary;
    use reel_models::RemoteJobStatus;

    struct IdleService;

    #[async_trait]
    impl JobService for IdleService {
        async fn create_job(&self, _request: &GenerationRequest) -> ApiResult<JobId> {
            Ok(JobId::from("never"))
        }

        async fn get_job_status(&self, _job_id: &JobId) -> ApiResult<JobSnapshot> {
            Ok(JobSnapshot::with_status(RemoteJobStatus::Running))
        }

        async fn cancel_job(&self, _job_id: &JobId) -> ApiResult<()> {
            Ok(())
        }
    }

    fn orchestrator(base: &str) -> GenerationResult<GenerationOrchestrator> {
        GenerationOrchestrator::new(
            OrchestratorConfig {
                result_base_url: base.to_string(),
                ..Default::default()
            },
            Arc::new(IdleService),
            Arc::new(MemoryVideoLibrary::new()),
        )
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = orchestrator("not a url").err().unwrap();
        assert!(matches!(err, GenerationError::Config(_)));
    }

    #[test]
    fn test_result_base_gets_trailing_slash() {
        let orch = orchestrator("https://stories.example.com/backend").unwrap();
        assert_eq!(orch.result_base.as_str(), "https://stories.example.com/backend/");
    }

    #[test]
    fn test_reset_when_idle_is_accepted() {
        let orch = orchestrator("http://localhost:8000").unwrap();
        assert!(orch.reset_generation());
        assert_eq!(orch.state(), GenerationState::default());
    }

    #[tokio::test]
    async fn test_cancel_while_idle_is_noop() {
        let orch = orchestrator("http://localhost:8000").unwrap();
        let rx = orch.subscribe();

        assert!(!orch.cancel_generation().await);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_form_setters_publish() {
        let orch = orchestrator("http://localhost:8000").unwrap();
        let rx = orch.subscribe();

        assert!(orch.set_prompt("A cat explores a station"));
        assert!(rx.has_changed().unwrap());
        assert!(!orch.set_style(VisualStyle::Cinematic));
        assert_eq!(orch.state().form.prompt, "A cat explores a station");
    }
}
