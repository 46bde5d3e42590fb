//! Observable generation state and its reducer.

use serde::Serialize;

use reel_models::{
    AspectRatio, GenerationRequest, GenerationStatus, JobId, JobSnapshot, Phase, RecordId,
    SceneStatus, StoryDuration, VisualStyle,
};

use crate::config::ProgressConfig;
use crate::progress::translate;

/// Form fields the next generation is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationForm {
    pub prompt: String,
    pub style: VisualStyle,
    pub duration: StoryDuration,
    pub aspect_ratio: AspectRatio,
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            style: VisualStyle::Cinematic,
            duration: StoryDuration::Short,
            aspect_ratio: AspectRatio::PORTRAIT,
        }
    }
}

impl GenerationForm {
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(self.prompt.clone())
            .with_style(self.style)
            .with_duration(self.duration)
            .with_aspect_ratio(self.aspect_ratio)
    }
}

/// Everything an observer needs to render the current generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    pub form: GenerationForm,
    pub status: GenerationStatus,
    pub job_id: Option<JobId>,
    pub record_id: Option<RecordId>,
    /// 0-100; 100 only once completed
    pub progress: u8,
    pub phase: Phase,
    pub scenes: Vec<SceneStatus>,
    pub current_scene_index: usize,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
}

/// State transitions.
///
/// Job-scoped events carry the job they belong to and are dropped when that
/// job is no longer the one in flight.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// A new job was claimed; job fields are reset.
    Started,
    JobAccepted(JobId),
    RecordLinked { job_id: JobId, record_id: RecordId },
    Snapshot { job_id: JobId, snapshot: JobSnapshot },
    Completed { job_id: JobId, result_url: Option<String> },
    /// `job_id` is `None` when the job was never accepted.
    Failed { job_id: Option<JobId>, message: String },
    Cancelled { job_id: JobId },
    Reset,
    ClearError,
    SetPrompt(String),
    SetStyle(VisualStyle),
    SetDuration(StoryDuration),
    SetAspectRatio(AspectRatio),
}

impl GenerationState {
    pub fn is_generating(&self) -> bool {
        self.status.is_generating()
    }

    /// Apply `event`; returns whether anything changed.
    pub fn apply(&mut self, event: GenerationEvent, config: &ProgressConfig) -> bool {
        match event {
            GenerationEvent::Started => {
                if self.is_generating() {
                    return false;
                }
                self.clear_job();
                self.status = GenerationStatus::Generating;
                true
            }
            GenerationEvent::JobAccepted(job_id) => {
                if !self.is_generating() || self.job_id.is_some() {
                    return false;
                }
                self.job_id = Some(job_id);
                true
            }
            GenerationEvent::RecordLinked { job_id, record_id } => {
                if !self.owns(&job_id) {
                    return false;
                }
                self.record_id = Some(record_id);
                true
            }
            GenerationEvent::Snapshot { job_id, snapshot } => {
                if !self.owns(&job_id) {
                    return false;
                }
                let update = translate(&snapshot, config);
                self.progress = self.progress.max(update.progress).min(config.running_cap());
                self.phase = update.phase;
                self.current_scene_index = update.current_scene_index;
                self.scenes = snapshot.scenes;
                true
            }
            GenerationEvent::Completed { job_id, result_url } => {
                if !self.owns(&job_id) {
                    return false;
                }
                self.status = GenerationStatus::Completed;
                self.progress = 100;
                self.phase = Phase::Composing;
                self.current_scene_index = self.scenes.len().saturating_sub(1);
                self.result_url = result_url;
                self.error_message = None;
                true
            }
            GenerationEvent::Failed { job_id, message } => {
                let current = match &job_id {
                    Some(id) => self.owns(id),
                    None => self.is_generating() && self.job_id.is_none(),
                };
                if !current {
                    return false;
                }
                self.status = GenerationStatus::Failed;
                self.error_message = Some(message);
                true
            }
            GenerationEvent::Cancelled { job_id } => {
                if !self.owns(&job_id) {
                    return false;
                }
                self.clear_job();
                self.status = GenerationStatus::Cancelled;
                true
            }
            GenerationEvent::Reset => {
                if self.is_generating() {
                    return false;
                }
                let before = self.clone();
                self.clear_job();
                self.status = GenerationStatus::Idle;
                self.form = GenerationForm::default();
                *self != before
            }
            GenerationEvent::ClearError => self.error_message.take().is_some(),
            GenerationEvent::SetPrompt(prompt) => replace(&mut self.form.prompt, prompt),
            GenerationEvent::SetStyle(style) => replace(&mut self.form.style, style),
            GenerationEvent::SetDuration(duration) => replace(&mut self.form.duration, duration),
            GenerationEvent::SetAspectRatio(ratio) => replace(&mut self.form.aspect_ratio, ratio),
        }
    }

    /// True while `job_id` is the job in flight.
    fn owns(&self, job_id: &JobId) -> bool {
        self.is_generating() && self.job_id.as_ref() == Some(job_id)
    }

    fn clear_job(&mut self) {
        self.job_id = None;
        self.record_id = None;
        self.progress = 0;
        self.phase = Phase::Initializing;
        self.scenes.clear();
        self.current_scene_index = 0;
        self.result_url = None;
        self.error_message = None;
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
