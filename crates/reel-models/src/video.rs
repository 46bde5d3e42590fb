//! Video library records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AspectRatio, GenerationRequest, JobId, StoryDuration, VisualStyle};

/// Identifier of a persisted library record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Records are keyed by the remote job id so repeated writes upsert.
    pub fn for_job(job_id: &JobId) -> Self {
        Self(job_id.as_str().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a library record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Record created, job accepted
    #[default]
    Pending,
    /// Job in progress
    Generating,
    /// Video ready
    Completed,
    /// Generation failed
    Failed,
    /// Generation cancelled by the user
    Cancelled,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Generating => "generating",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
            VideoStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status string; unknown values map to `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(VideoStatus::Pending),
            "generating" | "processing" => Some(VideoStatus::Generating),
            "completed" => Some(VideoStatus::Completed),
            "failed" => Some(VideoStatus::Failed),
            "cancelled" => Some(VideoStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata written when a job is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NewVideoRecord {
    /// Remote job the record tracks
    pub job_id: JobId,
    /// Title derived from the prompt
    pub title: String,
    pub prompt: String,
    pub style: VisualStyle,
    pub duration: StoryDuration,
    pub aspect_ratio: AspectRatio,
}

impl NewVideoRecord {
    /// Build creation metadata for a request accepted as `job_id`.
    pub fn from_request(job_id: JobId, request: &GenerationRequest) -> Self {
        Self {
            job_id,
            title: request.title(),
            prompt: request.prompt.clone(),
            style: request.style,
            duration: request.duration,
            aspect_ratio: request.aspect_ratio,
        }
    }
}

/// Partial update applied to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RecordPatch {
    /// Patch marking the record completed.
    pub fn completed(video_url: Option<String>) -> Self {
        Self {
            status: Some(VideoStatus::Completed),
            progress: Some(100),
            video_url,
            error_message: None,
        }
    }

    /// Patch marking the record failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(VideoStatus::Failed),
            error_message: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: Some(VideoStatus::Cancelled),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.video_url.is_none()
            && self.error_message.is_none()
    }
}

/// A video in the user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Record ID
    pub record_id: RecordId,

    /// Owner (authenticated user ID)
    pub owner_id: String,

    /// Remote job ID
    pub job_id: JobId,

    pub title: String,
    pub prompt: String,
    pub style: VisualStyle,
    pub duration: StoryDuration,
    pub aspect_ratio: AspectRatio,

    /// Record status
    #[serde(default)]
    pub status: VideoStatus,

    /// Last persisted progress (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Final video URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default)]
    pub views: u64,

    #[serde(default)]
    pub is_public: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a fresh pending record.
    pub fn new(record_id: RecordId, owner_id: impl Into<String>, meta: NewVideoRecord) -> Self {
        let now = Utc::now();
        Self {
            record_id,
            owner_id: owner_id.into(),
            job_id: meta.job_id,
            title: meta.title,
            prompt: meta.prompt,
            style: meta.style,
            duration: meta.duration,
            aspect_ratio: meta.aspect_ratio,
            status: VideoStatus::Pending,
            progress: 0,
            video_url: None,
            error_message: None,
            views: 0,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch and bump `updated_at`.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress.min(100);
        }
        if let Some(url) = &patch.video_url {
            self.video_url = Some(url.clone());
        }
        if let Some(error) = &patch.error_message {
            self.error_message = Some(error.clone());
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> VideoRecord {
        let request = GenerationRequest::new("A cat explores a station");
        let meta = NewVideoRecord::from_request(JobId::from("abc"), &request);
        VideoRecord::new(RecordId::for_job(&meta.job_id), "user-1", meta)
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = sample_record();
        assert_eq!(record.record_id.as_str(), "abc");
        assert_eq!(record.status, VideoStatus::Pending);
        assert_eq!(record.title, "A cat explores a station");
        assert!(!record.is_public);
    }

    #[test]
    fn test_apply_completed_patch() {
        let mut record = sample_record();
        record.apply(&RecordPatch::completed(Some("https://cdn/abc.mp4".into())));
        assert_eq!(record.status, VideoStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.video_url.as_deref(), Some("https://cdn/abc.mp4"));
    }

    #[test]
    fn test_apply_failed_patch_keeps_progress() {
        let mut record = sample_record();
        record.apply(&RecordPatch {
            progress: Some(40),
            ..Default::default()
        });
        record.apply(&RecordPatch::failed("render crashed"));
        assert_eq!(record.status, VideoStatus::Failed);
        assert_eq!(record.progress, 40);
        assert_eq!(record.error_message.as_deref(), Some("render crashed"));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(VideoStatus::parse("completed"), Some(VideoStatus::Completed));
        assert_eq!(VideoStatus::parse("processing"), Some(VideoStatus::Generating));
        assert_eq!(VideoStatus::parse("bogus"), None);
    }
}
