//! Raw job status payloads reported by the remote story service.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job status as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemoteJobStatus {
    /// Accepted, not yet started
    #[default]
    Pending,
    /// Pipeline running
    Running,
    /// Pipeline running (alternate wording used by some backend stages)
    Processing,
    /// Final video ready
    Completed,
    /// Pipeline failed
    Failed,
    /// Job cancelled on the backend
    Cancelled,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl RemoteJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteJobStatus::Pending => "pending",
            RemoteJobStatus::Running => "running",
            RemoteJobStatus::Processing => "processing",
            RemoteJobStatus::Completed => "completed",
            RemoteJobStatus::Failed => "failed",
            RemoteJobStatus::Cancelled => "cancelled",
            RemoteJobStatus::Unknown => "unknown",
        }
    }

    /// Check if the remote job will not change anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RemoteJobStatus::Completed | RemoteJobStatus::Failed | RemoteJobStatus::Cancelled
        )
    }
}

impl fmt::Display for RemoteJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one scene of the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SceneStatus {
    /// Scene sequence number
    #[serde(default, alias = "scene_number", alias = "sceneNumber")]
    pub sequence: u32,
    /// Narration audio artifact
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "audioUrl")]
    pub audio_url: Option<String>,
    /// Rendered scene clip
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "videoUrl")]
    pub video_url: Option<String>,
    /// Scene-level error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SceneStatus {
    pub fn new(sequence: u32) -> Self {
        Self {
            sequence,
            ..Default::default()
        }
    }

    pub fn with_audio(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn with_video(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    /// Audio counts as done only when the pointer is non-empty.
    pub fn has_audio(&self) -> bool {
        self.audio_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Video counts as done only when the pointer is non-empty.
    pub fn has_video(&self) -> bool {
        self.video_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// One status payload returned by a status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct JobSnapshot {
    /// Job ID echoed back by the service
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "story_id")]
    pub id: Option<String>,
    /// Remote status
    #[serde(default)]
    pub status: RemoteJobStatus,
    /// Scenes as last reported, in order
    #[serde(default)]
    pub scenes: Vec<SceneStatus>,
    /// Final video location (absolute or relative to the service)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "video_url",
        alias = "videoUrl"
    )]
    pub result_url: Option<String>,
    /// Failure reason
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "error")]
    pub error_message: Option<String>,
    /// Raw progress reported by the service, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl JobSnapshot {
    /// Create a snapshot with the given status and no scenes.
    pub fn with_status(status: RemoteJobStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Number of scenes with a narration artifact.
    pub fn audio_done(&self) -> usize {
        self.scenes.iter().filter(|s| s.has_audio()).count()
    }

    /// Number of scenes with a rendered clip.
    pub fn video_done(&self) -> usize {
        self.scenes.iter().filter(|s| s.has_video()).count()
    }

    /// Result URL, ignoring empty strings.
    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_accepts_backend_field_names() {
        let json = r#"{
            "id": "abc",
            "status": "completed",
            "video_url": "/files/abc.mp4",
            "scenes": [
                {"sequence": 1, "audio_url": "/a/1.mp3", "video_url": "/v/1.mp4"},
                {"sequence": 2, "audioUrl": "", "videoUrl": null}
            ]
        }"#;

        let snapshot: JobSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.status, RemoteJobStatus::Completed);
        assert_eq!(snapshot.result_url(), Some("/files/abc.mp4"));
        assert_eq!(snapshot.scene_count(), 2);
        assert_eq!(snapshot.audio_done(), 1);
        assert_eq!(snapshot.video_done(), 1);
    }

    #[test]
    fn test_unknown_status_is_not_terminal() {
        let snapshot: JobSnapshot = serde_json::from_str(r#"{"status": "rendering"}"#).unwrap();
        assert_eq!(snapshot.status, RemoteJobStatus::Unknown);
        assert!(!snapshot.status.is_terminal());
        assert!(snapshot.scenes.is_empty());
    }

    #[test]
    fn test_error_alias() {
        let snapshot: JobSnapshot =
            serde_json::from_str(r#"{"status": "failed", "error": "TTS quota exceeded"}"#).unwrap();
        assert_eq!(snapshot.error_message.as_deref(), Some("TTS quota exceeded"));
    }

    #[test]
    fn test_empty_pointers_do_not_count() {
        let scene = SceneStatus::new(1).with_audio("  ").with_video("/v/1.mp4");
        assert!(!scene.has_audio());
        assert!(scene.has_video());
    }
}
