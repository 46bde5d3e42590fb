//! Job identity, lifecycle status and pipeline phase.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the remote story service when a job is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a generation, as owned by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// No job in flight
    #[default]
    Idle,
    /// Job created remotely and being polled
    Generating,
    /// Finished video available
    Completed,
    /// Job failed (remote error or transport failure)
    Failed,
    /// Job cancelled on request
    Cancelled,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Idle => "idle",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
            GenerationStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more automatic transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationStatus::Completed | GenerationStatus::Failed | GenerationStatus::Cancelled
        )
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, GenerationStatus::Generating)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse stage of the backend pipeline, derived from scene artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Story and scene breakdown, no scenes reported yet
    #[default]
    Initializing,
    /// Narration audio being produced scene by scene
    GeneratingAudio,
    /// Scene clips being rendered
    GeneratingVideo,
    /// All scene artifacts ready, final video being assembled
    Composing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initializing => "initializing",
            Phase::GeneratingAudio => "generating_audio",
            Phase::GeneratingVideo => "generating_video",
            Phase::Composing => "composing",
        }
    }

    /// Short user-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Initializing => "Writing Your Story",
            Phase::GeneratingAudio => "Adding Voice",
            Phase::GeneratingVideo => "Animating Scenes",
            Phase::Composing => "Final Touches",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::Initializing => "Crafting the narrative...",
            Phase::GeneratingAudio => "Generating narration...",
            Phase::GeneratingVideo => "Converting images to video...",
            Phase::Composing => "Assembling the final video...",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!GenerationStatus::Idle.is_terminal());
        assert!(!GenerationStatus::Generating.is_terminal());
        assert!(GenerationStatus::Completed.is_terminal());
        assert!(GenerationStatus::Failed.is_terminal());
        assert!(GenerationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_phase_serde() {
        let json = serde_json::to_string(&Phase::GeneratingAudio).unwrap();
        assert_eq!(json, "\"generating_audio\"");
        assert_eq!(Phase::default(), Phase::Initializing);
    }

    #[test]
    fn test_job_id_transparent() {
        let id: JobId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.to_string(), "abc");
    }
}
