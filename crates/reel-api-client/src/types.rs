//! Story service request/response types.

use serde::{Deserialize, Serialize};
use reel_models::{AspectRatio, GenerationRequest, JobId, StoryDuration, VisualStyle};

use crate::error::{ApiError, ApiResult};

/// Body of `POST /api/stories`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoryRequest {
    /// Story prompt
    pub prompt: String,
    /// Visual style id
    pub style: VisualStyle,
    /// Length in seconds
    pub duration: StoryDuration,
    /// Target aspect ratio ("9:16")
    pub aspect_ratio: AspectRatio,
}

impl From<&GenerationRequest> for CreateStoryRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            prompt: request.prompt.trim().to_string(),
            style: request.style,
            duration: request.duration,
            aspect_ratio: request.aspect_ratio,
        }
    }
}

/// Response of `POST /api/stories`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStoryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
}

impl CreateStoryResponse {
    /// The assigned job id; the service reports it as `id` or `story_id`.
    pub fn job_id(&self) -> ApiResult<JobId> {
        self.id
            .as_deref()
            .or(self.story_id.as_deref())
            .filter(|id| !id.is_empty())
            .map(JobId::from)
            .ok_or_else(|| ApiError::InvalidResponse("create response carried no story id".into()))
    }
}

/// Entry of `GET /api/stories`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorySummary {
    #[serde(alias = "story_id")]
    pub id: String,
    #[serde(default)]
    pub status: reel_models::RemoteJobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_response_id_fallback() {
        let resp: CreateStoryResponse = serde_json::from_str(r#"{"story_id": "abc"}"#).unwrap();
        assert_eq!(resp.job_id().unwrap().as_str(), "abc");

        let resp: CreateStoryResponse = serde_json::from_str(r#"{"id": "xyz"}"#).unwrap();
        assert_eq!(resp.job_id().unwrap().as_str(), "xyz");

        let resp: CreateStoryResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(matches!(resp.job_id(), Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn test_create_request_body() {
        let request = GenerationRequest::new("  A cat explores a station ");
        let body = serde_json::to_value(CreateStoryRequest::from(&request)).unwrap();
        assert_eq!(body["prompt"], "A cat explores a station");
        assert_eq!(body["style"], "cinematic");
        assert_eq!(body["duration"], 30);
        assert_eq!(body["aspectRatio"], "9:16");
    }
}
