//! Generation request submitted by the user.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AspectRatio, StoryDuration, VisualStyle};

/// Maximum characters of the prompt kept in a record title.
const TITLE_MAX_CHARS: usize = 50;

/// Immutable input for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Story prompt
    pub prompt: String,
    /// Visual style
    #[serde(default)]
    pub style: VisualStyle,
    /// Story length
    #[serde(default)]
    pub duration: StoryDuration,
    /// Output aspect ratio
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// Create a request with default style, duration and aspect ratio.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: VisualStyle::default(),
            duration: StoryDuration::default(),
            aspect_ratio: AspectRatio::default(),
        }
    }

    pub fn with_style(mut self, style: VisualStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_duration(mut self, duration: StoryDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Check the prompt before any remote call is made.
    ///
    /// The prompt is measured in characters after trimming whitespace.
    pub fn validate(&self, min_prompt_len: usize) -> Result<(), RequestValidationError> {
        let trimmed = self.prompt.trim();
        if trimmed.is_empty() {
            return Err(RequestValidationError::EmptyPrompt);
        }

        let len = trimmed.chars().count();
        if len < min_prompt_len {
            return Err(RequestValidationError::PromptTooShort {
                min: min_prompt_len,
                actual: len,
            });
        }

        Ok(())
    }

    /// Library title derived from the prompt.
    pub fn title(&self) -> String {
        let prompt = self.prompt.trim();
        if prompt.chars().count() > TITLE_MAX_CHARS {
            let head: String = prompt.chars().take(TITLE_MAX_CHARS).collect();
            format!("{}...", head)
        } else {
            prompt.to_string()
        }
    }
}

/// Reasons a request is rejected locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestValidationError {
    #[error("Please enter a story prompt")]
    EmptyPrompt,

    #[error("Story prompt must be at least {min} characters (got {actual})")]
    PromptTooShort { min: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_prompt() {
        let request = GenerationRequest::new("   ");
        assert_eq!(request.validate(1), Err(RequestValidationError::EmptyPrompt));
    }

    #[test]
    fn test_validate_min_length() {
        let request = GenerationRequest::new("  cat  ");
        assert!(request.validate(3).is_ok());
        assert_eq!(
            request.validate(10),
            Err(RequestValidationError::PromptTooShort { min: 10, actual: 3 })
        );
    }

    #[test]
    fn test_title_truncates_long_prompts() {
        let short = GenerationRequest::new("A cat explores a station");
        assert_eq!(short.title(), "A cat explores a station");

        let long = GenerationRequest::new("x".repeat(80));
        let title = long.title();
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_request_wire_format() {
        let request = GenerationRequest::new("A cat explores a station")
            .with_style(VisualStyle::Anime)
            .with_duration(StoryDuration::Mini)
            .with_aspect_ratio(AspectRatio::SQUARE);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["prompt"], "A cat explores a station");
        assert_eq!(json["style"], "anime");
        assert_eq!(json["duration"], 60);
        assert_eq!(json["aspectRatio"], "1:1");
    }

    #[test]
    fn test_request_defaults_on_deserialize() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"prompt": "A lighthouse at dusk"}"#).unwrap();
        assert_eq!(request.style, VisualStyle::Cinematic);
        assert_eq!(request.duration, StoryDuration::Short);
        assert_eq!(request.aspect_ratio, AspectRatio::PORTRAIT);
    }
}
