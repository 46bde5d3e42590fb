//! Visual style, duration and aspect ratio definitions.

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Visual styles offered by the story generator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    /// Photorealistic movie-like visuals
    #[default]
    Cinematic,
    /// Japanese animation style with vibrant colors
    Anime,
    /// Soft, artistic painted look
    Watercolor,
    /// Black and white with dramatic shadows
    Noir,
    /// Magical and ethereal visuals
    Fantasy,
    /// Retro film look with warm tones
    Vintage,
    /// Bold lines and pop art colors
    Comic,
    /// Clean, simple, modern visuals
    Minimalist,
}

impl VisualStyle {
    /// All available styles, in picker order.
    pub const ALL: &'static [VisualStyle] = &[
        VisualStyle::Cinematic,
        VisualStyle::Anime,
        VisualStyle::Watercolor,
        VisualStyle::Noir,
        VisualStyle::Fantasy,
        VisualStyle::Vintage,
        VisualStyle::Comic,
        VisualStyle::Minimalist,
    ];

    /// Identifier sent to the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualStyle::Cinematic => "cinematic",
            VisualStyle::Anime => "anime",
            VisualStyle::Watercolor => "watercolor",
            VisualStyle::Noir => "noir",
            VisualStyle::Fantasy => "fantasy",
            VisualStyle::Vintage => "vintage",
            VisualStyle::Comic => "comic",
            VisualStyle::Minimalist => "minimalist",
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            VisualStyle::Cinematic => "Cinematic",
            VisualStyle::Anime => "Anime",
            VisualStyle::Watercolor => "Watercolor",
            VisualStyle::Noir => "Noir",
            VisualStyle::Fantasy => "Fantasy",
            VisualStyle::Vintage => "Vintage",
            VisualStyle::Comic => "Comic Book",
            VisualStyle::Minimalist => "Minimalist",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            VisualStyle::Cinematic => "Photorealistic movie-like visuals",
            VisualStyle::Anime => "Japanese animation style with vibrant colors",
            VisualStyle::Watercolor => "Soft, artistic painted look",
            VisualStyle::Noir => "Black and white with dramatic shadows",
            VisualStyle::Fantasy => "Magical and ethereal visuals",
            VisualStyle::Vintage => "Retro film look with warm tones",
            VisualStyle::Comic => "Bold lines and pop art colors",
            VisualStyle::Minimalist => "Clean, simple, modern visuals",
        }
    }
}

impl fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VisualStyle {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        VisualStyle::ALL
            .iter()
            .copied()
            .find(|style| style.as_str() == lower)
            .ok_or_else(|| StyleParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown visual style: {0}")]
pub struct StyleParseError(String);

/// Story length options, serialized as whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum StoryDuration {
    /// 15 seconds
    Quick,
    /// 30 seconds
    #[default]
    Short,
    /// 60 seconds
    Mini,
}

impl StoryDuration {
    pub const ALL: &'static [StoryDuration] =
        &[StoryDuration::Quick, StoryDuration::Short, StoryDuration::Mini];

    /// Length in seconds.
    pub fn as_secs(&self) -> u32 {
        match self {
            StoryDuration::Quick => 15,
            StoryDuration::Short => 30,
            StoryDuration::Mini => 60,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StoryDuration::Quick => "Quick Tale",
            StoryDuration::Short => "Short Story",
            StoryDuration::Mini => "Mini Movie",
        }
    }

    /// Look up a duration by its length in seconds.
    pub fn from_secs(secs: u32) -> Option<Self> {
        StoryDuration::ALL.iter().copied().find(|d| d.as_secs() == secs)
    }
}

impl fmt::Display for StoryDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.as_secs())
    }
}

impl TryFrom<u32> for StoryDuration {
    type Error = DurationParseError;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        StoryDuration::from_secs(secs).ok_or(DurationParseError::Unsupported(secs))
    }
}

impl From<StoryDuration> for u32 {
    fn from(duration: StoryDuration) -> Self {
        duration.as_secs()
    }
}

impl FromStr for StoryDuration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('s');
        let secs: u32 = trimmed
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(s.to_string()))?;
        StoryDuration::try_from(secs)
    }
}

impl JsonSchema for StoryDuration {
    fn schema_name() -> String {
        "StoryDuration".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        u32::json_schema(gen)
    }
}

#[derive(Debug, Error)]
pub enum DurationParseError {
    #[error("Invalid duration: {0}")]
    InvalidNumber(String),
    #[error("Unsupported duration: {0}s (expected 15, 30 or 60)")]
    Unsupported(u32),
}

/// Aspect ratio specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Vertical (9:16) for Reels/Shorts
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    /// Ratios the generator can render.
    pub const SUPPORTED: &'static [AspectRatio] = &[AspectRatio::PORTRAIT, AspectRatio::SQUARE];

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn is_supported(&self) -> bool {
        AspectRatio::SUPPORTED.contains(self)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        let ratio = AspectRatio { width, height };
        if !ratio.is_supported() {
            return Err(AspectRatioParseError::Unsupported(ratio.to_string()));
        }

        Ok(ratio)
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = AspectRatioParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

impl JsonSchema for AspectRatio {
    fn schema_name() -> String {
        "AspectRatio".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
    #[error("Unsupported aspect ratio: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse() {
        assert_eq!("cinematic".parse::<VisualStyle>().unwrap(), VisualStyle::Cinematic);
        assert_eq!("Noir".parse::<VisualStyle>().unwrap(), VisualStyle::Noir);
        assert!("claymation".parse::<VisualStyle>().is_err());
    }

    #[test]
    fn test_style_serde_uses_ids() {
        let json = serde_json::to_string(&VisualStyle::Comic).unwrap();
        assert_eq!(json, "\"comic\"");
        assert_eq!(VisualStyle::Comic.display_name(), "Comic Book");
    }

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(StoryDuration::from_secs(15), Some(StoryDuration::Quick));
        assert_eq!(StoryDuration::from_secs(60), Some(StoryDuration::Mini));
        assert_eq!(StoryDuration::from_secs(45), None);
        assert_eq!("30s".parse::<StoryDuration>().unwrap(), StoryDuration::Short);
    }

    #[test]
    fn test_duration_serializes_as_seconds() {
        assert_eq!(serde_json::to_string(&StoryDuration::Short).unwrap(), "30");
        let parsed: StoryDuration = serde_json::from_str("60").unwrap();
        assert_eq!(parsed, StoryDuration::Mini);
        assert!(serde_json::from_str::<StoryDuration>("20").is_err());
    }

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::PORTRAIT);
        assert_eq!("1:1".parse::<AspectRatio>().unwrap(), AspectRatio::SQUARE);
        assert!(matches!(
            "4:5".parse::<AspectRatio>(),
            Err(AspectRatioParseError::Unsupported(_))
        ));
        assert!(matches!(
            "0:1".parse::<AspectRatio>(),
            Err(AspectRatioParseError::ZeroValue)
        ));
        assert!("wide".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_aspect_ratio_serializes_as_string() {
        let json = serde_json::to_string(&AspectRatio::PORTRAIT).unwrap();
        assert_eq!(json, "\"9:16\"");
        let parsed: AspectRatio = serde_json::from_str("\"1:1\"").unwrap();
        assert_eq!(parsed, AspectRatio::SQUARE);
    }
}
