//! Orchestrator configuration.

use std::time::Duration;

const DEFAULT_RESULT_BASE_URL: &str = "http://localhost:8000";

/// Weights used to turn scene completeness into a percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Progress reported before any scene exists
    pub initializing_floor: u8,
    /// Progress granted once scenes are known
    pub accepted_base: u8,
    /// Share of the bar for narration audio
    pub audio_weight: u8,
    /// Share of the bar for scene video
    pub video_weight: u8,
    /// Highest value reported while the job is still running, at most 99
    pub cap: u8,
}

impl ProgressConfig {
    /// Highest value a running job may show; 100 is reserved for completion.
    pub fn running_cap(&self) -> u8 {
        self.cap.min(99)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            initializing_floor: 5,
            accepted_base: 10,
            audio_weight: 30,
            video_weight: 50,
            cap: 99,
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Delay between two status polls
    pub poll_interval: Duration,
    /// Minimum prompt length in characters, after trimming
    pub min_prompt_len: usize,
    /// Base URL relative result paths are resolved against
    pub result_base_url: String,
    pub progress: ProgressConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            min_prompt_len: 1,
            result_base_url: DEFAULT_RESULT_BASE_URL.to_string(),
            progress: ProgressConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    ///
    /// The result base URL falls back to `STORY_API_URL` so relative paths
    /// resolve against the service that produced them.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(
                std::env::var("GENERATION_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|ms: &u64| *ms > 0)
                    .unwrap_or(2000),
            ),
            min_prompt_len: std::env::var("GENERATION_MIN_PROMPT_LEN")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1),
            result_base_url: std::env::var("GENERATION_RESULT_BASE_URL")
                .or_else(|_| std::env::var("STORY_API_URL"))
                .unwrap_or_else(|_| DEFAULT_RESULT_BASE_URL.to_string()),
            progress: ProgressConfig::default(),
        }
    }
}
