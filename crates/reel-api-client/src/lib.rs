//! Client for the story generation service.
//!
//! This crate provides:
//! - `JobService`, the create/get/cancel contract the orchestrator depends on
//! - `StoryApiClient`, the HTTP implementation of that contract
//! - `poll_until_terminal`, the sequential long-poll helper

pub mod client;
pub mod error;
pub mod poll;
pub mod service;
pub mod types;

pub use client::{resolve_against, ApiClientConfig, StoryApiClient};
pub use error::{ApiError, ApiResult};
pub use poll::{poll_until_terminal, PollError, PollResult};
pub use service::JobService;
pub use types::{CreateStoryRequest, CreateStoryResponse, HealthResponse, StorySummary};
