//! Video library persistence.
//!
//! This crate provides:
//! - The `VideoLibrary` contract used to mirror generation jobs into a user's library
//! - A Firestore REST implementation with service account auth, retries and metrics
//! - An in-memory implementation for tests and offline runs

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod repo;
pub mod retry;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{LibraryError, LibraryResult};
pub use memory::MemoryVideoLibrary;
pub use repo::{FirestoreVideoLibrary, VideoLibrary, VIDEOS_COLLECTION};
pub use retry::RetryConfig;
pub use token_cache::{Credentials, TokenCache};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
