//! Remote job contract consumed by the orchestrator.

use async_trait::async_trait;
use reel_models::{GenerationRequest, JobId, JobSnapshot};

use crate::error::ApiResult;

/// Create, inspect and cancel remote generation jobs.
///
/// Implementations hold no job state; every call is an independent round trip.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submit a new job. Never retried by implementations.
    async fn create_job(&self, request: &GenerationRequest) -> ApiResult<JobId>;

    /// Fetch the latest raw status of a job.
    async fn get_job_status(&self, job_id: &JobId) -> ApiResult<JobSnapshot>;

    /// Ask the service to stop a job.
    ///
    /// May fail for jobs that already finished; callers treat that as "did not
    /// take effect", not as a job failure.
    async fn cancel_job(&self, job_id: &JobId) -> ApiResult<()>;
}
