//! Sequential long-poll helper.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use reel_models::{JobId, JobSnapshot, RemoteJobStatus};

use crate::error::ApiError;
use crate::service::JobService;

/// Message used when the service fails a job without saying why.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Video generation failed";

pub type PollResult<T> = Result<T, PollError>;

/// Ways a poll loop ends without a completed job.
#[derive(Debug, Error)]
pub enum PollError {
    /// A status fetch failed; the loop does not retry.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The service reported `failed`.
    #[error("{0}")]
    JobFailed(String),

    /// The local cancellation signal fired between iterations.
    #[error("Polling cancelled")]
    Cancelled,

    /// The service reported the job as cancelled.
    #[error("Job was cancelled by the service")]
    RemoteCancelled,
}

/// Poll `job_id` until it reaches a terminal status.
///
/// Each iteration is one `get_job_status` round trip followed by `interval`
/// of sleep; iterations never overlap. `on_snapshot` sees every snapshot in
/// order, terminal ones included. The cancellation signal is only honored
/// between iterations: an in-flight request always completes first.
pub async fn poll_until_terminal<F>(
    service: &dyn JobService,
    job_id: &JobId,
    interval: Duration,
    mut on_snapshot: F,
    mut cancel: Option<watch::Receiver<bool>>,
) -> PollResult<JobSnapshot>
where
    F: FnMut(&JobSnapshot) + Send,
{
    let mut attempt: u64 = 0;

    loop {
        if is_cancelled(&cancel) {
            debug!(job_id = %job_id, attempt, "Poll loop cancelled");
            return Err(PollError::Cancelled);
        }

        attempt += 1;
        let snapshot = service.get_job_status(job_id).await?;

        debug!(
            job_id = %job_id,
            attempt,
            status = %snapshot.status,
            scenes = snapshot.scenes.len(),
            "Polled job status"
        );

        on_snapshot(&snapshot);

        match snapshot.status {
            RemoteJobStatus::Completed => return Ok(snapshot),
            RemoteJobStatus::Failed => {
                let message = snapshot
                    .error_message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                return Err(PollError::JobFailed(message));
            }
            RemoteJobStatus::Cancelled => return Err(PollError::RemoteCancelled),
            _ => {}
        }

        wait(interval, &mut cancel).await;
    }
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Sleep for `interval`, waking early if the cancellation signal changes.
async fn wait(interval: Duration, cancel: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = cancel.as_mut() else {
        tokio::time::sleep(interval).await;
        return;
    };

    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    tokio::select! {
        _ = &mut sleep => {}
        changed = rx.changed() => {
            if changed.is_err() {
                // Sender dropped: nobody can cancel anymore, finish the sleep.
                *cancel = None;
                sleep.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reel_models::{GenerationRequest, SceneStatus};

    use crate::error::ApiResult;

    /// Replays scripted status responses in order.
    struct ScriptedService {
        responses: Mutex<VecDeque<ApiResult<JobSnapshot>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedService {
        fn new(responses: Vec<ApiResult<JobSnapshot>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl JobService for ScriptedService {
        async fn create_job(&self, _request: &GenerationRequest) -> ApiResult<JobId> {
            Ok(JobId::from("job-1"))
        }

        async fn get_job_status(&self, _job_id: &JobId) -> ApiResult<JobSnapshot> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(JobSnapshot::with_status(RemoteJobStatus::Running)))
        }

        async fn cancel_job(&self, _job_id: &JobId) -> ApiResult<()> {
            Ok(())
        }
    }

    fn running(scenes: Vec<SceneStatus>) -> ApiResult<JobSnapshot> {
        Ok(JobSnapshot {
            status: RemoteJobStatus::Running,
            scenes,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_resolves_on_completed_and_reports_every_snapshot() {
        let service = ScriptedService::new(vec![
            running(vec![]),
            running(vec![SceneStatus::new(1)]),
            Ok(JobSnapshot {
                status: RemoteJobStatus::Completed,
                result_url: Some("/files/job-1.mp4".into()),
                ..Default::default()
            }),
        ]);

        let mut seen = Vec::new();
        let result = poll_until_terminal(
            &service,
            &JobId::from("job-1"),
            Duration::from_millis(1),
            |s| seen.push(s.status),
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.result_url(), Some("/files/job-1.mp4"));
        assert_eq!(
            seen,
            vec![
                RemoteJobStatus::Running,
                RemoteJobStatus::Running,
                RemoteJobStatus::Completed
            ]
        );
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test]
    async fn test_rejects_on_failed_with_message() {
        let service = ScriptedService::new(vec![Ok(JobSnapshot {
            status: RemoteJobStatus::Failed,
            error_message: Some("scene 2 render crashed".into()),
            ..Default::default()
        })]);

        let err = poll_until_terminal(
            &service,
            &JobId::from("job-1"),
            Duration::from_millis(1),
            |_| {},
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PollError::JobFailed(ref m) if m == "scene 2 render crashed"));
    }

    #[tokio::test]
    async fn test_failed_without_message_uses_default() {
        let service =
            ScriptedService::new(vec![Ok(JobSnapshot::with_status(RemoteJobStatus::Failed))]);

        let err = poll_until_terminal(
            &service,
            &JobId::from("job-1"),
            Duration::from_millis(1),
            |_| {},
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), DEFAULT_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let service = ScriptedService::new(vec![
            running(vec![]),
            Err(ApiError::ServiceUnavailable("502".into())),
        ]);

        let err = poll_until_terminal(
            &service,
            &JobId::from("job-1"),
            Duration::from_millis(1),
            |_| {},
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PollError::Api(ApiError::ServiceUnavailable(_))));
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancel_signal_stops_between_iterations() {
        let service = ScriptedService::new(vec![]);
        let (tx, rx) = watch::channel(false);

        let mut polls = 0;
        let err = poll_until_terminal(
            &service,
            &JobId::from("job-1"),
            Duration::from_secs(60),
            |_| {
                polls += 1;
                tx.send(true).unwrap();
            },
            Some(rx),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PollError::Cancelled));
        assert_eq!(polls, 1);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_request() {
        let service = ScriptedService::new(vec![]);
        let (_tx, rx) = watch::channel(true);

        let err = poll_until_terminal(
            &service,
            &JobId::from("job-1"),
            Duration::from_millis(1),
            |_| {},
            Some(rx),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PollError::Cancelled));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_cancelled_status() {
        let service =
            ScriptedService::new(vec![Ok(JobSnapshot::with_status(RemoteJobStatus::Cancelled))]);

        let err = poll_until_terminal(
            &service,
            &JobId::from("job-1"),
            Duration::from_millis(1),
            |_| {},
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PollError::RemoteCancelled));
    }
}
