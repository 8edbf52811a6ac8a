//! Polling a remote fine-tuning job until it reaches a terminal status.
//!
//! The loop is: poll, report, stop on `succeeded`/`failed`, otherwise sleep a
//! fixed interval and poll again. Sleeping goes through [`Sleeper`] so the loop
//! can be driven without real time passing.

use crate::error::{TrainingError, TrainingResult};
use crate::job::{JobHandle, JobStatus};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::trainer::FineTuningBackend;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default wait between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Give up after this many polls. `None` waits forever.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL, max_attempts: None }
    }
}

pub struct JobMonitor<'a> {
    backend: &'a dyn FineTuningBackend,
    sleeper: &'a dyn Sleeper,
    progress: &'a dyn ProgressSink,
    policy: PollPolicy,
}

impl<'a> JobMonitor<'a> {
    #[must_use]
    pub fn new(
        backend: &'a dyn FineTuningBackend,
        sleeper: &'a dyn Sleeper,
        progress: &'a dyn ProgressSink,
        policy: PollPolicy,
    ) -> Self {
        Self { backend, sleeper, progress, policy }
    }

    /// Polls until the job is terminal and returns the final handle.
    ///
    /// A failed job is returned as `Ok`; the caller decides what failure means.
    /// Transport errors end the wait immediately.
    pub async fn wait(&self, initial: JobHandle) -> TrainingResult<JobHandle> {
        if initial.is_terminal() {
            self.report_terminal(&initial);
            return Ok(initial);
        }

        let mut attempts: u32 = 0;
        let mut handle = initial;

        loop {
            handle = self.backend.poll(&handle.id).await?;
            attempts += 1;
            debug!(job_id = %handle.id, status = %handle.status, attempts, "Polled fine-tuning job");

            self.progress.on_event(ProgressEvent::Status {
                job_id: handle.id.clone(),
                status: handle.status,
                trained_tokens: handle.trained_tokens,
                attempt: attempts,
            });

            if handle.is_terminal() {
                self.report_terminal(&handle);
                return Ok(handle);
            }

            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(job_id = %handle.id, attempts, "Giving up on fine-tuning job");
                return Err(TrainingError::PollLimitExceeded {
                    job_id: handle.id,
                    status: handle.status,
                    attempts,
                });
            }

            self.sleeper.sleep(self.policy.interval).await;
        }
    }

    fn report_terminal(&self, handle: &JobHandle) {
        if let Some(model) = handle.fine_tuned_model() {
            info!(job_id = %handle.id, model, "Fine-tuning job succeeded");
            self.progress.on_event(ProgressEvent::Succeeded {
                job_id: handle.id.clone(),
                fine_tuned_model: Some(model.to_string()),
            });
        } else if handle.status == JobStatus::Succeeded {
            warn!(job_id = %handle.id, "Fine-tuning job succeeded without reporting a model");
            self.progress.on_event(ProgressEvent::Succeeded { job_id: handle.id.clone(), fine_tuned_model: None });
        } else {
            warn!(job_id = %handle.id, diagnostics = ?handle.diagnostics, "Fine-tuning job failed");
            self.progress.on_event(ProgressEvent::Failed {
                job_id: handle.id.clone(),
                diagnostics: handle.diagnostics.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, JobStatus};
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    /// Backend that replays a fixed sequence of poll results.
    struct ScriptedBackend {
        polls: Mutex<VecDeque<TrainingResult<JobHandle>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn new(polls: Vec<TrainingResult<JobHandle>>) -> Self {
            Self { polls: Mutex::new(polls.into()), calls: Mutex::new(0) }
        }

        fn statuses(statuses: &[JobStatus]) -> Self {
            Self::new(
                statuses
                    .iter()
                    .map(|s| {
                        let handle = JobHandle::new("ftjob-1", *s);
                        Ok(if *s == JobStatus::Succeeded { handle.with_fine_tuned_model("ft:tuned") } else { handle })
                    })
                    .collect(),
            )
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl FineTuningBackend for ScriptedBackend {
        fn id(&self) -> &'static str {
            "scripted"
        }

        async fn upload_training_file(&self, _path: &Path) -> TrainingResult<String> {
            Ok("file-1".to_string())
        }

        async fn create_job(&self, _training_file: &str, _base_model: &str) -> TrainingResult<JobHandle> {
            Ok(JobHandle::new("ftjob-1", JobStatus::Queued))
        }

        async fn poll(&self, job_id: &JobId) -> TrainingResult<JobHandle> {
            assert_eq!(job_id.0, "ftjob-1");
            *self.calls.lock().unwrap() += 1;
            self.polls.lock().unwrap().pop_front().expect("poll called more often than scripted")
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_event(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn queued() -> JobHandle {
        JobHandle::new("ftjob-1", JobStatus::Queued)
    }

    #[tokio::test]
    async fn test_succeeds_after_third_poll() {
        let backend = ScriptedBackend::statuses(&[JobStatus::Queued, JobStatus::Running, JobStatus::Succeeded]);
        let sleeper = RecordingSleeper::default();
        let sink = RecordingSink::default();

        let monitor = JobMonitor::new(&backend, &sleeper, &sink, PollPolicy::default());
        let handle = monitor.wait(queued()).await.unwrap();

        assert_eq!(backend.calls(), 3);
        assert_eq!(handle.fine_tuned_model(), Some("ft:tuned"));
        assert_eq!(*sleeper.slept.lock().unwrap(), vec![DEFAULT_POLL_INTERVAL; 2]);

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[3],
            ProgressEvent::Succeeded {
                job_id: JobId("ftjob-1".to_string()),
                fine_tuned_model: Some("ft:tuned".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_failure_ends_after_second_poll() {
        let backend = ScriptedBackend::new(vec![
            Ok(queued()),
            Ok(JobHandle::new("ftjob-1", JobStatus::Failed).with_diagnostics("invalid_file: bad line")),
        ]);
        let sleeper = RecordingSleeper::default();
        let sink = RecordingSink::default();

        let monitor = JobMonitor::new(&backend, &sleeper, &sink, PollPolicy::default());
        let handle = monitor.wait(queued()).await.unwrap();

        assert_eq!(backend.calls(), 2);
        assert_eq!(handle.status, JobStatus::Failed);
        assert_eq!(handle.fine_tuned_model(), None);
        assert!(matches!(
            sink.events.lock().unwrap().last(),
            Some(ProgressEvent::Failed { diagnostics: Some(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_poll_limit() {
        let backend = ScriptedBackend::statuses(&[JobStatus::Queued, JobStatus::Running]);
        let sleeper = RecordingSleeper::default();
        let sink = RecordingSink::default();
        let policy = PollPolicy { interval: Duration::from_secs(5), max_attempts: Some(2) };

        let err = JobMonitor::new(&backend, &sleeper, &sink, policy).wait(queued()).await.unwrap_err();

        match err {
            TrainingError::PollLimitExceeded { status, attempts, .. } => {
                assert_eq!(status, JobStatus::Running);
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn test_transport_error_stops_polling() {
        let backend = ScriptedBackend::new(vec![
            Ok(queued()),
            Err(TrainingError::Transport(tuneline_abstraction::ModelError::RequestError("down".to_string()))),
        ]);
        let sleeper = RecordingSleeper::default();
        let sink = RecordingSink::default();

        let err = JobMonitor::new(&backend, &sleeper, &sink, PollPolicy::default()).wait(queued()).await;
        assert!(matches!(err, Err(TrainingError::Transport(_))));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_terminal_initial_handle_is_not_polled() {
        let backend = ScriptedBackend::new(vec![]);
        let sleeper = RecordingSleeper::default();
        let sink = RecordingSink::default();
        let done = JobHandle::new("ftjob-1", JobStatus::Succeeded).with_fine_tuned_model("ft:x");

        let handle = JobMonitor::new(&backend, &sleeper, &sink, PollPolicy::default())
            .wait(done.clone())
            .await
            .unwrap();

        assert_eq!(handle, done);
        assert_eq!(backend.calls(), 0);
    }
}
