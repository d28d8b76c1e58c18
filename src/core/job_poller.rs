//! Job submission and completion polling.
//!
//! A job is submitted once, then its status endpoint is polled at a fixed
//! interval until it reaches a terminal result or the deadline passes.
//! Network errors while polling end the wait; re-submitting is the
//! caller's decision.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::JobBackend;
use crate::config::JobSettings;
use crate::domain::{Job, JobId, JobPayload, JobStatus, TerminalResult};
use crate::error::{OrchestratorError, Result};
use crate::presentation::{ArtifactPlacement, Placement, Presentation, StatusChannel, StatusSink};

/// Reason reported when a finished job carries no artifact reference
pub const MISSING_ARTIFACT: &str = "missing artifact";

/// Timeout and interval applied while awaiting a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl From<&JobSettings> for PollPolicy {
    fn from(settings: &JobSettings) -> Self {
        Self::new(settings.timeout(), settings.poll_interval())
    }
}

/// Exclusive handle to a submitted job; consumed by awaiting it
#[derive(Debug)]
pub struct JobHandle {
    job: Job,
}

impl JobHandle {
    /// Track a job that was submitted elsewhere (e.g. in an earlier call)
    pub fn attach(id: JobId, timeout: Duration) -> Self {
        Self {
            job: Job::new(id, JobStatus::Submitted, timeout),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.job.id
    }

    pub fn job(&self) -> &Job {
        &self.job
    }
}

/// Resets the in-flight flag when a generate call ends
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Submits generation jobs and waits for their terminal result
#[derive(Clone)]
pub struct JobPoller {
    backend: Arc<dyn JobBackend>,
    placement: Arc<dyn ArtifactPlacement>,
    status: Arc<dyn StatusSink>,
    policy: PollPolicy,
    in_flight: Arc<AtomicBool>,
}

impl JobPoller {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        presentation: &Presentation,
        policy: PollPolicy,
    ) -> Self {
        Self {
            backend,
            placement: presentation.placement.clone(),
            status: presentation.status.clone(),
            policy,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Whether a `generate` call is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn set_status(&self, text: &str) {
        self.status.set_status(StatusChannel::Job, text);
    }

    /// Submit a job and return its handle.
    ///
    /// The accept call is bounded by the job timeout; any failure is a
    /// [`OrchestratorError::Submission`].
    #[instrument(skip(self, payload), fields(name = %payload.name(), bytes = payload.size_bytes()))]
    pub async fn submit(&self, payload: &JobPayload) -> Result<JobHandle> {
        self.set_status("Sending to generator...");

        let accepted = match timeout(self.policy.timeout, self.backend.submit_job(payload)).await {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(e)) => {
                let err = OrchestratorError::Submission(e.to_string());
                error!(error = %e, "Job submission failed");
                self.set_status(&err.status_text());
                return Err(err);
            }
            Err(_) => {
                let err = OrchestratorError::Submission(format!(
                    "no answer within {:?}",
                    self.policy.timeout
                ));
                error!("Job submission timed out");
                self.set_status(&err.status_text());
                return Err(err);
            }
        };

        let status = JobStatus::parse_remote(&accepted.status).unwrap_or(JobStatus::Submitted);
        info!(job_id = %accepted.job_id, ?status, "Job submitted");
        self.set_status(&format!("Job submitted ({})", accepted.job_id));

        Ok(JobHandle {
            job: Job::new(accepted.job_id, status, self.policy.timeout),
        })
    }

    /// Await a job under the configured policy
    pub async fn await_job(&self, handle: JobHandle) -> TerminalResult {
        self.await_with(handle, self.policy.timeout, self.policy.interval)
            .await
    }

    /// Poll until the job reaches a terminal result.
    ///
    /// `timeout` is measured from submission. Never returns later than the
    /// deadline: status calls are cut off at the deadline and the sleep
    /// between polls is shortened to fit.
    #[instrument(skip(self, handle), fields(job_id = %handle.id()))]
    pub async fn await_with(
        &self,
        handle: JobHandle,
        timeout_after: Duration,
        interval: Duration,
    ) -> TerminalResult {
        let job = handle.job.with_timeout(timeout_after);
        let mut dots = 0usize;

        self.set_status("Processing");

        loop {
            if job.is_expired() {
                warn!(elapsed_ms = job.elapsed().as_millis() as u64, "Job timed out");
                self.set_status("Generation timed out. Try again.");
                return TerminalResult::TimedOut;
            }

            let report = match timeout(job.remaining(), self.backend.job_status(&job.id)).await {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => {
                    error!(error = %e, "Job status request failed");
                    self.set_status(&format!("Status error: {}", e));
                    return TerminalResult::failure(format!("status request failed: {}", e));
                }
                Err(_) => {
                        warn!("Job timed out during status request");
                    self.set_status("Generation timed out. Try again.");
                    return TerminalResult::TimedOut;
                }
            };

            match JobStatus::parse_remote(&report.status) {
                Some(status @ (JobStatus::Submitted | JobStatus::Running)) => {
                    dots = (dots + 1) % 4;
                    let progress = format!("Processing{}", ".".repeat(dots));
                    debug!(?status, "{}", progress);
                    self.set_status(&progress);

                    tokio::time::sleep(interval.min(job.remaining())).await;
                }
                Some(JobStatus::Done) => {
                    let artifact_ref = report.artifact_ref.filter(|r| !r.trim().is_empty());

                    return match artifact_ref {
                        Some(artifact_ref) => {
                            info!(%artifact_ref, "Job done");
                            self.set_status("Artifact ready");
                            TerminalResult::Success { artifact_ref }
                        }
                        None => {
                            error!("Job done without an artifact reference");
                            self.set_status("Job done but no artifact reference.");
                            TerminalResult::failure(MISSING_ARTIFACT)
                        }
                    };
                }
                Some(JobStatus::Failed) => {
                    error!("Job failed remotely");
                    self.set_status("Generation failed. Try again.");
                    return TerminalResult::failure("remote job failed");
                }
                Some(JobStatus::TimedOut) | None => {
                    error!(status = %report.status, "Unrecognized job status");
                    self.set_status(&format!("Unknown status: {}", report.status));
                    return TerminalResult::failure(format!(
                        "unrecognized status '{}'",
                        report.status
                    ));
                }
            }
        }
    }

    /// Submit, await, and place the artifact on success.
    ///
    /// Refuses with [`OrchestratorError::Busy`] while another `generate` on
    /// this poller is outstanding.
    pub async fn generate(&self, payload: JobPayload) -> Result<TerminalResult> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            let err = OrchestratorError::Busy;
            warn!(name = %payload.name(), "Generation refused; another job is in flight");
            self.set_status(&err.status_text());
            return Err(err);
        };

        let handle = self.submit(&payload).await?;
        let result = self.await_job(handle).await;

        if let TerminalResult::Success { artifact_ref } = &result {
            self.placement.place_artifact(&Placement {
                artifact_ref: Some(artifact_ref.clone()),
                anchor: None,
                name: Some(payload.name().to_string()),
            });
        }

        Ok(result)
    }

    /// Run [`generate`](Self::generate) as a background task
    pub fn spawn_generate(&self, payload: JobPayload) -> JoinHandle<Result<TerminalResult>> {
        let poller = self.clone();
        tokio::spawn(async move { poller.generate(payload).await })
    }
}
