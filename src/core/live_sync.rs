//! Live state synchronization.
//!
//! Polls the ambient live-state endpoint on a fixed interval and forwards
//! only what changed: segment changes to [`SegmentActivation`], coordinate
//! changes to [`SelectionUpdate`]. Poll failures are logged (throttled) and
//! never stop the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::adapters::LiveStateBackend;
use crate::config::LiveSettings;
use crate::core::throttle::LogThrottle;
use crate::domain::{LiveDiff, LiveState, SegmentChange};
use crate::error::{OrchestratorError, Result};
use crate::presentation::{Presentation, SegmentActivation, SelectionUpdate};

/// Result of a single poll
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The remote reported the same state as last time
    Unchanged,
    /// Something changed and was forwarded downstream
    Propagated(LiveDiff),
    /// The poll failed; the previous state is kept
    Failed(OrchestratorError),
}

impl PollOutcome {
    pub fn is_propagated(&self) -> bool {
        matches!(self, Self::Propagated(_))
    }
}

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveStats {
    pub polls: u64,
    pub propagated: u64,
    pub errors: u64,
}

/// Polls the live-state endpoint and forwards changes
pub struct LiveSynchronizer {
    backend: Arc<dyn LiveStateBackend>,
    segments: Arc<dyn SegmentActivation>,
    selection: Arc<dyn SelectionUpdate>,
    settings: LiveSettings,
    request_timeout: Duration,
    last: Option<LiveState>,
    throttle: LogThrottle,
    snapshots: watch::Sender<Option<LiveState>>,
    stats: LiveStats,
}

impl LiveSynchronizer {
    pub fn new(
        backend: Arc<dyn LiveStateBackend>,
        presentation: &Presentation,
        settings: LiveSettings,
        request_timeout: Duration,
    ) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            backend,
            segments: presentation.segments.clone(),
            selection: presentation.selection.clone(),
            throttle: LogThrottle::new(settings.error_cooldown()),
            settings,
            request_timeout,
            last: None,
            snapshots,
            stats: LiveStats::default(),
        }
    }

    /// Last accepted snapshot
    pub fn last(&self) -> Option<&LiveState> {
        self.last.as_ref()
    }

    pub fn stats(&self) -> LiveStats {
        self.stats
    }

    /// Observe accepted snapshots as they change
    pub fn subscribe(&self) -> watch::Receiver<Option<LiveState>> {
        self.snapshots.subscribe()
    }

    /// Log whether the companion health endpoint answers.
    ///
    /// Advisory only: returns the outcome but never blocks polling.
    pub async fn probe_health(&self) -> bool {
        match timeout(self.request_timeout, self.backend.health()).await {
            Ok(Ok(())) => {
                info!("Live backend healthy");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Live backend not healthy");
                false
            }
            Err(_) => {
                warn!("Live backend health check timed out");
                false
            }
        }
    }

    async fn fetch(&self) -> Result<LiveState> {
        match timeout(self.request_timeout, self.backend.live_state()).await {
            Ok(report) => report.map(LiveState::from_report),
            Err(_) => Err(OrchestratorError::Timeout(self.request_timeout)),
        }
    }

    /// Fetch once and forward whatever changed.
    ///
    /// A segment change is forwarded before a coordinate change from the
    /// same poll. The stored snapshot only moves when something propagated.
    pub async fn poll_once(&mut self) -> PollOutcome {
        self.stats.polls += 1;

        let state = match self.fetch().await {
            Ok(state) => state,
            Err(e) => {
                self.stats.errors += 1;
                if let Some(suppressed) = self.throttle.admit() {
                    warn!(error = %e, suppressed, "Live state poll failed");
                }
                return PollOutcome::Failed(e);
            }
        };

        let diff = state.diff(self.last.as_ref(), self.settings.coordinate_tolerance);
        if !diff.any() {
            return PollOutcome::Unchanged;
        }

        if diff.segment_changed {
            let change = SegmentChange {
                segment_id: state.segment_id.clone(),
                previous: self.last.as_ref().and_then(|s| s.segment_id.clone()),
                policy: self.settings.segment_switch,
            };
            debug!(
                segment = change.segment_id.as_deref().unwrap_or("-"),
                previous = change.previous.as_deref().unwrap_or("-"),
                "Segment changed"
            );
            self.segments.activate_segment(&change);
        }

        if diff.coords_changed {
            self.selection.select_at(state.x, state.y);
        }

        self.stats.propagated += 1;
        self.last = Some(state.clone());
        self.snapshots.send_replace(Some(state));

        PollOutcome::Propagated(diff)
    }

    /// Run the poll loop as a background task.
    ///
    /// The health probe runs first. The loop stops cooperatively: a stop
    /// request lets an in-flight poll finish and its effects apply, then
    /// no further poll starts.
    pub fn start(self) -> LiveSyncHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let snapshots = self.subscribe();
        let task = tokio::spawn(self.run(stop_rx));

        LiveSyncHandle {
            stop: stop_tx,
            task,
            snapshots,
        }
    }

    #[instrument(name = "live_sync", skip_all)]
    async fn run(mut self, mut stop: watch::Receiver<bool>) -> LiveStats {
        self.probe_health().await;

        let interval = self.settings.poll_interval();
        info!(interval_ms = interval.as_millis() as u64, "Live sync started");

        loop {
            if *stop.borrow() {
                break;
            }

            self.poll_once().await;

            if *stop.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = stop.changed() => {
                    // Sender dropped counts as a stop request
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            polls = self.stats.polls,
            propagated = self.stats.propagated,
            errors = self.stats.errors,
            "Live sync stopped"
        );
        self.stats
    }
}

/// Control handle for a running synchronizer
pub struct LiveSyncHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<LiveStats>,
    snapshots: watch::Receiver<Option<LiveState>>,
}

impl LiveSyncHandle {
    /// Most recent accepted snapshot
    pub fn snapshot(&self) -> Option<LiveState> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LiveState>> {
        self.snapshots.clone()
    }

    /// Request a stop and wait for the loop to finish its current poll
    pub async fn stop(self) -> LiveStats {
        let _ = self.stop.send(true);
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Live sync task ended abnormally");
                LiveStats::default()
            }
        }
    }
}
