//! Polling controller for the live-tracking view.
//!
//! The controller owns at most one [`PollingSession`] at a time. Starting a
//! session performs an immediate fetch+render cycle and then repeats at a
//! fixed interval; starting again (same or different entity) cancels the
//! previous session before the new one is scheduled, so two timers can never
//! draw to the same layer. A cycle whose fetch fails is reported and the
//! polling continues; a temporary network blip must not stop the live view.
//!
//! Cancellation does not abort an in-flight request. Instead every session
//! carries a generation tag, and a response whose generation is no longer
//! current is discarded before it can touch the map, so a stale fetch cannot
//! overwrite a fresher render.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::map::{MapContext, ViewportState};
use crate::telemetry::{PositionSource, TrackedEntity};

/// What happened during one polling cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The fetch succeeded and the overlay was redrawn.
    Rendered {
        /// Number of samples handed to the renderer.
        samples: usize,
    },
    /// The fetch failed; the previous frame is still on screen.
    Failed {
        /// User-visible error description.
        error: String,
    },
}

/// Status of one completed polling cycle, for a front-end to display.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Entity the cycle polled.
    pub entity: TrackedEntity,
    /// What the cycle did.
    pub outcome: TickOutcome,
    /// Viewport after the cycle.
    pub viewport: ViewportState,
    /// When the cycle completed.
    pub at: DateTime<Utc>,
}

/// One tracked entity tied to one repeating timer.
#[derive(Debug)]
pub struct PollingSession {
    entity: TrackedEntity,
    cancel: Arc<AtomicBool>,
}

impl PollingSession {
    /// The entity this session polls.
    #[must_use]
    pub fn entity(&self) -> &TrackedEntity {
        &self.entity
    }

    /// Stop the session's timer. Idempotent.
    ///
    /// A fetch already in flight keeps running; its result goes stale via the
    /// generation counter instead of being aborted.
    fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// Owns the polling lifecycle: start, stop, restart-on-selection-change.
pub struct TrackingController {
    source: Arc<dyn PositionSource>,
    map: Arc<Mutex<MapContext>>,
    interval: Duration,
    reports: mpsc::Sender<TickReport>,
    generation: Arc<AtomicU64>,
    session: Option<PollingSession>,
}

impl std::fmt::Debug for TrackingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingController")
            .field("interval", &self.interval)
            .field("active", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl TrackingController {
    /// Create an idle controller.
    ///
    /// `reports` receives one [`TickReport`] per completed cycle.
    #[must_use]
    pub fn new(
        source: Arc<dyn PositionSource>,
        map: Arc<Mutex<MapContext>>,
        interval: Duration,
        reports: mpsc::Sender<TickReport>,
    ) -> Self {
        Self {
            source,
            map,
            interval,
            reports,
            generation: Arc::new(AtomicU64::new(0)),
            session: None,
        }
    }

    /// Whether a session is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The entity being tracked, if any.
    #[must_use]
    pub fn active_entity(&self) -> Option<&TrackedEntity> {
        self.session.as_ref().map(PollingSession::entity)
    }

    /// Start tracking `entity`.
    ///
    /// If a session is already active it is cancelled first; the replacement
    /// is atomic from the caller's point of view and exactly one timer is
    /// live afterwards. The first cycle runs immediately.
    pub fn start(&mut self, entity: TrackedEntity) {
        self.stop();

        let tag = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = Arc::new(AtomicBool::new(false));

        debug!(entity_id = entity.id, name = %entity.name, "starting polling session");

        // Detached on purpose: the loop exits on its own once cancelled.
        drop(tokio::spawn(poll_loop(
            Arc::clone(&self.source),
            Arc::clone(&self.map),
            entity.clone(),
            self.interval,
            tag,
            Arc::clone(&self.generation),
            Arc::clone(&cancel),
            self.reports.clone(),
        )));

        self.session = Some(PollingSession { entity, cancel });
    }

    /// Stop the active session, if any.
    ///
    /// The timer is released unconditionally; a fetch already in flight is
    /// not aborted but its result will be discarded as stale.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(entity_id = session.entity.id, "stopping polling session");
            // Bump the generation first so an in-flight response goes stale
            // before the timer is released.
            self.generation.fetch_add(1, Ordering::SeqCst);
            session.cancel();
        }
    }
}

impl Drop for TrackingController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The repeating fetch+render loop of one session.
#[allow(clippy::too_many_arguments)]
async fn poll_loop(
    source: Arc<dyn PositionSource>,
    map: Arc<Mutex<MapContext>>,
    entity: TrackedEntity,
    interval: Duration,
    tag: u64,
    generation: Arc<AtomicU64>,
    cancel: Arc<AtomicBool>,
    reports: mpsc::Sender<TickReport>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        // The first tick resolves immediately, so the initial cycle runs
        // right at start.
        ticker.tick().await;
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        run_cycle(&*source, &map, &entity, tag, &generation, &reports).await;
    }
    debug!(entity_id = entity.id, "polling session finished");
}

/// One fetch+render cycle. Within the cycle the fetch completes before the
/// render begins; a stale response (generation moved on) is dropped.
async fn run_cycle(
    source: &dyn PositionSource,
    map: &Arc<Mutex<MapContext>>,
    entity: &TrackedEntity,
    tag: u64,
    generation: &AtomicU64,
    reports: &mpsc::Sender<TickReport>,
) {
    let result = source.positions(entity.id).await;

    let report = {
        let mut map = map.lock().await;
        // The generation may move on while this cycle is awaiting the fetch
        // OR parked on the map lock behind a replacement session. Checked
        // under the lock so a stale cycle can neither render nor report.
        if generation.load(Ordering::SeqCst) != tag {
            debug!(entity_id = entity.id, "discarding stale polling response");
            return;
        }

        match result {
            Ok(samples) => {
                map.render(&samples);
                TickReport {
                    entity: entity.clone(),
                    outcome: TickOutcome::Rendered {
                        samples: samples.len(),
                    },
                    viewport: map.viewport(),
                    at: Utc::now(),
                }
            }
            Err(error) => {
                // Transient fault: report it and keep polling.
                warn!(entity_id = entity.id, %error, "polling cycle failed");
                TickReport {
                    entity: entity.clone(),
                    outcome: TickOutcome::Failed {
                        error: error.to_string(),
                    },
                    viewport: map.viewport(),
                    at: Utc::now(),
                }
            }
        }
    };

    let _ = reports.send(report).await;
}
