//! Interval-driven polling of every provider into the tracking store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::ShipmentRecord;
use crate::ports::ShipmentSource;
use crate::service::TrackerService;
use crate::store::TrackingStore;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether any polling cycle is currently waiting on providers.
pub enum SchedulerState {
    /// No cycle in flight.
    Idle,
    /// At least one cycle is waiting for provider results.
    Fetching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Notifications published to whoever displays the tracked shipments.
pub enum TrackerEvent {
    /// No shipments are configured, so the (empty) store is final for now.
    Ready,
    /// A cycle produced a batch and it was merged into the store.
    Updated {
        /// Records the cycle produced, including ones the store discarded.
        records: Vec<ShipmentRecord>,
        /// Whether any store entry was overwritten.
        changed: bool,
    },
    /// The shipment list could not be read; the cycle was skipped.
    ConfigurationFailed {
        /// Human-readable failure.
        message: String,
    },
}

/// Shared view of how many cycles are in flight.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    in_flight: Arc<AtomicUsize>,
}

impl SchedulerStatus {
    /// Number of cycles still waiting on providers.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Current scheduler state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.in_flight() == 0 {
            SchedulerState::Idle
        } else {
            SchedulerState::Fetching
        }
    }

    fn enter(&self) -> CycleGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        CycleGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

struct CycleGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs a fetch cycle on every interval tick, starting immediately.
///
/// The next tick is armed as soon as a cycle starts, not when it finishes: a cycle slower
/// than the interval overlaps with the next one. Both merge into the same store, which
/// is safe because merges only overwrite whole entries for known codes.
pub struct PollScheduler {
    service: Arc<TrackerService>,
    store: Arc<TrackingStore>,
    source: Arc<dyn ShipmentSource>,
    interval: Duration,
    status: SchedulerStatus,
    events: Option<UnboundedSender<TrackerEvent>>,
}

impl PollScheduler {
    /// Create a scheduler polling `source` every `interval`.
    #[must_use]
    pub fn new(
        service: Arc<TrackerService>,
        store: Arc<TrackingStore>,
        source: Arc<dyn ShipmentSource>,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            store,
            source,
            interval: interval.max(MIN_INTERVAL),
            status: SchedulerStatus::default(),
            events: None,
        }
    }

    /// Publish a [`TrackerEvent`] after every cycle.
    #[must_use]
    pub fn with_events(mut self, events: UnboundedSender<TrackerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Handle for observing in-flight cycles.
    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        self.status.clone()
    }

    /// Store the scheduler merges into.
    #[must_use]
    pub fn store(&self) -> &Arc<TrackingStore> {
        &self.store
    }

    /// Tick until `shutdown` fires.
    ///
    /// Cycles already in flight when shutdown is requested run to completion on their own.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, "polling scheduler started");

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!(in_flight = self.status.in_flight(), "shutdown requested, no further cycles");
                    break;
                }

                _ = ticker.tick() => {
                    // Detached: the next tick never waits for this cycle.
                    drop(self.start_cycle());
                }
            }
        }
    }

    /// Read the shipment list and, if non-empty, spawn one fetch cycle.
    ///
    /// Returns the spawned cycle, or `None` when there was nothing to fetch.
    pub fn start_cycle(&self) -> Option<JoinHandle<()>> {
        let requests = match self.source.shipments() {
            Ok(requests) => requests,
            Err(err) => {
                warn!(error = %err, "could not read shipments, skipping cycle");
                publish(
                    self.events.as_ref(),
                    TrackerEvent::ConfigurationFailed {
                        message: err.to_string(),
                    },
                );
                return None;
            }
        };

        if self.store.needs_reset(&requests) {
            self.store.reset(&requests);
        }

        if requests.is_empty() {
            info!("no shipments configured, nothing to fetch");
            publish(self.events.as_ref(), TrackerEvent::Ready);
            return None;
        }

        info!(shipments = requests.len(), "starting tracking cycle");
        let guard = self.status.enter();
        let service = Arc::clone(&self.service);
        let store = Arc::clone(&self.store);
        let events = self.events.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            let records = service.fetch_all(&requests).await;
            if records.is_empty() {
                debug!("cycle produced no records");
                return;
            }

            let received = records.len();
            let changed = store.apply_batch(records.clone());
            info!(received, changed, "tracking cycle finished");
            publish(events.as_ref(), TrackerEvent::Updated { records, changed });
        }))
    }
}

fn publish(events: Option<&UnboundedSender<TrackerEvent>>, event: TrackerEvent) {
    if let Some(events) = events
        && events.send(event).is_err()
    {
        debug!("no listener for tracker events");
    }
}
