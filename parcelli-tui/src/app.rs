use std::sync::Arc;

use parcelli_core::{
    model::ShipmentRecord,
    normalize::Normalizer,
    scheduler::{SchedulerState, SchedulerStatus, TrackerEvent},
    store::TrackingStore,
};

pub(crate) struct App {
    pub store: Arc<TrackingStore>,
    pub normalizer: Arc<Normalizer>,
    pub scheduler: SchedulerStatus,
    pub providers: Vec<String>,

    pub shipments: Vec<ShipmentRecord>,
    pub list_index: usize,
    pub ready: bool,
    pub suspended: bool,

    pub last_update: Option<String>,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(
        store: Arc<TrackingStore>,
        normalizer: Arc<Normalizer>,
        scheduler: SchedulerStatus,
        providers: Vec<String>,
    ) -> Self {
        Self {
            store,
            normalizer,
            scheduler,
            providers,
            shipments: Vec::new(),
            list_index: 0,
            ready: false,
            suspended: false,
            last_update: None,
            error_message: None,
        }
    }

    pub(crate) fn is_fetching(&self) -> bool {
        self.scheduler.state() == SchedulerState::Fetching
    }

    /// Apply a scheduler notification; returns whether the view was refreshed.
    pub(crate) fn handle_event(&mut self, event: TrackerEvent) -> bool {
        match event {
            TrackerEvent::Ready => self.refresh(),
            TrackerEvent::Updated { changed, .. } => {
                self.error_message = None;
                self.last_update = Some(self.normalizer.now());
                changed && self.refresh()
            }
            TrackerEvent::ConfigurationFailed { message } => {
                self.error_message = Some(message);
                false
            }
        }
    }

    /// Re-read the store unless the display is suspended.
    pub(crate) fn refresh(&mut self) -> bool {
        if self.suspended {
            return false;
        }
        self.ready = self.ready || self.store.is_ready();
        self.shipments = self.store.snapshot(&self.normalizer);
        self.list_index = self.list_index.min(self.shipments.len().saturating_sub(1));
        true
    }

    pub(crate) fn toggle_suspended(&mut self) {
        self.suspended = !self.suspended;
        if !self.suspended {
            self.refresh();
        }
    }

    pub(crate) fn select_previous(&mut self) {
        self.list_index = self.list_index.saturating_sub(1);
    }

    pub(crate) fn select_next(&mut self) {
        if self.list_index + 1 < self.shipments.len() {
            self.list_index += 1;
        }
    }
}
