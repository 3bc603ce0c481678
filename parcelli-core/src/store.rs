//! Keyed store of the latest known state of every requested shipment.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::model::{ShipmentRecord, ShipmentRequest};
use crate::normalize::Normalizer;

#[derive(Debug, Default)]
struct Entries {
    records: HashMap<String, ShipmentRecord>,
    seeded_with: Option<Vec<ShipmentRequest>>,
    ready: bool,
}

/// Authoritative map of tracking code to its latest record.
///
/// Only [`TrackingStore::reset`] changes the key set; fetched batches can only overwrite
/// entries for codes that were requested. Every operation holds the lock for its whole
/// duration, so readers observe either the state before or after an update.
#[derive(Debug, Default)]
pub struct TrackingStore {
    entries: RwLock<Entries>,
}

impl TrackingStore {
    /// Empty store with no requested shipments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the store with one request-derived entry per request.
    ///
    /// An empty request list marks the store ready, as there is nothing to wait for.
    pub fn reset(&self, requests: &[ShipmentRequest]) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.records = requests
            .iter()
            .map(|request| (request.code.clone(), ShipmentRecord::pending(request)))
            .collect();
        entries.seeded_with = Some(requests.to_vec());
        entries.ready = entries.ready || requests.is_empty();
        debug!(shipments = requests.len(), "tracking store reset");
    }

    /// Overwrite the entries of every record whose code is already known.
    ///
    /// Records for unknown codes are dropped. Returns whether any entry was overwritten.
    pub fn apply_batch(&self, records: Vec<ShipmentRecord>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut changed = false;
        for record in records {
            if let Some(entry) = entries.records.get_mut(&record.code) {
                *entry = record;
                changed = true;
            }
        }
        entries.ready = entries.ready || changed;
        changed
    }

    /// Whether the store was never reset or was last reset with a different request list.
    #[must_use]
    pub fn needs_reset(&self, requests: &[ShipmentRequest]) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.seeded_with.as_deref() != Some(requests)
    }

    /// Whether there is anything meaningful to display yet.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ready
    }

    /// Latest record for a code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<ShipmentRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .get(code)
            .cloned()
    }

    /// Codes currently tracked, sorted.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut codes = entries.records.keys().cloned().collect::<Vec<_>>();
        codes.sort();
        codes
    }

    /// Number of tracked shipments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    /// Whether no shipment is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record, most recently updated first.
    ///
    /// Records without a parseable date come last; ties are ordered by code.
    #[must_use]
    pub fn snapshot(&self, normalizer: &Normalizer) -> Vec<ShipmentRecord> {
        let mut records = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.records.values().cloned().collect::<Vec<_>>()
        };
        records.sort_by(|left, right| left.code.cmp(&right.code));
        records.sort_by_cached_key(|record| {
            Reverse(
                record
                    .date
                    .as_deref()
                    .and_then(|date| normalizer.parse_canonical(date)),
            )
        });
        records
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn requests(codes: &[&str]) -> Vec<ShipmentRequest> {
        codes.iter().map(|&code| ShipmentRequest::new(code)).collect()
    }

    fn with_status(code: &str, status: &str) -> ShipmentRecord {
        ShipmentRecord {
            status: Some(status.to_owned()),
            ..ShipmentRecord::pending(&ShipmentRequest::new(code))
        }
    }

    fn dated(code: &str, date: &str) -> ShipmentRecord {
        ShipmentRecord {
            date: Some(date.to_owned()),
            ..ShipmentRecord::pending(&ShipmentRequest::new(code))
        }
    }

    #[test]
    fn batch_only_updates_known_codes() {
        let store = TrackingStore::new();
        store.reset(&requests(&["X", "Y"]));

        let changed = store.apply_batch(vec![with_status("X", "ok"), with_status("Z", "ghost")]);

        assert!(changed, "X was overwritten");
        assert_eq!(
            store.get("X").and_then(|rec| rec.status),
            Some("ok".to_owned()),
            "X updated"
        );
        assert_eq!(
            store.get("Y"),
            Some(ShipmentRecord::pending(&ShipmentRequest::new("Y"))),
            "Y untouched"
        );
        assert!(store.get("Z").is_none(), "Z is never inserted");
        assert_eq!(store.codes(), ["X", "Y"], "key set unchanged");
    }

    #[test]
    fn empty_batch_changes_nothing() {
        let store = TrackingStore::new();
        store.reset(&requests(&["X"]));
        let before = store.snapshot(&Normalizer::default());

        assert!(!store.apply_batch(Vec::new()), "nothing changed");
        assert_eq!(store.snapshot(&Normalizer::default()), before, "identical state");
        assert!(!store.is_ready(), "still waiting for the first result");
    }

    #[test]
    fn unknown_codes_only_do_not_mark_ready() {
        let store = TrackingStore::new();
        store.reset(&requests(&["X"]));

        assert!(!store.apply_batch(vec![with_status("Q", "?")]), "Q is unknown");
        assert!(!store.is_ready(), "no entry was overwritten");
    }

    #[test]
    fn key_set_never_grows_through_batches() {
        let store = TrackingStore::new();
        store.reset(&requests(&["A", "B"]));

        for round in 0..5 {
            let code = format!("N{round}");
            store.apply_batch(vec![with_status(&code, "new"), with_status("A", "again")]);
            assert_eq!(store.len(), 2, "only reset grows the store");
        }
    }

    #[test]
    fn reset_with_no_requests_is_ready() {
        let store = TrackingStore::new();
        store.reset(&[]);

        assert!(store.is_ready(), "nothing to wait for");
        assert!(store.is_empty(), "no entries");
    }

    #[test]
    fn needs_reset_tracks_request_changes() {
        let store = TrackingStore::new();
        let first = requests(&["A"]);
        assert!(store.needs_reset(&first), "fresh store");
        assert!(store.needs_reset(&[]), "even an empty list seeds a fresh store");

        store.reset(&first);
        assert!(!store.needs_reset(&first), "same list");
        assert!(store.needs_reset(&requests(&["A", "B"])), "list grew");
    }

    #[test]
    fn snapshot_is_most_recent_first() {
        let store = TrackingStore::new();
        store.reset(&requests(&["old", "new", "none", "mid"]));
        store.apply_batch(vec![
            dated("old", "01/01/2023 09:00 AM"),
            dated("new", "01/01/2024 09:00 PM"),
            dated("mid", "01/01/2024 09:00 AM"),
        ]);

        let order = store
            .snapshot(&Normalizer::default())
            .into_iter()
            .map(|rec| rec.code)
            .collect::<Vec<_>>();

        assert_eq!(order, ["new", "mid", "old", "none"], "dated first, newest on top");
    }

    #[test]
    fn snapshot_orders_by_date_in_spanish() {
        let normalizer = Normalizer::new("es");
        let date = |raw: &str| normalizer.format_date(&Value::String(raw.to_owned()));
        let store = TrackingStore::new();
        store.reset(&requests(&["A", "B"]));
        store.apply_batch(vec![
            dated("A", &date("2023-01-01T09:00:00")),
            dated("B", &date("2024-06-01T21:00:00")),
        ]);

        let order = store
            .snapshot(&normalizer)
            .into_iter()
            .map(|rec| rec.code)
            .collect::<Vec<_>>();

        assert_eq!(order, ["B", "A"], "evening 2024 comes before morning 2023");
    }
}
