//! Translation of raw provider shipments into normalized records.

use serde_json::Value;

use crate::model::{INDETERMINATE, RawShipment, ShipmentRecord, ShipmentRequest, TrackedShipment};
use crate::normalize::{Normalizer, clean_text};

const STAGE_SEPARATOR: &str = " / ";

/// Parse every raw shipment a provider returned into at most one record each.
///
/// Records start from the matching request and are overlaid with the provider's latest state.
#[must_use]
pub fn parse_shipments(
    raw: Vec<RawShipment>,
    requested: &[ShipmentRequest],
    normalizer: &Normalizer,
) -> Vec<ShipmentRecord> {
    raw.into_iter()
        .map(|shipment| match shipment {
            RawShipment::Tracked(tracked) => overlay(tracked, requested, normalizer),
            RawShipment::Unrecognized { tracking_id, error } => {
                let status = error
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| INDETERMINATE.to_lowercase());
                let request = tracking_id
                    .as_deref()
                    .map_or_else(|| ShipmentRequest::new(""), |id| seed(id, requested));
                ShipmentRecord::degraded(&request, status, normalizer.now())
            }
        })
        .collect()
}

/// One degraded record per request, all carrying the same status text.
#[must_use]
pub fn degrade_all(
    requested: &[ShipmentRequest],
    status: &str,
    normalizer: &Normalizer,
) -> Vec<ShipmentRecord> {
    let date = normalizer.now();
    requested
        .iter()
        .map(|request| ShipmentRecord::degraded(request, status.to_owned(), date.clone()))
        .collect()
}

fn seed(tracking_id: &str, requested: &[ShipmentRequest]) -> ShipmentRequest {
    requested
        .iter()
        .find(|request| request.code == tracking_id)
        .cloned()
        .unwrap_or_else(|| ShipmentRequest::new(tracking_id))
}

fn overlay(
    tracked: TrackedShipment,
    requested: &[ShipmentRequest],
    normalizer: &Normalizer,
) -> ShipmentRecord {
    let mut record = ShipmentRecord::pending(&seed(&tracked.tracking_id, requested));

    let stages = tracked
        .stages
        .iter()
        .map(|stage| stage.trim().to_uppercase())
        .collect::<Vec<_>>()
        .join(STAGE_SEPARATOR);

    let mut state = tracked.last_state;
    state.insert("location".to_owned(), Value::String(stages));

    for (key, value) in state {
        match key.as_str() {
            "carrier" | "code" => {}
            "date" => record.date = Some(normalizer.format_date(&value)),
            "status" => record.status = Some(clean_text(&stringify(&value))),
            "location" => record.location = Some(clean_text(&stringify(&value))),
            _ => {
                record.details.insert(key, clean_text(&stringify(&value)));
            }
        }
    }
    record
}

// Strings keep their raw text, everything else uses its JSON rendering.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::model::ProviderId;

    fn tracked(id: &str, stages: &[&str], state: Value) -> RawShipment {
        let Value::Object(last_state) = state else {
            return RawShipment::Unrecognized {
                tracking_id: Some(id.to_owned()),
                error: None,
            };
        };
        RawShipment::Tracked(TrackedShipment {
            tracking_id: id.to_owned(),
            stages: stages.iter().map(|&stage| stage.to_owned()).collect(),
            last_state,
        })
    }

    fn request(code: &str, label: &str) -> ShipmentRequest {
        ShipmentRequest {
            label: Some(label.to_owned()),
            country: Some("Spain".to_owned()),
            provider: Some(ProviderId("parcelsapp".to_owned())),
            ..ShipmentRequest::new(code)
        }
    }

    #[test]
    fn tracked_shipment_overlays_request() {
        let normalizer = Normalizer::new("en");
        let raw = vec![tracked(
            "LB123",
            &[" correos ", "cainiao"],
            json!({
                "date": "2024-01-02T09:15:00",
                "carrier": 7,
                "status": "Delivered (signed by recipient) - confirmed",
                "location": "ignored",
                "weight": 1.5
            }),
        )];

        let records = parse_shipments(raw, &[request("LB123", "Books")], &normalizer);
        let [record] = records.as_slice() else {
            panic!("expected a single record, got {records:?}");
        };

        assert_eq!(record.code, "LB123", "code comes from the request");
        assert_eq!(record.label.as_deref(), Some("Books"), "label is passed through");
        assert_eq!(record.country.as_deref(), Some("Spain"), "country is passed through");
        assert_eq!(record.status.as_deref(), Some("Delivered"), "status is cleaned");
        assert_eq!(
            record.location.as_deref(),
            Some("CORREOS / CAINIAO"),
            "location is the joined stage list"
        );
        assert_eq!(
            record.date.as_deref(),
            Some("02/01/2024 09:15 AM"),
            "date is canonical"
        );
        assert_eq!(record.details.get("weight").map(String::as_str), Some("1.5"));
        assert!(!record.details.contains_key("carrier"), "carrier is dropped");
    }

    #[test]
    fn missing_stages_yield_empty_location() {
        let normalizer = Normalizer::new("en");
        let raw = vec![tracked("LB1", &[], json!({ "status": "Accepted" }))];

        let records = parse_shipments(raw, &[ShipmentRequest::new("LB1")], &normalizer);

        assert_eq!(records.len(), 1, "one record per raw shipment");
        assert_eq!(records.first().and_then(|rec| rec.location.as_deref()), Some(""));
    }

    #[test]
    fn state_code_never_overrides_record_key() {
        let normalizer = Normalizer::new("en");
        let raw = vec![tracked("LB1", &[], json!({ "code": "OTHER", "status": "x" }))];

        let records = parse_shipments(raw, &[ShipmentRequest::new("LB1")], &normalizer);

        assert_eq!(records.first().map(|rec| rec.code.as_str()), Some("LB1"));
    }

    #[test]
    fn unrecognized_without_id_is_degraded() {
        let normalizer = Normalizer::new("en");
        let raw = vec![RawShipment::Unrecognized {
            tracking_id: None,
            error: None,
        }];

        let records = parse_shipments(raw, &[ShipmentRequest::new("LB1")], &normalizer);
        let [record] = records.as_slice() else {
            panic!("expected a single record, got {records:?}");
        };

        assert_eq!(record.location.as_deref(), Some(INDETERMINATE), "placeholder location");
        assert_eq!(record.status.as_deref(), Some("indeterminado"), "placeholder status");
        assert!(record.date.is_some(), "degraded records are stamped with now");
        assert!(record.code.is_empty(), "nothing identifies the shipment");
    }

    #[test]
    fn unrecognized_keeps_provider_error_text() {
        let normalizer = Normalizer::new("en");
        let raw = vec![RawShipment::Unrecognized {
            tracking_id: Some("LB9".to_owned()),
            error: Some("Tracking number is invalid".to_owned()),
        }];

        let records = parse_shipments(raw, &[request("LB9", "Shoes")], &normalizer);
        let [record] = records.as_slice() else {
            panic!("expected a single record, got {records:?}");
        };

        assert_eq!(record.code, "LB9", "tracking id identifies the record");
        assert_eq!(record.label.as_deref(), Some("Shoes"), "request fields are kept");
        assert_eq!(record.status.as_deref(), Some("Tracking number is invalid"));
    }

    #[test]
    fn unsolicited_shipment_keeps_its_own_code() {
        let normalizer = Normalizer::new("en");
        let raw = vec![tracked("ZZZ", &["ups"], Value::Object(Map::new()))];

        let records = parse_shipments(raw, &[ShipmentRequest::new("LB1")], &normalizer);

        assert_eq!(records.first().map(|rec| rec.code.as_str()), Some("ZZZ"));
        assert_eq!(records.first().and_then(|rec| rec.label.clone()), None);
    }

    #[test]
    fn degrade_all_covers_every_request() {
        let normalizer = Normalizer::new("en");
        let requested = [ShipmentRequest::new("A"), ShipmentRequest::new("B")];

        let records = degrade_all(&requested, "Network error: timeout", &normalizer);

        assert_eq!(records.len(), 2, "one record per request");
        assert!(
            records
                .iter()
                .all(|rec| rec.status.as_deref() == Some("Network error: timeout")),
            "status carries the error text"
        );
    }
}
