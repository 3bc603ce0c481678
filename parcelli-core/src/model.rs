//! Domain data structures for shipment requests, tracked records, and raw provider payloads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder used for location and status when no real tracking data is available.
pub const INDETERMINATE: &str = "Indeterminado";

/// Built-in tracking providers supported by the application.
pub enum Providers {
    /// parcelsapp.com aggregated tracking API.
    ParcelsApp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier for a tracking provider known to parcelli.
pub struct ProviderId(pub String);

impl fmt::Display for Providers {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Providers::ParcelsApp => "parcelsapp",
        };
        write!(formatter, "{slug}")
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<Providers> for ProviderId {
    fn from(provider: Providers) -> Self {
        ProviderId(provider.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a provider and its human-friendly name.
pub struct ProviderMeta {
    /// Unique identifier.
    pub id: ProviderId,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A shipment the user asked to follow.
pub struct ShipmentRequest {
    /// Tracking code, unique across all requests.
    pub code: String,
    /// Optional display name.
    #[serde(default)]
    pub label: Option<String>,
    /// Optional destination country, forwarded to providers that want it.
    #[serde(default)]
    pub country: Option<String>,
    /// Restricts the request to a single provider when set.
    #[serde(default, alias = "type")]
    pub provider: Option<ProviderId>,
}

impl ShipmentRequest {
    /// Construct a request for a bare tracking code.
    #[must_use]
    pub fn new<S: Into<String>>(code: S) -> Self {
        Self {
            code: code.into(),
            label: None,
            country: None,
            provider: None,
        }
    }

    /// Whether the given provider is responsible for this request.
    #[must_use]
    pub fn handled_by(&self, provider: &ProviderId) -> bool {
        self.provider.as_ref().is_none_or(|hint| hint == provider)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Latest known state of a requested shipment, as stored and displayed.
pub struct ShipmentRecord {
    /// Tracking code; always one of the requested codes once stored.
    pub code: String,
    /// Display name copied from the request.
    pub label: Option<String>,
    /// Country copied from the request.
    pub country: Option<String>,
    /// Provider hint copied from the request.
    pub provider: Option<ProviderId>,
    /// Normalized current location.
    pub location: Option<String>,
    /// Normalized current status.
    pub status: Option<String>,
    /// Timestamp of the last status in canonical display form.
    pub date: Option<String>,
    /// Additional normalized fields reported by the provider.
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl ShipmentRecord {
    /// Record holding only the request-derived fields, before any fetch.
    #[must_use]
    pub fn pending(request: &ShipmentRequest) -> Self {
        Self {
            code: request.code.clone(),
            label: request.label.clone(),
            country: request.country.clone(),
            provider: request.provider.clone(),
            location: None,
            status: None,
            date: None,
            details: BTreeMap::new(),
        }
    }

    /// Record standing in for a shipment whose real state is unavailable.
    #[must_use]
    pub fn degraded(request: &ShipmentRequest, status: String, date: String) -> Self {
        Self {
            location: Some(INDETERMINATE.to_owned()),
            status: Some(status),
            date: Some(date),
            ..Self::pending(request)
        }
    }

    /// Whether the record carries fetched tracking data.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.status.is_some() || self.location.is_some() || self.date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Provider payload for one shipment, translated into the shapes the parser understands.
pub enum RawShipment {
    /// The provider knows the shipment and reported its latest state.
    Tracked(TrackedShipment),
    /// The provider returned something without a tracking id or latest state.
    Unrecognized {
        /// Tracking id, when the provider echoed one back.
        tracking_id: Option<String>,
        /// Provider error text, if any.
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// Raw latest state of a shipment a provider has tracking data for.
pub struct TrackedShipment {
    /// Identifier the provider tracked, matched against request codes.
    pub tracking_id: String,
    /// Names of the carriers/services involved, in provider order.
    pub stages: Vec<String>,
    /// Provider's "last known state" object, unmodified.
    pub last_state: Map<String, Value>,
}
