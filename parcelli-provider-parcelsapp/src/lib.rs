//! Provider implementation for the parcelsapp.com v3 tracking API.
//!
//! Tracking is a two-step protocol: codes are submitted with a POST, which either answers
//! with shipments right away or hands back a `uuid` to fetch the results with a GET.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use parcelli_core::{
    model::{
        INDETERMINATE, ProviderMeta, Providers, RawShipment, ShipmentRecord, ShipmentRequest,
        TrackedShipment,
    },
    normalize::Normalizer,
    parse::{degrade_all, parse_shipments},
    plugin::ProviderPlugin,
    ports::{PortError, TrackingPort},
};

/// Production API root.
pub const BASE_URL: &str = "https://parcelsapp.com/api/v3";

/// Body of the tracking submission.
#[derive(Debug, Serialize)]
struct SubmitRequest<'req> {
    shipments: Vec<SubmitShipment<'req>>,
    language: &'req str,
    #[serde(rename = "apiKey")]
    api_key: &'req str,
}

/// One code inside [`SubmitRequest`].
#[derive(Debug, Serialize)]
struct SubmitShipment<'req> {
    #[serde(rename = "trackingId")]
    tracking_id: &'req str,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'req str>,
}

/// Response of both the submission and the detail lookup.
#[derive(Debug, Deserialize)]
struct TrackingResponse {
    #[serde(default)]
    shipments: Option<Vec<ParcelShipment>>,
    #[serde(default)]
    uuid: Option<String>,
    // "done", "fromCache" and friends exist but the flow does not depend on them
}

/// Single shipment as parcelsapp reports it.
#[derive(Debug, Deserialize)]
struct ParcelShipment {
    #[serde(rename = "trackingId", default)]
    tracking_id: Option<String>,
    #[serde(rename = "lastState", default)]
    last_state: Option<Map<String, Value>>,
    #[serde(default)]
    services: Option<Vec<Service>>,
    #[serde(default)]
    error: Option<String>,
}

/// Carrier/service involved in delivering a shipment.
#[derive(Debug, Deserialize)]
struct Service {
    slug: String,
}

/// What a tracking response asks the client to do next.
enum Outcome {
    Shipments(Vec<ParcelShipment>),
    Pending(String),
    Nothing,
}

impl TrackingResponse {
    fn outcome(self) -> Outcome {
        match (self.shipments, self.uuid) {
            (Some(shipments), _) if !shipments.is_empty() => Outcome::Shipments(shipments),
            (_, Some(uuid)) if !uuid.is_empty() => Outcome::Pending(uuid),
            _ => Outcome::Nothing,
        }
    }
}

impl From<ParcelShipment> for RawShipment {
    fn from(shipment: ParcelShipment) -> Self {
        match (shipment.tracking_id, shipment.last_state) {
            (Some(tracking_id), Some(last_state)) => RawShipment::Tracked(TrackedShipment {
                tracking_id,
                stages: shipment
                    .services
                    .unwrap_or_default()
                    .into_iter()
                    .map(|service| service.slug)
                    .collect(),
                last_state,
            }),
            (tracking_id, _) => RawShipment::Unrecognized {
                tracking_id,
                error: shipment.error,
            },
        }
    }
}

/// Shipment tracking implementation for parcelsapp.com.
pub struct ParcelsAppTrackingPort {
    client: Client,
    meta: ProviderMeta,
    api_key: String,
    base_url: String,
}

impl ParcelsAppTrackingPort {
    /// Create a new tracking port bound to the given HTTP client and API key.
    #[must_use]
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            meta: provider_meta(),
            api_key,
            base_url: BASE_URL.to_owned(),
        }
    }

    /// Talk to a different API root, e.g. a mock server.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn tracking_url(&self) -> String {
        format!("{}/shipments/tracking", self.base_url)
    }

    async fn detail(
        &self,
        uuid: &str,
        requested: &[ShipmentRequest],
        normalizer: &Normalizer,
    ) -> Result<Vec<ShipmentRecord>, PortError> {
        debug!(%uuid, "results pending, fetching by uuid");
        let req = self
            .client
            .get(self.tracking_url())
            .query(&[("uuid", uuid), ("apiKey", self.api_key.as_str())]);

        match fetch_json::<TrackingResponse>(req).await?.outcome() {
            Outcome::Shipments(shipments) => Ok(parse(shipments, requested, normalizer)),
            Outcome::Pending(_) | Outcome::Nothing => {
                debug!(%uuid, "no shipments behind uuid");
                Ok(degrade_all(requested, INDETERMINATE, normalizer))
            }
        }
    }
}

#[async_trait]
impl TrackingPort for ParcelsAppTrackingPort {
    fn provider(&self) -> &ProviderMeta {
        &self.meta
    }

    async fn track(
        &self,
        requested: &[ShipmentRequest],
        normalizer: &Normalizer,
    ) -> Result<Vec<ShipmentRecord>, PortError> {
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let body = SubmitRequest {
            shipments: requested
                .iter()
                .map(|request| SubmitShipment {
                    tracking_id: &request.code,
                    country: request.country.as_deref(),
                })
                .collect(),
            language: normalizer.language(),
            api_key: &self.api_key,
        };

        let submitted =
            fetch_json::<TrackingResponse>(self.client.post(self.tracking_url()).json(&body))
                .await?;

        match submitted.outcome() {
            Outcome::Shipments(shipments) => Ok(parse(shipments, requested, normalizer)),
            Outcome::Pending(uuid) => self.detail(&uuid, requested, normalizer).await,
            Outcome::Nothing => {
                debug!("submission returned neither shipments nor uuid");
                Ok(Vec::new())
            }
        }
    }
}

/// Build the plugin for parcelsapp, or `None` when no API key is configured.
#[must_use]
pub fn plugin(client: Client, api_key: Option<&str>) -> Option<ProviderPlugin> {
    plugin_at(client, api_key, BASE_URL)
}

/// Like [`plugin`], against a custom API root.
#[must_use]
pub fn plugin_at(client: Client, api_key: Option<&str>, base_url: &str) -> Option<ProviderPlugin> {
    let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) else {
        debug!("no parcelsapp API key configured, provider disabled");
        return None;
    };
    let port = ParcelsAppTrackingPort::new(client, api_key.to_owned()).with_base_url(base_url);
    Some(ProviderPlugin::new(Arc::new(port)))
}

/// Metadata of the parcelsapp provider.
#[must_use]
pub fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: Providers::ParcelsApp.into(),
        name: String::from("Parcels"),
    }
}

fn parse(
    shipments: Vec<ParcelShipment>,
    requested: &[ShipmentRequest],
    normalizer: &Normalizer,
) -> Vec<ShipmentRecord> {
    let raw = shipments.into_iter().map(RawShipment::from).collect();
    parse_shipments(raw, requested, normalizer)
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(port_error)?
        .error_for_status()
        .map_err(port_error)?
        .json()
        .await
        .map_err(port_error)
}

// Request URLs carry the API key, so they never make it into the error text.
fn port_error(err: ReqwestError) -> PortError {
    let err = err.without_url();
    if err.is_decode() {
        PortError::Protocol(err.to_string())
    } else {
        PortError::Network(err)
    }
}
