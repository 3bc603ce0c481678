//! Traits describing provider capabilities and shared helper types.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{ProviderMeta, ShipmentRecord, ShipmentRequest};
use crate::normalize::Normalizer;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to provider backends or reading shipments.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Provider answered with a payload that does not follow its protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// The shipment configuration could not be read.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
/// Trait for provider-specific tracking backends.
pub trait TrackingPort: Send + Sync {
    /// Metadata describing the provider behind this port.
    fn provider(&self) -> &ProviderMeta;

    /// Resolve the current state of the requested shipments.
    ///
    /// Only the requests this provider is responsible for are passed in.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider request fails or answers malformed data.
    async fn track(
        &self,
        requested: &[ShipmentRequest],
        normalizer: &Normalizer,
    ) -> Result<Vec<ShipmentRecord>, PortError>;
}

/// Source of the shipment requests to poll, consulted at the start of each cycle.
pub trait ShipmentSource: Send + Sync {
    /// Current list of requested shipments.
    ///
    /// Called synchronously from the scheduler task at every tick, so implementations
    /// should only do small local reads.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Configuration`] when the list cannot be read.
    fn shipments(&self) -> Result<Vec<ShipmentRequest>, PortError>;
}

impl ShipmentSource for Vec<ShipmentRequest> {
    fn shipments(&self) -> Result<Vec<ShipmentRequest>, PortError> {
        Ok(self.clone())
    }
}

impl<S: ShipmentSource + ?Sized> ShipmentSource for Arc<S> {
    fn shipments(&self) -> Result<Vec<ShipmentRequest>, PortError> {
        (**self).shipments()
    }
}
