//! Registry for all tracking providers and their ports.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::model::{ProviderId, ProviderMeta, ShipmentRecord, ShipmentRequest};
use crate::normalize::Normalizer;
use crate::parse::degrade_all;
use crate::ports::TrackingPort;

/// A tracking provider together with the port implementing its protocol.
pub struct ProviderPlugin {
    /// Static metadata describing the provider.
    pub meta: ProviderMeta,
    /// Implementation of the provider's tracking protocol.
    pub tracking_port: Arc<dyn TrackingPort>,
}

impl ProviderPlugin {
    /// Wrap a port, taking the metadata from the port itself.
    #[must_use]
    pub fn new(tracking_port: Arc<dyn TrackingPort>) -> Self {
        Self {
            meta: tracking_port.provider().clone(),
            tracking_port,
        }
    }

    /// Identifier of the wrapped provider.
    #[must_use]
    pub fn id(&self) -> &ProviderId {
        &self.meta.id
    }

    /// Requests this provider is responsible for.
    #[must_use]
    pub fn scope(&self, requested: &[ShipmentRequest]) -> Vec<ShipmentRequest> {
        requested
            .iter()
            .filter(|request| request.handled_by(self.id()))
            .cloned()
            .collect()
    }

    /// Track the given requests, turning any provider failure into degraded records.
    ///
    /// Never fails: every error is represented as one record per request whose status
    /// carries the error text.
    pub async fn track(
        &self,
        requested: &[ShipmentRequest],
        normalizer: &Normalizer,
    ) -> Vec<ShipmentRecord> {
        match self.tracking_port.track(requested, normalizer).await {
            Ok(records) => {
                info!(
                    provider = %self.meta.id,
                    requested = requested.len(),
                    received = records.len(),
                    "provider answered"
                );
                records
            }
            Err(err) => {
                warn!(provider = %self.meta.id, error = %err, "provider failed, degrading results");
                degrade_all(requested, &err.to_string(), normalizer)
            }
        }
    }
}

/// Registry of every configured provider.
pub struct ProviderRegistry {
    plugins: BTreeMap<ProviderId, ProviderPlugin>,
}

impl ProviderRegistry {
    /// Build a registry from the provided plugin list.
    #[must_use]
    pub fn new(plugins: Vec<ProviderPlugin>) -> Self {
        let plugins_map = plugins
            .into_iter()
            .map(|plugin| (plugin.meta.id.clone(), plugin))
            .collect();
        Self {
            plugins: plugins_map,
        }
    }

    /// Return metadata for all registered providers.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderMeta> {
        self.plugins
            .values()
            .map(|plugin| plugin.meta.clone())
            .collect()
    }

    /// Iterator over the registered plugins, ordered by id.
    pub fn plugins(&self) -> impl Iterator<Item = &ProviderPlugin> {
        self.plugins.values()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
