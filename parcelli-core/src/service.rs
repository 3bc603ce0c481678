//! High-level service facade combining all providers.

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::model::{ProviderMeta, ShipmentRecord, ShipmentRequest};
use crate::normalize::Normalizer;
use crate::plugin::ProviderRegistry;

/// Public entry point for resolving shipment states across every provider.
pub struct TrackerService {
    registry: Arc<ProviderRegistry>,
    normalizer: Arc<Normalizer>,
}

impl TrackerService {
    /// Create a new service bound to the provided registry and display locale.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, normalizer: Arc<Normalizer>) -> Self {
        Self {
            registry,
            normalizer,
        }
    }

    /// List all configured providers.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderMeta> {
        self.registry.providers()
    }

    /// Ask every provider about the requests it is responsible for, concurrently.
    ///
    /// Waits for all providers to settle and concatenates their lists in provider order.
    /// Provider failures arrive as degraded records, so nothing here can fail.
    pub async fn fetch_all(&self, requested: &[ShipmentRequest]) -> Vec<ShipmentRecord> {
        if requested.is_empty() {
            return Vec::new();
        }

        let calls = self.registry.plugins().filter_map(|plugin| {
            let scoped = plugin.scope(requested);
            if scoped.is_empty() {
                debug!(provider = %plugin.id(), "no shipments for provider");
                return None;
            }
            let normalizer = &self.normalizer;
            Some(async move { plugin.track(&scoped, normalizer).await })
        });

        join_all(calls).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::model::{INDETERMINATE, ProviderId};
    use crate::plugin::ProviderPlugin;
    use crate::ports::{PortError, TrackingPort};

    struct StubPort {
        meta: ProviderMeta,
        status: Option<&'static str>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl StubPort {
        fn new(id: &str, status: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                meta: ProviderMeta {
                    id: ProviderId(id.to_owned()),
                    name: id.to_owned(),
                },
                status,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl TrackingPort for StubPort {
        fn provider(&self) -> &ProviderMeta {
            &self.meta
        }

        async fn track(
            &self,
            requested: &[ShipmentRequest],
            _normalizer: &Normalizer,
        ) -> Result<Vec<ShipmentRecord>, PortError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(requested.iter().map(|req| req.code.clone()).collect());
            }
            let Some(status) = self.status else {
                return Err(PortError::Protocol("provider is down".to_owned()));
            };
            Ok(requested
                .iter()
                .map(|request| ShipmentRecord {
                    status: Some(status.to_owned()),
                    ..ShipmentRecord::pending(request)
                })
                .collect())
        }
    }

    fn service(ports: Vec<Arc<StubPort>>) -> TrackerService {
        let plugins = ports
            .into_iter()
            .map(|port| ProviderPlugin::new(port))
            .collect();
        TrackerService::new(
            Arc::new(ProviderRegistry::new(plugins)),
            Arc::new(Normalizer::default()),
        )
    }

    fn hinted(code: &str, provider: &str) -> ShipmentRequest {
        ShipmentRequest {
            provider: Some(ProviderId(provider.to_owned())),
            ..ShipmentRequest::new(code)
        }
    }

    #[tokio::test]
    async fn one_failing_provider_does_not_hide_the_other() {
        let healthy = StubPort::new("a", Some("A"));
        let broken = StubPort::new("b", None);
        let service = service(vec![Arc::clone(&healthy), Arc::clone(&broken)]);
        let requested = [hinted("X", "a"), hinted("Y", "b"), hinted("Z", "b")];

        let records = service.fetch_all(&requested).await;

        let real = records
            .iter()
            .find(|rec| rec.code == "X")
            .expect("healthy provider result is kept");
        assert_eq!(real.status.as_deref(), Some("A"), "real status for X");

        let degraded = records
            .iter()
            .filter(|rec| rec.location.as_deref() == Some(INDETERMINATE))
            .map(|rec| rec.code.as_str())
            .collect::<Vec<_>>();
        assert_eq!(degraded, ["Y", "Z"], "every code assigned to b is degraded");
        assert!(
            records
                .iter()
                .filter(|rec| rec.code != "X")
                .all(|rec| rec.status.as_deref() == Some("Protocol error: provider is down")),
            "degraded status carries the error"
        );
    }

    #[tokio::test]
    async fn empty_request_list_contacts_nobody() {
        let port = StubPort::new("a", Some("A"));
        let service = service(vec![Arc::clone(&port)]);

        let records = service.fetch_all(&[]).await;

        assert!(records.is_empty(), "nothing to fetch");
        assert!(port.calls().is_empty(), "no provider call was made");
    }

    #[tokio::test]
    async fn unhinted_requests_go_to_every_provider() {
        let first = StubPort::new("a", Some("A"));
        let second = StubPort::new("b", Some("B"));
        let service = service(vec![Arc::clone(&first), Arc::clone(&second)]);
        let requested = [ShipmentRequest::new("X"), hinted("Y", "b")];

        let records = service.fetch_all(&requested).await;

        assert_eq!(first.calls(), [vec!["X".to_owned()]], "a only sees X");
        assert_eq!(
            second.calls(),
            [vec!["X".to_owned(), "Y".to_owned()]],
            "b sees X and its own Y"
        );
        assert_eq!(records.len(), 3, "lists are concatenated");
    }

    #[tokio::test]
    async fn provider_with_nothing_to_do_is_skipped() {
        let first = StubPort::new("a", Some("A"));
        let second = StubPort::new("b", Some("B"));
        let service = service(vec![Arc::clone(&first), Arc::clone(&second)]);

        let records = service.fetch_all(&[hinted("Y", "b")]).await;

        assert!(first.calls().is_empty(), "a has no shipments");
        assert_eq!(records.len(), 1, "only b answered");
    }
}
