//! Persistence capability: the seam the validated batch is handed to.
//!
//! The ingestion core only calls this at the end of the pipeline; how records
//! actually land in the directory is the collaborator's business. The shipped
//! implementation is [`InMemoryStore`], which is enough for the HTTP surface
//! and for tests.

use std::future::Future;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::logs::{log_info, log_success};
use crate::error::{StoreError, StoreResult};
use crate::models::{ClientDraft, Courier, PersistedClient};
use crate::pagination::{self, FetchOptions};
use crate::transform::aliases::{self, NAME_ALIASES};
use crate::transport::{RequestSpec, Transport};

/// The persistence capability consumed by the ingestion surface.
pub trait ClientStore: Send + Sync {
    /// Insert a validated batch; returns the stored clients with ids.
    fn add_clients_in_bulk(
        &self,
        clients: Vec<ClientDraft>,
    ) -> impl Future<Output = StoreResult<Vec<PersistedClient>>> + Send;

    /// Fetch courier data from a registered client's API and store it.
    fn fetch_and_store_courier_data(
        &self,
        client_id: Uuid,
        api_url: &str,
        request_config: Option<&RequestSpec>,
    ) -> impl Future<Output = StoreResult<Vec<Courier>>> + Send;
}

/// In-memory store over any transport.
pub struct InMemoryStore<T> {
    clients: Mutex<Vec<PersistedClient>>,
    couriers: Mutex<Vec<Courier>>,
    transport: T,
}

impl<T> InMemoryStore<T> {
    pub fn new(transport: T) -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
            couriers: Mutex::new(Vec::new()),
            transport,
        }
    }

    pub async fn clients(&self) -> Vec<PersistedClient> {
        self.clients.lock().await.clone()
    }

    pub async fn couriers_for(&self, client_id: Uuid) -> Vec<Courier> {
        self.couriers
            .lock()
            .await
            .iter()
            .filter(|c| c.client_id == client_id)
            .cloned()
            .collect()
    }
}

impl<T: Transport> ClientStore for InMemoryStore<T> {
    async fn add_clients_in_bulk(
        &self,
        clients: Vec<ClientDraft>,
    ) -> StoreResult<Vec<PersistedClient>> {
        log_info(format!("Registering {} clients...", clients.len()));

        let persisted: Vec<PersistedClient> = clients
            .into_iter()
            .map(|draft| PersistedClient {
                id: Uuid::new_v4(),
                draft,
                registered_at: chrono::Utc::now(),
            })
            .collect();

        self.clients.lock().await.extend(persisted.iter().cloned());
        log_success(format!("Registered {} clients", persisted.len()));
        Ok(persisted)
    }

    async fn fetch_and_store_courier_data(
        &self,
        client_id: Uuid,
        api_url: &str,
        request_config: Option<&RequestSpec>,
    ) -> StoreResult<Vec<Courier>> {
        let known = self
            .clients
            .lock()
            .await
            .iter()
            .any(|c| c.id == client_id);
        if !known {
            return Err(StoreError::UnknownClient(client_id));
        }

        let spec = match request_config {
            Some(config) => {
                let mut spec = config.clone();
                spec.url = api_url.to_string();
                spec
            }
            None => RequestSpec::get(api_url),
        };

        log_info(format!("Fetching courier data from {api_url}..."));
        let fetched =
            pagination::fetch_all(&spec, &self.transport, &FetchOptions::from_env()).await;
        if let Some(error) = fetched.error {
            if fetched.records.is_empty() {
                return Err(StoreError::Fetch(error));
            }
        }

        let couriers: Vec<Courier> = fetched
            .records
            .into_iter()
            .map(|record| {
                let name = record
                    .as_object()
                    .and_then(|obj| aliases::resolve_string(obj, NAME_ALIASES))
                    .or_else(|| record.as_str().map(|s| s.to_string()))
                    .unwrap_or_else(|| "Unknown Courier".to_string());
                Courier {
                    id: Uuid::new_v4(),
                    client_id,
                    name,
                    raw: record,
                }
            })
            .collect();

        log_success(format!("Stored {} couriers", couriers.len()));
        self.couriers.lock().await.extend(couriers.iter().cloned());
        Ok(couriers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{RawResponse, TransportFailure};
    use serde_json::json;

    struct StubTransport(serde_json::Value);

    impl Transport for StubTransport {
        async fn send(&self, _: &RequestSpec) -> Result<RawResponse, TransportFailure> {
            Ok(RawResponse {
                status: 200,
                body: self.0.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_bulk_add_assigns_ids() {
        let store = InMemoryStore::new(StubTransport(json!([])));
        let persisted = store
            .add_clients_in_bulk(vec![ClientDraft::named("Acme"), ClientDraft::named("Globex")])
            .await
            .unwrap();

        assert_eq!(persisted.len(), 2);
        assert_ne!(persisted[0].id, persisted[1].id);
        assert_eq!(store.clients().await.len(), 2);
    }

    #[tokio::test]
    async fn test_courier_fetch_for_unknown_client() {
        let store = InMemoryStore::new(StubTransport(json!([])));
        let err = store
            .fetch_and_store_courier_data(Uuid::new_v4(), "https://api.example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownClient(_)));
    }

    #[tokio::test]
    async fn test_courier_fetch_stores_named_couriers() {
        let store = InMemoryStore::new(StubTransport(
            json!({"data": [{"name": "Courier One"}, {"name": "Courier Two"}]}),
        ));
        let persisted = store
            .add_clients_in_bulk(vec![ClientDraft::named("Acme")])
            .await
            .unwrap();
        let client_id = persisted[0].id;

        let couriers = store
            .fetch_and_store_courier_data(client_id, "https://api.example.com/couriers", None)
            .await
            .unwrap();

        assert_eq!(couriers.len(), 2);
        assert_eq!(couriers[0].name, "Courier One");
        assert_eq!(store.couriers_for(client_id).await.len(), 2);
    }
}
