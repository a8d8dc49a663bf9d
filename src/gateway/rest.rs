use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ByteStream, InventoryBackend, LookupBackend};
use crate::auth::SessionStore;
use crate::config::ClientConfig;
use crate::errors::ServiceError;
use crate::models::{
    ActivityLog, DashboardResponse, GenerateInsightResponse, Insight, InsightsHistoryResponse,
    InventoryCount, InventoryCreate, InventoryStats, InventoryStatus, InventoryUnit,
    InventoryUpdate, Job, LookupEntity, Spool, SpoolCreate, SpoolUpdate,
};
use crate::telemetry::{current_or_new_request_id, REQUEST_ID_HEADER};

/// [`InventoryBackend`] over the REST API.
#[derive(Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for RestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestGateway")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl RestGateway {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("spoolctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(client, &config.base_url, session)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, ServiceError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::ConfigError(format!("invalid base URL {base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(&format!("api/{}", path.trim_start_matches('/')))
            .map_err(|e| ServiceError::InternalError(format!("invalid request path {path}: {e}")))
    }

    /// Sends one request and returns the response if its status is a
    /// success. Non-success statuses are mapped through
    /// [`ServiceError::from_response`]; a 401 also clears the stored session.
    #[instrument(skip(self, query, body), fields(request_id))]
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Response, ServiceError> {
        let url = self.url(path)?;
        let request_id = current_or_new_request_id();
        tracing::Span::current().record("request_id", request_id.as_str());

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(REQUEST_ID_HEADER, request_id.as_str());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|err| {
            warn!(error = %err, "Request failed before a response arrived");
            metrics::counter!("spool_gateway.requests", 1, "outcome" => "transport_error");
            ServiceError::from(err)
        })?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Received response"
        );

        if status.is_success() {
            metrics::counter!("spool_gateway.requests", 1, "outcome" => "success");
            return Ok(response);
        }

        metrics::counter!("spool_gateway.requests", 1, "outcome" => "error");
        let text = response.text().await.unwrap_or_default();
        let err = ServiceError::from_response(status, &text);
        if err.is_auth() {
            warn!("Backend rejected credentials; clearing session");
            if let Err(clear_err) = self.session.clear() {
                warn!(error = %clear_err, "Failed to clear session");
            }
        }
        Err(err)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ServiceError> {
        let response = self.execute(method, path, query, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| {
            warn!(path, error = %err, "Response did not match the expected shape");
            ServiceError::from(err)
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        self.fetch(Method::GET, path, query, None).await
    }

    async fn send_json<T: DeserializeOwned, P: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &P,
    ) -> Result<T, ServiceError> {
        let body = serde_json::to_value(payload)?;
        self.fetch(method, path, &[], Some(body)).await
    }

    async fn delete_path(&self, path: &str) -> Result<(), ServiceError> {
        self.execute(Method::DELETE, path, &[], None).await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryBackend for RestGateway {
    async fn list_spools(&self) -> Result<Vec<Spool>, ServiceError> {
        self.get_json("spools", &[]).await
    }

    async fn search_spools_by_barcode(&self, barcode: &str) -> Result<Vec<Spool>, ServiceError> {
        self.get_json("spools", &[("barcode", barcode.to_string())])
            .await
    }

    async fn list_spools_by_status(
        &self,
        status: InventoryStatus,
    ) -> Result<Vec<Spool>, ServiceError> {
        self.get_json("spools", &[("status", status.to_string())])
            .await
    }

    async fn get_spool(&self, id: &str) -> Result<Spool, ServiceError> {
        self.get_json(&format!("spools/{id}"), &[]).await
    }

    async fn create_spool(&self, payload: &SpoolCreate) -> Result<Spool, ServiceError> {
        self.send_json(Method::POST, "spools", payload).await
    }

    async fn update_spool(&self, id: &str, payload: &SpoolUpdate) -> Result<Spool, ServiceError> {
        self.send_json(Method::PUT, &format!("spools/{id}"), payload)
            .await
    }

    async fn delete_spool(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_path(&format!("spools/{id}")).await
    }

    async fn list_inventory(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<InventoryUnit>, ServiceError> {
        self.get_json(
            "inventory/",
            &[("skip", skip.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn get_inventory_unit(&self, id: &str) -> Result<InventoryUnit, ServiceError> {
        self.get_json(&format!("inventory/{id}"), &[]).await
    }

    async fn inventory_by_spool(&self, spool_id: &str) -> Result<Vec<InventoryUnit>, ServiceError> {
        self.get_json(&format!("inventory/by-spool/{spool_id}"), &[])
            .await
    }

    async fn inventory_in_use(&self) -> Result<Vec<InventoryUnit>, ServiceError> {
        self.get_json("inventory/in-use", &[]).await
    }

    async fn inventory_count(&self, spool_id: &str) -> Result<InventoryCount, ServiceError> {
        self.get_json(&format!("inventory/count/{spool_id}"), &[])
            .await
    }

    async fn create_inventory_unit(
        &self,
        payload: &InventoryCreate,
    ) -> Result<InventoryUnit, ServiceError> {
        self.send_json(Method::POST, "inventory/", payload).await
    }

    async fn update_inventory_unit(
        &self,
        id: &str,
        payload: &InventoryUpdate,
    ) -> Result<InventoryUnit, ServiceError> {
        self.send_json(Method::PATCH, &format!("inventory/{id}"), payload)
            .await
    }

    async fn delete_inventory_unit(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_path(&format!("inventory/{id}")).await
    }

    async fn dashboard(&self) -> Result<DashboardResponse, ServiceError> {
        self.get_json("dashboard/", &[]).await
    }

    async fn dashboard_stats(&self) -> Result<InventoryStats, ServiceError> {
        self.get_json("dashboard/stats", &[]).await
    }

    async fn activity(&self, limit: u32) -> Result<Vec<ActivityLog>, ServiceError> {
        self.get_json("dashboard/activity", &[("limit", limit.to_string())])
            .await
    }

    async fn insights_history(&self, limit: u32) -> Result<InsightsHistoryResponse, ServiceError> {
        self.get_json("dashboard/insights", &[("limit", limit.to_string())])
            .await
    }

    async fn latest_insight(&self) -> Result<Option<Insight>, ServiceError> {
        match self.get_json("dashboard/insights/latest", &[]).await {
            Err(ServiceError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    async fn generate_insight(&self) -> Result<GenerateInsightResponse, ServiceError> {
        self.fetch(Method::POST, "dashboard/insights/generate", &[], None)
            .await
    }

    async fn delete_insight(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_path(&format!("dashboard/insights/{id}")).await
    }

    async fn jobs(&self, limit: u32) -> Result<Vec<Job>, ServiceError> {
        self.get_json("dashboard/jobs", &[("limit", limit.to_string())])
            .await
    }

    async fn stream_insight(&self) -> Result<ByteStream, ServiceError> {
        let response = self
            .execute(Method::POST, "dashboard/insights/generate/", &[], None)
            .await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ServiceError::from))
            .boxed())
    }
}

#[async_trait]
impl<T: LookupEntity> LookupBackend<T> for RestGateway {
    async fn list(&self, name: Option<&str>) -> Result<Vec<T>, ServiceError> {
        let query: Vec<(&str, String)> = name
            .map(|name| vec![("name", name.to_string())])
            .unwrap_or_default();
        self.get_json(&format!("{}/", T::RESOURCE), &query).await
    }

    async fn get(&self, id: &str) -> Result<T, ServiceError> {
        self.get_json(&format!("{}/{id}/", T::RESOURCE), &[]).await
    }

    async fn create(&self, payload: &T::Create) -> Result<T, ServiceError> {
        self.send_json(Method::POST, &format!("{}/", T::RESOURCE), payload)
            .await
    }

    async fn update(&self, id: &str, payload: &T::Create) -> Result<T, ServiceError> {
        self.send_json(Method::PUT, &format!("{}/{id}/", T::RESOURCE), payload)
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_path(&format!("{}/{id}/", T::RESOURCE)).await
    }
}
