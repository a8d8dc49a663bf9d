//! Remote data gateway: the only component that talks to the backend.
//!
//! Every operation resolves to a typed value or a [`ServiceError`]; nothing
//! here caches or retries.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::errors::ServiceError;
use crate::models::{
    ActivityLog, DashboardResponse, GenerateInsightResponse, Insight, InsightsHistoryResponse,
    InventoryCount, InventoryCreate, InventoryStats, InventoryStatus, InventoryUnit,
    InventoryUpdate, Job, LookupEntity, Spool, SpoolCreate, SpoolUpdate,
};

pub mod rest;

pub use rest::RestGateway;

/// Raw chunks of a server-sent event stream.
pub type ByteStream = BoxStream<'static, Result<Bytes, ServiceError>>;

/// Spools, inventory units and dashboard endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryBackend: Send + Sync {
    async fn list_spools(&self) -> Result<Vec<Spool>, ServiceError>;
    /// Exact-match barcode search. An empty vector means no archetype
    /// carries that barcode.
    async fn search_spools_by_barcode(&self, barcode: &str) -> Result<Vec<Spool>, ServiceError>;
    async fn list_spools_by_status(
        &self,
        status: InventoryStatus,
    ) -> Result<Vec<Spool>, ServiceError>;
    async fn get_spool(&self, id: &str) -> Result<Spool, ServiceError>;
    async fn create_spool(&self, payload: &SpoolCreate) -> Result<Spool, ServiceError>;
    async fn update_spool(&self, id: &str, payload: &SpoolUpdate) -> Result<Spool, ServiceError>;
    async fn delete_spool(&self, id: &str) -> Result<(), ServiceError>;

    async fn list_inventory(&self, skip: u32, limit: u32)
        -> Result<Vec<InventoryUnit>, ServiceError>;
    async fn get_inventory_unit(&self, id: &str) -> Result<InventoryUnit, ServiceError>;
    async fn inventory_by_spool(&self, spool_id: &str) -> Result<Vec<InventoryUnit>, ServiceError>;
    async fn inventory_in_use(&self) -> Result<Vec<InventoryUnit>, ServiceError>;
    async fn inventory_count(&self, spool_id: &str) -> Result<InventoryCount, ServiceError>;
    async fn create_inventory_unit(
        &self,
        payload: &InventoryCreate,
    ) -> Result<InventoryUnit, ServiceError>;
    async fn update_inventory_unit(
        &self,
        id: &str,
        payload: &InventoryUpdate,
    ) -> Result<InventoryUnit, ServiceError>;
    async fn delete_inventory_unit(&self, id: &str) -> Result<(), ServiceError>;

    async fn dashboard(&self) -> Result<DashboardResponse, ServiceError>;
    async fn dashboard_stats(&self) -> Result<InventoryStats, ServiceError>;
    async fn activity(&self, limit: u32) -> Result<Vec<ActivityLog>, ServiceError>;
    async fn insights_history(&self, limit: u32) -> Result<InsightsHistoryResponse, ServiceError>;
    async fn latest_insight(&self) -> Result<Option<Insight>, ServiceError>;
    async fn generate_insight(&self) -> Result<GenerateInsightResponse, ServiceError>;
    async fn delete_insight(&self, id: &str) -> Result<(), ServiceError>;
    async fn jobs(&self, limit: u32) -> Result<Vec<Job>, ServiceError>;
    /// Opens the incremental insight generation stream.
    async fn stream_insight(&self) -> Result<ByteStream, ServiceError>;
}

/// CRUD over one lookup table (brands, colors or materials).
#[async_trait]
pub trait LookupBackend<T: LookupEntity>: Send + Sync {
    /// Lists entries, optionally filtered by exact name.
    async fn list(&self, name: Option<&str>) -> Result<Vec<T>, ServiceError>;
    async fn get(&self, id: &str) -> Result<T, ServiceError>;
    async fn create(&self, payload: &T::Create) -> Result<T, ServiceError>;
    async fn update(&self, id: &str, payload: &T::Create) -> Result<T, ServiceError>;
    async fn delete(&self, id: &str) -> Result<(), ServiceError>;
}
