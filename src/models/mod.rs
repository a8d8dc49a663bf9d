//! Wire models for the filament inventory backend.
//!
//! Field names follow the backend JSON exactly. Lookup tables (brands,
//! colors, materials) are referenced by name when creating a spool and come
//! back as nested `{id, name}` objects.

pub mod brand;
pub mod color;
pub mod dashboard;
pub mod inventory;
pub mod material;
pub mod spool;
pub mod timestamp;

pub use brand::{Brand, BrandCreate, BrandNested};
pub use color::{Color, ColorCreate, ColorNested};
pub use dashboard::{
    ActivityLog, DashboardResponse, GenerateInsightResponse, Insight, InsightsHistoryResponse,
    InventoryStats, Job, JobStatus,
};
pub use inventory::{
    InventoryCount, InventoryCreate, InventoryStatus, InventoryUnit, InventoryUpdate, StatusNested,
};
pub use material::{Material, MaterialCreate, MaterialNested};
pub use spool::{CategoryNested, Spool, SpoolCreate, SpoolUpdate, TradeNameNested};

/// A named lookup table entry (brand, color, material) that can be listed,
/// searched by name and created through the generic lookup service.
pub trait LookupEntity:
    serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Payload sent to create or update an entry.
    type Create: serde::Serialize + validator::Validate + Send + Sync;

    /// Cache collection this entity lives in.
    const COLLECTION: crate::cache::Collection;

    /// Entity family used to pick the invalidation plan after a write.
    const ENTITY: crate::cache::Entity;

    /// REST path segment under `/api/`.
    const RESOURCE: &'static str;

    fn id(&self) -> &str;
    fn name(&self) -> &str;
}
