//! Cache-aware services, one per collection.
//!
//! Reads go through the [`QueryCache`]; writes go straight to the backend
//! and, once they succeed, apply the matching [`InvalidationPlan`] before
//! returning.

use std::sync::Arc;

use crate::cache::QueryCache;
use crate::gateway::{InventoryBackend, LookupBackend};
use crate::models::{Brand, Color, Material};

pub mod dashboard;
pub mod inventory;
pub mod lookup_tables;
pub mod spools;

pub use dashboard::DashboardService;
pub use inventory::InventoryService;
pub use lookup_tables::{BrandService, ColorService, LookupService, MaterialService};
pub use spools::SpoolService;

/// Every service wired to one backend and one shared cache.
#[derive(Clone)]
pub struct Services {
    pub brands: BrandService,
    pub colors: ColorService,
    pub materials: MaterialService,
    pub spools: SpoolService,
    pub inventory: InventoryService,
    pub dashboard: DashboardService,
    cache: QueryCache,
}

impl Services {
    pub fn new<G>(gateway: Arc<G>, cache: QueryCache) -> Self
    where
        G: InventoryBackend
            + LookupBackend<Brand>
            + LookupBackend<Color>
            + LookupBackend<Material>
            + 'static,
    {
        let backend: Arc<dyn InventoryBackend> = gateway.clone();
        let brands: Arc<dyn LookupBackend<Brand>> = gateway.clone();
        let colors: Arc<dyn LookupBackend<Color>> = gateway.clone();
        let materials: Arc<dyn LookupBackend<Material>> = gateway;

        Self {
            brands: LookupService::new(brands, cache.clone()),
            colors: LookupService::new(colors, cache.clone()),
            materials: LookupService::new(materials, cache.clone()),
            spools: SpoolService::new(backend.clone(), cache.clone()),
            inventory: InventoryService::new(backend.clone(), cache.clone()),
            dashboard: DashboardService::new(backend, cache.clone()),
            cache,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}
