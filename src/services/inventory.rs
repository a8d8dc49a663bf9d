use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::cache::{Collection, Entity, InvalidationPlan, Mutation, QueryCache, QueryKey};
use crate::errors::ServiceError;
use crate::gateway::InventoryBackend;
use crate::models::{
    InventoryCount, InventoryCreate, InventoryStatus, InventoryUnit, InventoryUpdate,
};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Physical spools on the shelf.
#[derive(Clone)]
pub struct InventoryService {
    backend: Arc<dyn InventoryBackend>,
    cache: QueryCache,
}

impl InventoryService {
    pub fn new(backend: Arc<dyn InventoryBackend>, cache: QueryCache) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self, skip: u32, limit: u32) -> Result<Vec<InventoryUnit>, ServiceError> {
        let key = QueryKey::filtered(
            Collection::Inventory,
            [("skip", skip.to_string()), ("limit", limit.to_string())],
        );
        self.cache
            .get_or_fetch(key, || self.backend.list_inventory(skip, limit))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<InventoryUnit, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::detail(Collection::Inventory, id), || {
                self.backend.get_inventory_unit(id)
            })
            .await
    }

    pub async fn by_spool(&self, spool_id: &str) -> Result<Vec<InventoryUnit>, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::by_spool(Collection::Inventory, spool_id), || {
                self.backend.inventory_by_spool(spool_id)
            })
            .await
    }

    pub async fn in_use(&self) -> Result<Vec<InventoryUnit>, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::list(Collection::InventoryInUse), || {
                self.backend.inventory_in_use()
            })
            .await
    }

    pub async fn count_by_spool(&self, spool_id: &str) -> Result<InventoryCount, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::count(Collection::Inventory, spool_id), || {
                self.backend.inventory_count(spool_id)
            })
            .await
    }

    #[instrument(skip(self, payload), fields(spool_id = %payload.spool_id))]
    pub async fn add(&self, payload: &InventoryCreate) -> Result<InventoryUnit, ServiceError> {
        payload.validate()?;
        let unit = self.backend.create_inventory_unit(payload).await?;
        self.cache.apply(&InvalidationPlan::for_mutation(Mutation::create(
            Entity::InventoryUnit,
        )));
        info!(id = %unit.id, "Added inventory unit");
        Ok(unit)
    }

    #[instrument(skip(self, payload))]
    pub async fn update(
        &self,
        id: &str,
        payload: &InventoryUpdate,
    ) -> Result<InventoryUnit, ServiceError> {
        payload.validate()?;
        let unit = self.backend.update_inventory_unit(id, payload).await?;
        self.cache.apply(&InvalidationPlan::for_mutation(Mutation::update(
            Entity::InventoryUnit,
        )));
        info!(id, status = %unit.status(), "Updated inventory unit");
        Ok(unit)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.backend.delete_inventory_unit(id).await?;
        self.cache.apply(&InvalidationPlan::for_mutation(Mutation::delete(
            Entity::InventoryUnit,
        )));
        info!(id, "Deleted inventory unit");
        Ok(())
    }

    /// Takes a unit off the shelf. `notes` replaces the unit's free-text
    /// properties when given.
    pub async fn mark_in_use(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<InventoryUnit, ServiceError> {
        let payload = InventoryUpdate {
            is_in_use: Some(true),
            status_name: Some(InventoryStatus::InUse),
            custom_properties: notes,
            ..InventoryUpdate::default()
        };
        self.update(id, &payload).await
    }

    pub async fn mark_in_stock(&self, id: &str) -> Result<InventoryUnit, ServiceError> {
        let payload = InventoryUpdate {
            is_in_use: Some(false),
            status_name: Some(InventoryStatus::InStock),
            ..InventoryUpdate::default()
        };
        self.update(id, &payload).await
    }

    /// Records a new measured weight. Rejects negatives and anything above
    /// the archetype's base weight.
    pub async fn update_weight(&self, id: &str, weight: f64) -> Result<InventoryUnit, ServiceError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ServiceError::ValidationError(
                "Weight must be zero or a positive number of grams".to_string(),
            ));
        }
        let unit = self.get(id).await?;
        if weight > unit.spool.base_weight {
            warn!(id, weight, base_weight = unit.spool.base_weight, "Weight above base weight");
            return Err(ServiceError::ValidationError(format!(
                "Weight {} g exceeds the spool's base weight of {} g",
                weight, unit.spool.base_weight
            )));
        }
        let payload = InventoryUpdate {
            weight: Some(weight),
            ..InventoryUpdate::default()
        };
        self.update(id, &payload).await
    }

    pub async fn mark_depleted(&self, id: &str) -> Result<InventoryUnit, ServiceError> {
        let payload = InventoryUpdate {
            weight: Some(0.0),
            is_in_use: Some(false),
            status_name: Some(InventoryStatus::Depleted),
            ..InventoryUpdate::default()
        };
        self.update(id, &payload).await
    }
}
