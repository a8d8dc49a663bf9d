use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::cache::{Collection, Entity, InvalidationPlan, Mutation, QueryCache, QueryKey};
use crate::errors::ServiceError;
use crate::gateway::InventoryBackend;
use crate::models::{InventoryStatus, Spool, SpoolCreate, SpoolUpdate};

/// Spool archetypes: the catalog side of the inventory.
#[derive(Clone)]
pub struct SpoolService {
    backend: Arc<dyn InventoryBackend>,
    cache: QueryCache,
}

impl SpoolService {
    pub fn new(backend: Arc<dyn InventoryBackend>, cache: QueryCache) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn list(&self) -> Result<Vec<Spool>, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::list(Collection::Spools), || {
                self.backend.list_spools()
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Spool, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::detail(Collection::Spools, id), || {
                self.backend.get_spool(id)
            })
            .await
    }

    /// Archetypes whose barcode matches exactly. Blank input matches nothing
    /// and issues no request.
    #[instrument(skip(self))]
    pub async fn search_by_barcode(&self, barcode: &str) -> Result<Vec<Spool>, ServiceError> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            debug!("Blank barcode; skipping search");
            return Ok(Vec::new());
        }
        self.cache
            .get_or_fetch(
                QueryKey::filtered(Collection::Spools, [("barcode", barcode)]),
                || self.backend.search_spools_by_barcode(barcode),
            )
            .await
    }

    pub async fn list_by_status(&self, status: InventoryStatus) -> Result<Vec<Spool>, ServiceError> {
        self.cache
            .get_or_fetch(
                QueryKey::filtered(Collection::Spools, [("status", status.as_ref())]),
                || self.backend.list_spools_by_status(status),
            )
            .await
    }

    #[instrument(skip(self, payload), fields(barcode = ?payload.barcode))]
    pub async fn create(&self, payload: &SpoolCreate) -> Result<Spool, ServiceError> {
        payload.validate()?;
        let spool = self.backend.create_spool(payload).await?;
        self.cache
            .apply(&InvalidationPlan::for_mutation(Mutation::create(Entity::Spool)));
        info!(id = %spool.id, barcode = %spool.barcode, "Created spool archetype");
        Ok(spool)
    }

    #[instrument(skip(self, payload))]
    pub async fn update(&self, id: &str, payload: &SpoolUpdate) -> Result<Spool, ServiceError> {
        payload.validate()?;
        let spool = self.backend.update_spool(id, payload).await?;
        self.cache
            .apply(&InvalidationPlan::for_mutation(Mutation::update(Entity::Spool)));
        info!(id, "Updated spool archetype");
        Ok(spool)
    }

    /// Removes the archetype only. Its units are left as they are.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.backend.delete_spool(id).await?;
        self.cache
            .apply(&InvalidationPlan::for_mutation(Mutation::delete(Entity::Spool)));
        info!(id, "Deleted spool archetype");
        Ok(())
    }
}
