use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::cache::{InvalidationPlan, Mutation, QueryCache, QueryKey};
use crate::errors::ServiceError;
use crate::gateway::LookupBackend;
use crate::models::{Brand, Color, LookupEntity, Material};

pub type BrandService = LookupService<Brand>;
pub type ColorService = LookupService<Color>;
pub type MaterialService = LookupService<Material>;

/// Brands, colors and materials share one shape: a named row with plain
/// CRUD and an exact-name search.
pub struct LookupService<T: LookupEntity> {
    backend: Arc<dyn LookupBackend<T>>,
    cache: QueryCache,
}

impl<T: LookupEntity> Clone for LookupService<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<T: LookupEntity> LookupService<T> {
    pub fn new(backend: Arc<dyn LookupBackend<T>>, cache: QueryCache) -> Self {
        Self { backend, cache }
    }

    pub async fn list(&self) -> Result<Vec<T>, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::list(T::COLLECTION), || self.backend.list(None))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<T, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::detail(T::COLLECTION, id), || self.backend.get(id))
            .await
    }

    pub async fn search_by_name(&self, name: &str) -> Result<Vec<T>, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }
        self.cache
            .get_or_fetch(
                QueryKey::filtered(T::COLLECTION, [("name", name)]),
                || self.backend.list(Some(name)),
            )
            .await
    }

    #[instrument(skip(self, payload), fields(resource = T::RESOURCE))]
    pub async fn create(&self, payload: T::Create) -> Result<T, ServiceError> {
        payload.validate()?;
        let created = self.backend.create(&payload).await?;
        self.cache
            .apply(&InvalidationPlan::for_mutation(Mutation::create(T::ENTITY)));
        info!(id = created.id(), name = created.name(), "Created lookup entry");
        Ok(created)
    }

    #[instrument(skip(self, payload), fields(resource = T::RESOURCE))]
    pub async fn update(&self, id: &str, payload: T::Create) -> Result<T, ServiceError> {
        payload.validate()?;
        let updated = self.backend.update(id, &payload).await?;
        self.cache
            .apply(&InvalidationPlan::for_mutation(Mutation::update(T::ENTITY)));
        info!(id, "Updated lookup entry");
        Ok(updated)
    }

    #[instrument(skip(self), fields(resource = T::RESOURCE))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.backend.delete(id).await?;
        self.cache
            .apply(&InvalidationPlan::for_mutation(Mutation::delete(T::ENTITY)));
        info!(id, "Deleted lookup entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Collection;
    use crate::models::BrandCreate;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBrands {
        rows: Mutex<Vec<Brand>>,
        list_calls: Mutex<usize>,
    }

    fn brand(id: &str, name: &str) -> Brand {
        Brand {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[async_trait]
    impl LookupBackend<Brand> for FakeBrands {
        async fn list(&self, name: Option<&str>) -> Result<Vec<Brand>, ServiceError> {
            *self.list_calls.lock().unwrap() += 1;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|b| name.map(|n| b.name == n).unwrap_or(true))
                .cloned()
                .collect())
        }

        async fn get(&self, id: &str) -> Result<Brand, ServiceError> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.id == id)
                .cloned()
                .ok_or_else(|| ServiceError::NotFound(format!("brand {id}")))
        }

        async fn create(&self, payload: &BrandCreate) -> Result<Brand, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            let created = brand(&format!("b-{}", rows.len() + 1), &payload.name);
            rows.push(created.clone());
            Ok(created)
        }

        async fn update(&self, id: &str, payload: &BrandCreate) -> Result<Brand, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| ServiceError::NotFound(format!("brand {id}")))?;
            row.name = payload.name.clone();
            Ok(row.clone())
        }

        async fn delete(&self, id: &str) -> Result<(), ServiceError> {
            self.rows.lock().unwrap().retain(|b| b.id != id);
            Ok(())
        }
    }

    fn service() -> (BrandService, Arc<FakeBrands>, QueryCache) {
        let backend = Arc::new(FakeBrands::default());
        let cache = QueryCache::new();
        (
            LookupService::new(backend.clone(), cache.clone()),
            backend,
            cache,
        )
    }

    #[tokio::test]
    async fn create_invalidates_list() {
        let (svc, backend, _) = service();
        assert!(svc.list().await.unwrap().is_empty());
        assert!(svc.list().await.unwrap().is_empty());
        assert_eq!(*backend.list_calls.lock().unwrap(), 1);

        svc.create(BrandCreate { name: "Acme".into() }).await.unwrap();
        let brands = svc.list().await.unwrap();
        assert_eq!(brands.len(), 1);
        assert_eq!(*backend.list_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn update_cascades_to_spools_and_inventory() {
        let (svc, _, cache) = service();
        let created = svc.create(BrandCreate { name: "Acme".into() }).await.unwrap();
        cache
            .insert(QueryKey::list(Collection::Spools), &Vec::<u32>::new())
            .unwrap();
        cache
            .insert(QueryKey::list(Collection::InventoryInUse), &Vec::<u32>::new())
            .unwrap();

        svc.update(&created.id, BrandCreate { name: "Acme Labs".into() })
            .await
            .unwrap();
        assert!(!cache.is_fresh(&QueryKey::list(Collection::Spools)));
        assert!(cache.is_fresh(&QueryKey::list(Collection::InventoryInUse)));
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_backend() {
        let (svc, backend, _) = service();
        let err = svc.create(BrandCreate { name: String::new() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert!(backend.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_name_search_skips_backend() {
        let (svc, backend, _) = service();
        assert!(svc.search_by_name("  ").await.unwrap().is_empty());
        assert_eq!(*backend.list_calls.lock().unwrap(), 0);
    }
}
