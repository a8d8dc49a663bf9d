use std::sync::Arc;
use tracing::{info, instrument};

use crate::cache::{Collection, Entity, InvalidationPlan, Mutation, QueryCache, QueryKey};
use crate::errors::ServiceError;
use crate::gateway::InventoryBackend;
use crate::models::{
    ActivityLog, DashboardResponse, GenerateInsightResponse, Insight, InsightsHistoryResponse,
    InventoryStats, Job,
};

pub const DEFAULT_ACTIVITY_LIMIT: u32 = 50;
pub const DEFAULT_INSIGHTS_LIMIT: u32 = 10;
pub const DEFAULT_JOBS_LIMIT: u32 = 20;

fn view(name: &str) -> QueryKey {
    QueryKey::filtered(Collection::Dashboard, [("view", name)])
}

fn limited_view(name: &str, limit: u32) -> QueryKey {
    QueryKey::filtered(
        Collection::Dashboard,
        [("view", name.to_string()), ("limit", limit.to_string())],
    )
}

#[derive(Clone)]
pub struct DashboardService {
    backend: Arc<dyn InventoryBackend>,
    cache: QueryCache,
}

impl DashboardService {
    pub fn new(backend: Arc<dyn InventoryBackend>, cache: QueryCache) -> Self {
        Self { backend, cache }
    }

    pub async fn overview(&self) -> Result<DashboardResponse, ServiceError> {
        self.cache
            .get_or_fetch(QueryKey::list(Collection::Dashboard), || {
                self.backend.dashboard()
            })
            .await
    }

    pub async fn stats(&self) -> Result<InventoryStats, ServiceError> {
        self.cache
            .get_or_fetch(view("stats"), || self.backend.dashboard_stats())
            .await
    }

    pub async fn activity(&self, limit: u32) -> Result<Vec<ActivityLog>, ServiceError> {
        self.cache
            .get_or_fetch(limited_view("activity", limit), || {
                self.backend.activity(limit)
            })
            .await
    }

    pub async fn insights_history(&self, limit: u32) -> Result<Vec<Insight>, ServiceError> {
        let history: InsightsHistoryResponse = self
            .cache
            .get_or_fetch(limited_view("insights", limit), || {
                self.backend.insights_history(limit)
            })
            .await?;
        Ok(history.insights)
    }

    pub async fn latest_insight(&self) -> Result<Option<Insight>, ServiceError> {
        self.cache
            .get_or_fetch(view("latest_insight"), || self.backend.latest_insight())
            .await
    }

    pub async fn jobs(&self, limit: u32) -> Result<Vec<Job>, ServiceError> {
        self.cache
            .get_or_fetch(limited_view("jobs", limit), || self.backend.jobs(limit))
            .await
    }

    /// Asks the backend for a fresh insight and waits for the whole text.
    #[instrument(skip(self))]
    pub async fn generate_insight(&self) -> Result<GenerateInsightResponse, ServiceError> {
        let response = self.backend.generate_insight().await?;
        self.cache
            .apply(&InvalidationPlan::for_mutation(Mutation::create(Entity::Insight)));
        info!(id = %response.insight.id, "Generated insight");
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn delete_insight(&self, id: &str) -> Result<(), ServiceError> {
        self.backend.delete_insight(id).await?;
        self.cache
            .apply(&InvalidationPlan::for_mutation(Mutation::delete(Entity::Insight)));
        info!(id, "Deleted insight");
        Ok(())
    }

    pub(crate) fn backend(&self) -> &Arc<dyn InventoryBackend> {
        &self.backend
    }

    pub(crate) fn cache(&self) -> &QueryCache {
        &self.cache
    }
}
