use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total_spools: u64,
    pub total_weight: f64,
    pub spools_in_use: u64,
    /// Units under 20% of their archetype's base weight.
    pub low_stock_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: String,
    pub action_type: String,
    pub entity_type: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub extra_data: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub job_id: Option<String>,
    pub generated_by: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Ready,
    Processing,
    Completed,
    Failed,
}

/// A background job run by the backend worker (e.g. scheduled insight
/// generation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub job_type: String,
    pub status: JobStatus,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "super::timestamp::option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "super::timestamp::option")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_retry(&self) -> bool {
        self.status == JobStatus::Failed && self.retry_count < self.max_retries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub stats: InventoryStats,
    pub recent_activity: Vec<ActivityLog>,
    #[serde(default)]
    pub latest_insight: Option<Insight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsHistoryResponse {
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateInsightResponse {
    pub insight: Insight,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_retry_rules() {
        let job: Job = serde_json::from_value(json!({
            "id": "j-1",
            "job_type": "generate_insight",
            "status": "failed",
            "payload": null,
            "result": null,
            "error_message": "upstream timeout",
            "retry_count": 1,
            "max_retries": 3,
            "created_at": "2024-05-01T10:00:00",
            "started_at": "2024-05-01T10:00:01",
            "completed_at": null
        }))
        .unwrap();
        assert!(job.is_finished());
        assert!(job.can_retry());
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_none());
    }
}
