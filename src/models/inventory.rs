use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::{Validate, ValidationError};

use super::Spool;

/// Fraction of the base weight under which a unit counts as low stock.
pub const LOW_STOCK_RATIO: f64 = 0.2;

/// Lifecycle status of a physical spool. Exactly one applies at a time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InventoryStatus {
    #[default]
    InStock,
    InUse,
    Depleted,
    Ordered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusNested {
    pub id: String,
    pub name: InventoryStatus,
}

/// One physical, trackable spool tied to a single archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryUnit {
    pub id: String,
    pub weight: f64,
    pub is_in_use: bool,
    #[serde(default)]
    pub custom_properties: Option<String>,

    pub spool: Spool,
    pub status: StatusNested,

    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryUnit {
    pub fn status(&self) -> InventoryStatus {
        self.status.name
    }

    /// Remaining filament as a fraction of the archetype's full weight.
    pub fn remaining_ratio(&self) -> f64 {
        if self.spool.base_weight <= 0.0 {
            return 0.0;
        }
        (self.weight / self.spool.base_weight).clamp(0.0, 1.0)
    }

    pub fn is_low_stock(&self) -> bool {
        self.remaining_ratio() < LOW_STOCK_RATIO
    }

    /// Checks the unit invariants: weight within `0..=base_weight` and the
    /// in-use flag agreeing with the status.
    pub fn is_consistent(&self) -> bool {
        let weight_ok = self.weight >= 0.0 && self.weight <= self.spool.base_weight;
        let flag_ok = !self.is_in_use || self.status.name == InventoryStatus::InUse;
        weight_ok && flag_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InventoryCreate {
    #[validate(length(min = 1))]
    pub spool_id: String,
    /// Defaults server-side to the archetype's base weight.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_weight")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_in_use: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_name: Option<InventoryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<String>,
}

impl InventoryCreate {
    pub fn for_spool(spool_id: impl Into<String>) -> Self {
        Self {
            spool_id: spool_id.into(),
            weight: None,
            is_in_use: None,
            status_name: None,
            custom_properties: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct InventoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_weight")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_in_use: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_name: Option<InventoryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCount {
    pub spool_id: String,
    pub count: u64,
}

fn validate_weight(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("weight");
        err.message = Some("Weight must be zero or a positive number of grams".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn unit(weight: f64, in_use: bool, status: &str) -> InventoryUnit {
        serde_json::from_value(json!({
            "id": "i-1",
            "weight": weight,
            "is_in_use": in_use,
            "custom_properties": null,
            "spool": {
                "id": "s-1",
                "barcode": "PLA-RED-001",
                "base_weight": 1000.0,
                "color": {"id": "c-1", "name": "Red", "hex_code": "#FF0000"},
                "brand": {"id": "b-1", "name": "Acme"},
                "material": {"id": "m-1", "name": "PLA"},
                "created_at": "2024-05-01T10:00:00",
                "updated_at": "2024-05-01T10:00:00"
            },
            "status": {"id": "st-1", "name": status},
            "created_at": "2024-05-01T10:00:00",
            "updated_at": "2024-05-01T10:00:00"
        }))
        .expect("valid inventory unit")
    }

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(InventoryStatus::InUse.to_string(), "in_use");
        assert_eq!(
            InventoryStatus::from_str("depleted").unwrap(),
            InventoryStatus::Depleted
        );
        assert!(InventoryStatus::from_str("lost").is_err());
        assert_eq!(InventoryStatus::default(), InventoryStatus::InStock);
    }

    #[test]
    fn unknown_status_is_rejected_on_parse() {
        let result = serde_json::from_value::<StatusNested>(json!({"id": "x", "name": "lost"}));
        assert!(result.is_err());
    }

    #[test]
    fn invariants_and_low_stock() {
        let fresh = unit(1000.0, false, "in_stock");
        assert!(fresh.is_consistent());
        assert!(!fresh.is_low_stock());

        let nearly_empty = unit(150.0, true, "in_use");
        assert!(nearly_empty.is_consistent());
        assert!(nearly_empty.is_low_stock());

        assert!(!unit(1200.0, false, "in_stock").is_consistent());
        assert!(!unit(500.0, true, "in_stock").is_consistent());
    }

    #[test]
    fn create_payload_uses_status_names() {
        let mut payload = InventoryCreate::for_spool("s-1");
        payload.weight = Some(1000.0);
        payload.status_name = Some(InventoryStatus::InStock);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"spool_id": "s-1", "weight": 1000.0, "status_name": "in_stock"})
        );
    }
}
