use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::color::validate_hex_code;
use super::{BrandNested, ColorNested, MaterialNested};

/// Full-spool reference weight used when the form is first opened.
pub const DEFAULT_BASE_WEIGHT: f64 = 1000.0;
/// Standard filament diameter in millimetres.
pub const DEFAULT_THICKNESS: f64 = 1.75;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeNameNested {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNested {
    pub id: String,
    pub name: String,
}

/// A spool archetype: the catalog definition of a spool type, distinct from
/// the physical units tracked in inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spool {
    pub id: String,
    pub barcode: String,
    pub base_weight: f64,
    #[serde(default)]
    pub is_box: bool,
    #[serde(default)]
    pub thickness: Option<f64>,
    #[serde(default)]
    pub spool_return: bool,

    pub color: ColorNested,
    pub brand: BrandNested,
    pub material: MaterialNested,
    #[serde(default)]
    pub trade_name: Option<TradeNameNested>,
    #[serde(default)]
    pub category: Option<CategoryNested>,

    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Spool {
    /// `Brand Material Color`, the label used in notifications and tables.
    pub fn display_name(&self) -> String {
        format!(
            "{} {} {}",
            self.brand.name, self.material.name, self.color.name
        )
    }
}

/// Payload for creating a spool archetype. Lookup tables are referenced by
/// name and created on the fly by the backend when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SpoolCreate {
    /// Generated by the backend when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub barcode: Option<String>,
    #[validate(custom = "validate_positive_weight")]
    pub base_weight: f64,
    #[serde(default)]
    pub is_box: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_positive_thickness")]
    pub thickness: Option<f64>,
    #[serde(default)]
    pub spool_return: bool,

    #[validate(length(min = 1, message = "Color is required"))]
    pub color_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_hex_code")]
    pub color_hex_code: Option<String>,
    #[validate(length(min = 1, message = "Brand is required"))]
    pub brand_name: String,
    #[validate(length(min = 1, message = "Material is required"))]
    pub material_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

impl SpoolCreate {
    pub fn new(
        material_name: impl Into<String>,
        brand_name: impl Into<String>,
        color_name: impl Into<String>,
        base_weight: f64,
    ) -> Self {
        Self {
            barcode: None,
            base_weight,
            is_box: false,
            thickness: None,
            spool_return: false,
            color_name: color_name.into(),
            color_hex_code: None,
            brand_name: brand_name.into(),
            material_name: material_name.into(),
            trade_name: None,
            category_name: None,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        let barcode = barcode.into();
        self.barcode = if barcode.trim().is_empty() {
            None
        } else {
            Some(barcode.trim().to_string())
        };
        self
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = Some(thickness);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct SpoolUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_positive_weight")]
    pub base_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_box: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_positive_thickness")]
    pub thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spool_return: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_hex_code")]
    pub color_hex_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

fn validate_positive_weight(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("base_weight");
        err.message = Some("Base weight must be a positive number of grams".into());
        Err(err)
    }
}

fn validate_positive_thickness(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("thickness");
        err.message = Some("Thickness must be a positive number of millimetres".into());
        Err(err)
    }
}
