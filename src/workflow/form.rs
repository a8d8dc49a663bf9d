use crate::models::spool::{DEFAULT_BASE_WEIGHT, DEFAULT_THICKNESS};
use crate::models::{Color, InventoryStatus, SpoolCreate};

use super::{CreateSpoolRequest, UnitDefaults};

pub const DEFAULT_QUANTITY: u32 = 1;

/// Editable state of the "new spool" form.
#[derive(Debug, Clone, PartialEq)]
pub struct SpoolForm {
    pub barcode: String,
    pub quantity: u32,
    pub is_box: bool,
    pub base_weight: f64,
    pub thickness: Option<f64>,
    pub spool_return: bool,
    pub material_name: String,
    pub brand_name: String,
    pub color_name: String,
    pub color_hex_code: Option<String>,
    pub trade_name: Option<String>,
    pub category_name: Option<String>,
    /// Per-unit weight override; `None` uses the base weight.
    pub unit_weight: Option<f64>,
    pub unit_status: Option<InventoryStatus>,
    pub notes: Option<String>,
}

impl Default for SpoolForm {
    fn default() -> Self {
        Self {
            barcode: String::new(),
            quantity: DEFAULT_QUANTITY,
            is_box: false,
            base_weight: DEFAULT_BASE_WEIGHT,
            thickness: Some(DEFAULT_THICKNESS),
            spool_return: false,
            material_name: String::new(),
            brand_name: String::new(),
            color_name: String::new(),
            color_hex_code: None,
            trade_name: None,
            category_name: None,
            unit_weight: None,
            unit_status: None,
            notes: None,
        }
    }
}

impl SpoolForm {
    /// A fresh form pre-filled with a scanned barcode.
    pub fn with_barcode(barcode: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            ..Self::default()
        }
    }

    /// Picks a color by name and copies its hex code when the color is
    /// already known.
    pub fn select_color(&mut self, name: &str, known: &[Color]) {
        self.color_name = name.to_string();
        self.color_hex_code = known
            .iter()
            .find(|color| color.name == name)
            .map(|color| color.hex_code.clone());
    }

    pub fn to_request(&self) -> CreateSpoolRequest {
        let mut spool = SpoolCreate::new(
            self.material_name.trim(),
            self.brand_name.trim(),
            self.color_name.trim(),
            self.base_weight,
        )
        .with_barcode(self.barcode.as_str());
        spool.is_box = self.is_box;
        spool.thickness = self.thickness;
        spool.spool_return = self.spool_return;
        spool.color_hex_code = self.color_hex_code.clone();
        spool.trade_name = non_blank(&self.trade_name);
        spool.category_name = non_blank(&self.category_name);

        CreateSpoolRequest {
            spool,
            quantity: self.quantity,
            unit: UnitDefaults {
                weight: self.unit_weight,
                status: self.unit_status,
                is_in_use: None,
                notes: non_blank(&self.notes),
            },
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
