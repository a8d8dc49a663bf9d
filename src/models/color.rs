use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::cache::{Collection, Entity};

pub const DEFAULT_HEX_CODE: &str = "#000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub id: String,
    pub name: String,
    pub hex_code: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ColorCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom = "validate_hex_code")]
    pub hex_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorNested {
    pub id: String,
    pub name: String,
    #[serde(default = "default_hex_code")]
    pub hex_code: String,
}

fn default_hex_code() -> String {
    DEFAULT_HEX_CODE.to_string()
}

/// Accepts `#RRGGBB` only, the single format the backend stores.
pub fn validate_hex_code(value: &str) -> Result<(), ValidationError> {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("hex_code");
        err.message = Some("Color must be a hex code like #FF0000".into());
        Err(err)
    }
}

impl super::LookupEntity for Color {
    type Create = ColorCreate;
    const COLLECTION: Collection = Collection::Colors;
    const ENTITY: Entity = Entity::Color;
    const RESOURCE: &'static str = "colors";

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
