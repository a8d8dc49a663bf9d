#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use filament_inventory::{
    config::ClientConfig,
    errors::ServiceError,
    gateway::{ByteStream, InventoryBackend, LookupBackend},
    models::*,
    InventoryClient,
};
use serde_json::json;

/// In-memory stand-in for the inventory backend.
///
/// Records every call, can fail chosen unit creations by their 1-based
/// call number and can delay barcode searches per barcode.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    spools: Vec<Spool>,
    units: Vec<InventoryUnit>,
    brands: Vec<Brand>,
    colors: Vec<Color>,
    materials: Vec<Material>,
    calls: Vec<String>,
    unit_payloads: Vec<InventoryCreate>,
    unit_creates: usize,
    failing_unit_creates: HashSet<usize>,
    fail_spool_create: Option<String>,
    search_delays: HashMap<String, Duration>,
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    /// Resolves lookup rows by name, creating missing ones as the backend does.
    fn brand_named(&mut self, name: &str) -> BrandNested {
        if let Some(row) = self.brands.iter().find(|row| row.name == name) {
            return BrandNested { id: row.id.clone(), name: row.name.clone() };
        }
        let id = self.id("brand");
        self.brands.push(Brand {
            id: id.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        BrandNested { id, name: name.to_string() }
    }

    fn material_named(&mut self, name: &str) -> MaterialNested {
        if let Some(row) = self.materials.iter().find(|row| row.name == name) {
            return MaterialNested { id: row.id.clone(), name: row.name.clone() };
        }
        let id = self.id("material");
        self.materials.push(Material {
            id: id.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        MaterialNested { id, name: name.to_string() }
    }

    fn color_named(&mut self, name: &str, hex_code: Option<&str>) -> ColorNested {
        if let Some(row) = self.colors.iter().find(|row| row.name == name) {
            return ColorNested {
                id: row.id.clone(),
                name: row.name.clone(),
                hex_code: row.hex_code.clone(),
            };
        }
        let id = self.id("color");
        let hex_code = hex_code.unwrap_or("#000000").to_string();
        self.colors.push(Color {
            id: id.clone(),
            name: name.to_string(),
            hex_code: hex_code.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        ColorNested { id, name: name.to_string(), hex_code }
    }
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fails the given unit creations, counted across the whole test.
    pub fn fail_unit_creates(&self, positions: &[usize]) {
        self.lock().failing_unit_creates = positions.iter().copied().collect();
    }

    pub fn fail_spool_create(&self, detail: &str) {
        self.lock().fail_spool_create = Some(detail.to_string());
    }

    pub fn delay_search(&self, barcode: &str, delay: Duration) {
        self.lock()
            .search_delays
            .insert(barcode.to_string(), delay);
    }

    pub fn seed_spool(&self, barcode: &str, base_weight: f64) -> Spool {
        let mut state = self.lock();
        let id = state.id("s");
        let spool = spool_fixture(&id, barcode, base_weight);
        state.spools.push(spool.clone());
        spool
    }

    pub fn seed_unit(&self, spool: &Spool, weight: f64, status: InventoryStatus) -> InventoryUnit {
        let mut state = self.lock();
        let id = state.id("i");
        let unit = unit_fixture(&id, spool, weight, status);
        state.units.push(unit.clone());
        unit
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn unit_payloads(&self) -> Vec<InventoryCreate> {
        self.lock().unit_payloads.clone()
    }

    pub fn units(&self) -> Vec<InventoryUnit> {
        self.lock().units.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: impl Into<String>) {
        self.lock().calls.push(call.into());
    }

    fn stats(state: &FakeState) -> InventoryStats {
        InventoryStats {
            total_spools: state.units.len() as u64,
            total_weight: state.units.iter().map(|u| u.weight).sum(),
            spools_in_use: state.units.iter().filter(|u| u.is_in_use).count() as u64,
            low_stock_count: state.units.iter().filter(|u| u.is_low_stock()).count() as u64,
        }
    }
}

fn not_found(what: &str) -> ServiceError {
    ServiceError::NotFound(format!("{what} not found"))
}

#[async_trait]
impl InventoryBackend for FakeBackend {
    async fn list_spools(&self) -> Result<Vec<Spool>, ServiceError> {
        self.record("list_spools");
        Ok(self.lock().spools.clone())
    }

    async fn search_spools_by_barcode(&self, barcode: &str) -> Result<Vec<Spool>, ServiceError> {
        self.record(format!("search_spools_by_barcode:{barcode}"));
        let delay = self.lock().search_delays.get(barcode).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .lock()
            .spools
            .iter()
            .filter(|spool| spool.barcode == barcode)
            .cloned()
            .collect())
    }

    async fn list_spools_by_status(
        &self,
        status: InventoryStatus,
    ) -> Result<Vec<Spool>, ServiceError> {
        self.record(format!("list_spools_by_status:{status}"));
        let state = self.lock();
        let ids: HashSet<&str> = state
            .units
            .iter()
            .filter(|unit| unit.status() == status)
            .map(|unit| unit.spool.id.as_str())
            .collect();
        Ok(state
            .spools
            .iter()
            .filter(|spool| ids.contains(spool.id.as_str()))
            .cloned()
            .collect())
    }

    async fn get_spool(&self, id: &str) -> Result<Spool, ServiceError> {
        self.record(format!("get_spool:{id}"));
        self.lock()
            .spools
            .iter()
            .find(|spool| spool.id == id)
            .cloned()
            .ok_or_else(|| not_found("Spool"))
    }

    async fn create_spool(&self, payload: &SpoolCreate) -> Result<Spool, ServiceError> {
        self.record("create_spool");
        let mut state = self.lock();
        if let Some(detail) = state.fail_spool_create.clone() {
            return Err(ServiceError::ValidationError(detail));
        }
        let id = state.id("s");
        let barcode = payload.barcode.clone().unwrap_or_else(|| format!("GEN-{id}"));
        let mut spool = spool_fixture(&id, &barcode, payload.base_weight);
        spool.material = state.material_named(&payload.material_name);
        spool.brand = state.brand_named(&payload.brand_name);
        spool.color = state.color_named(&payload.color_name, payload.color_hex_code.as_deref());
        spool.is_box = payload.is_box;
        spool.thickness = payload.thickness;
        spool.spool_return = payload.spool_return;
        state.spools.push(spool.clone());
        Ok(spool)
    }

    async fn update_spool(&self, id: &str, payload: &SpoolUpdate) -> Result<Spool, ServiceError> {
        self.record(format!("update_spool:{id}"));
        let mut state = self.lock();
        let brand = payload.brand_name.as_deref().map(|name| state.brand_named(name));
        let material = payload.material_name.as_deref().map(|name| state.material_named(name));
        let color = payload
            .color_name
            .as_deref()
            .map(|name| state.color_named(name, payload.color_hex_code.as_deref()));
        let spool = state
            .spools
            .iter_mut()
            .find(|spool| spool.id == id)
            .ok_or_else(|| not_found("Spool"))?;
        if let Some(brand) = brand {
            spool.brand = brand;
        }
        if let Some(material) = material {
            spool.material = material;
        }
        if let Some(color) = color {
            spool.color = color;
        }
        if let Some(weight) = payload.base_weight {
            spool.base_weight = weight;
        }
        if let Some(barcode) = &payload.barcode {
            spool.barcode = barcode.clone();
        }
        let updated = spool.clone();
        for unit in state.units.iter_mut().filter(|unit| unit.spool.id == id) {
            unit.spool = updated.clone();
        }
        Ok(updated)
    }

    async fn delete_spool(&self, id: &str) -> Result<(), ServiceError> {
        self.record(format!("delete_spool:{id}"));
        let mut state = self.lock();
        let before = state.spools.len();
        state.spools.retain(|spool| spool.id != id);
        if state.spools.len() == before {
            return Err(not_found("Spool"));
        }
        Ok(())
    }

    async fn list_inventory(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<InventoryUnit>, ServiceError> {
        self.record(format!("list_inventory:{skip}:{limit}"));
        Ok(self
            .lock()
            .units
            .iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_inventory_unit(&self, id: &str) -> Result<InventoryUnit, ServiceError> {
        self.record(format!("get_inventory_unit:{id}"));
        self.lock()
            .units
            .iter()
            .find(|unit| unit.id == id)
            .cloned()
            .ok_or_else(|| not_found("Inventory item"))
    }

    async fn inventory_by_spool(&self, spool_id: &str) -> Result<Vec<InventoryUnit>, ServiceError> {
        self.record(format!("inventory_by_spool:{spool_id}"));
        Ok(self
            .lock()
            .units
            .iter()
            .filter(|unit| unit.spool.id == spool_id)
            .cloned()
            .collect())
    }

    async fn inventory_in_use(&self) -> Result<Vec<InventoryUnit>, ServiceError> {
        self.record("inventory_in_use");
        Ok(self
            .lock()
            .units
            .iter()
            .filter(|unit| unit.is_in_use)
            .cloned()
            .collect())
    }

    async fn inventory_count(&self, spool_id: &str) -> Result<InventoryCount, ServiceError> {
        self.record(format!("inventory_count:{spool_id}"));
        let count = self
            .lock()
            .units
            .iter()
            .filter(|unit| unit.spool.id == spool_id)
            .count() as u64;
        Ok(InventoryCount {
            spool_id: spool_id.to_string(),
            count,
        })
    }

    async fn create_inventory_unit(
        &self,
        payload: &InventoryCreate,
    ) -> Result<InventoryUnit, ServiceError> {
        self.record(format!("create_inventory_unit:{}", payload.spool_id));
        let mut state = self.lock();
        state.unit_payloads.push(payload.clone());
        state.unit_creates += 1;
        if state.failing_unit_creates.contains(&state.unit_creates) {
            return Err(ServiceError::ServerError {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        let spool = state
            .spools
            .iter()
            .find(|spool| spool.id == payload.spool_id)
            .cloned()
            .ok_or_else(|| not_found("Spool"))?;
        let id = state.id("i");
        let status = payload.status_name.unwrap_or_default();
        let mut unit = unit_fixture(&id, &spool, payload.weight.unwrap_or(spool.base_weight), status);
        unit.is_in_use = payload.is_in_use.unwrap_or(status == InventoryStatus::InUse);
        unit.custom_properties = payload.custom_properties.clone();
        state.units.push(unit.clone());
        Ok(unit)
    }

    async fn update_inventory_unit(
        &self,
        id: &str,
        payload: &InventoryUpdate,
    ) -> Result<InventoryUnit, ServiceError> {
        self.record(format!("update_inventory_unit:{id}"));
        let mut state = self.lock();
        let unit = state
            .units
            .iter_mut()
            .find(|unit| unit.id == id)
            .ok_or_else(|| not_found("Inventory item"))?;
        if let Some(weight) = payload.weight {
            unit.weight = weight;
        }
        if let Some(in_use) = payload.is_in_use {
            unit.is_in_use = in_use;
        }
        if let Some(status) = payload.status_name {
            unit.status.name = status;
        }
        if payload.custom_properties.is_some() {
            unit.custom_properties = payload.custom_properties.clone();
        }
        unit.updated_at = Utc::now();
        Ok(unit.clone())
    }

    async fn delete_inventory_unit(&self, id: &str) -> Result<(), ServiceError> {
        self.record(format!("delete_inventory_unit:{id}"));
        let mut state = self.lock();
        let before = state.units.len();
        state.units.retain(|unit| unit.id != id);
        if state.units.len() == before {
            return Err(not_found("Inventory item"));
        }
        Ok(())
    }

    async fn dashboard(&self) -> Result<DashboardResponse, ServiceError> {
        self.record("dashboard");
        let state = self.lock();
        Ok(DashboardResponse {
            stats: Self::stats(&state),
            recent_activity: Vec::new(),
            latest_insight: None,
        })
    }

    async fn dashboard_stats(&self) -> Result<InventoryStats, ServiceError> {
        self.record("dashboard_stats");
        Ok(Self::stats(&self.lock()))
    }

    async fn activity(&self, limit: u32) -> Result<Vec<ActivityLog>, ServiceError> {
        self.record(format!("activity:{limit}"));
        Ok(Vec::new())
    }

    async fn insights_history(&self, limit: u32) -> Result<InsightsHistoryResponse, ServiceError> {
        self.record(format!("insights_history:{limit}"));
        Ok(InsightsHistoryResponse {
            insights: Vec::new(),
        })
    }

    async fn latest_insight(&self) -> Result<Option<Insight>, ServiceError> {
        self.record("latest_insight");
        Ok(None)
    }

    async fn generate_insight(&self) -> Result<GenerateInsightResponse, ServiceError> {
        self.record("generate_insight");
        Ok(GenerateInsightResponse {
            insight: insight_fixture("ins-1", "Stock looks healthy."),
            message: "Insight generated".to_string(),
        })
    }

    async fn delete_insight(&self, id: &str) -> Result<(), ServiceError> {
        self.record(format!("delete_insight:{id}"));
        Ok(())
    }

    async fn jobs(&self, limit: u32) -> Result<Vec<Job>, ServiceError> {
        self.record(format!("jobs:{limit}"));
        Ok(Vec::new())
    }

    async fn stream_insight(&self) -> Result<ByteStream, ServiceError> {
        self.record("stream_insight");
        let complete = json!({
            "type": "complete",
            "insight": insight_fixture("ins-2", "Order more PETG."),
        });
        let chunks: Vec<Result<Bytes, ServiceError>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"type\":\"content\",\"content\":\"Order \"}\n\n",
            )),
            Ok(Bytes::from_static(
                b"data: {\"type\":\"content\",\"content\":\"more PETG.\"}\n\n",
            )),
            Ok(Bytes::from(format!("data: {complete}\n\n"))),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

macro_rules! fake_lookup_table {
    ($entity:ty, $field:ident, $prefix:literal, |$id:ident, $payload:ident| $build:expr) => {
        #[async_trait]
        impl LookupBackend<$entity> for FakeBackend {
            async fn list(&self, name: Option<&str>) -> Result<Vec<$entity>, ServiceError> {
                self.record(format!("list_{}:{}", $prefix, name.unwrap_or("")));
                Ok(self
                    .lock()
                    .$field
                    .iter()
                    .filter(|row| name.map_or(true, |name| row.name == name))
                    .cloned()
                    .collect())
            }

            async fn get(&self, id: &str) -> Result<$entity, ServiceError> {
                self.record(format!("get_{}:{id}", $prefix));
                self.lock()
                    .$field
                    .iter()
                    .find(|row| row.id == id)
                    .cloned()
                    .ok_or_else(|| not_found($prefix))
            }

            async fn create(
                &self,
                $payload: &<$entity as LookupEntity>::Create,
            ) -> Result<$entity, ServiceError> {
                self.record(format!("create_{}", $prefix));
                let mut state = self.lock();
                if state.$field.iter().any(|row| row.name == $payload.name) {
                    return Err(ServiceError::ValidationError(format!(
                        "{} already exists",
                        $payload.name
                    )));
                }
                let $id = state.id($prefix);
                let row: $entity = $build;
                state.$field.push(row.clone());
                Ok(row)
            }

            async fn update(
                &self,
                id: &str,
                $payload: &<$entity as LookupEntity>::Create,
            ) -> Result<$entity, ServiceError> {
                self.record(format!("update_{}:{id}", $prefix));
                let mut state = self.lock();
                let row = state
                    .$field
                    .iter_mut()
                    .find(|row| row.id == id)
                    .ok_or_else(|| not_found($prefix))?;
                row.name = $payload.name.clone();
                Ok(row.clone())
            }

            async fn delete(&self, id: &str) -> Result<(), ServiceError> {
                self.record(format!("delete_{}:{id}", $prefix));
                self.lock().$field.retain(|row| row.id != id);
                Ok(())
            }
        }
    };
}

fake_lookup_table!(Brand, brands, "brand", |id, payload| Brand {
    id,
    name: payload.name.clone(),
    created_at: Utc::now(),
    updated_at: Utc::now(),
});

fake_lookup_table!(Material, materials, "material", |id, payload| Material {
    id,
    name: payload.name.clone(),
    created_at: Utc::now(),
    updated_at: Utc::now(),
});

fake_lookup_table!(Color, colors, "color", |id, payload| Color {
    id,
    name: payload.name.clone(),
    hex_code: payload.hex_code.clone(),
    created_at: Utc::now(),
    updated_at: Utc::now(),
});

pub fn client_with(backend: Arc<FakeBackend>) -> InventoryClient {
    InventoryClient::with_backend(ClientConfig::default(), backend)
}

pub fn spool_fixture(id: &str, barcode: &str, base_weight: f64) -> Spool {
    serde_json::from_value(json!({
        "id": id,
        "barcode": barcode,
        "base_weight": base_weight,
        "is_box": false,
        "thickness": 1.75,
        "spool_return": false,
        "color": {"id": "c-1", "name": "Red", "hex_code": "#FF0000"},
        "brand": {"id": "b-1", "name": "Acme"},
        "material": {"id": "m-1", "name": "PLA"},
        "created_at": "2024-05-01T10:00:00",
        "updated_at": "2024-05-01T10:00:00"
    }))
    .expect("valid spool fixture")
}

pub fn unit_fixture(
    id: &str,
    spool: &Spool,
    weight: f64,
    status: InventoryStatus,
) -> InventoryUnit {
    serde_json::from_value(json!({
        "id": id,
        "weight": weight,
        "is_in_use": status == InventoryStatus::InUse,
        "custom_properties": null,
        "spool": spool,
        "status": {"id": format!("st-{status}"), "name": status},
        "created_at": "2024-05-01T10:00:00",
        "updated_at": "2024-05-01T10:00:00"
    }))
    .expect("valid inventory unit fixture")
}

pub fn insight_fixture(id: &str, content: &str) -> Insight {
    serde_json::from_value(json!({
        "id": id,
        "content": content,
        "generated_by": "scheduler",
        "created_at": "2024-05-01T10:00:00"
    }))
    .expect("valid insight fixture")
}
