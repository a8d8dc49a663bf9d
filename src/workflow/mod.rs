//! Spool intake: create an archetype, then put N physical units of it on
//! the shelf.
//!
//! Unit creations are independent. Some may fail while others succeed, and
//! the archetype is never rolled back; the caller gets a
//! [`WorkflowOutcome`] that says exactly how many units made it.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::cache::{Entity, InvalidationPlan, Mutation, QueryCache};
use crate::errors::ServiceError;
use crate::gateway::InventoryBackend;
use crate::models::{InventoryCreate, InventoryStatus, InventoryUnit, Spool, SpoolCreate};

pub mod form;
pub mod outcome;

pub use form::SpoolForm;
pub use outcome::{OutcomeKind, UnitFailure, WorkflowOutcome};

/// Per-unit settings applied to every unit in a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitDefaults {
    /// Starting weight; the archetype's base weight when `None`.
    pub weight: Option<f64>,
    /// Starting status; `in_stock` when `None`.
    pub status: Option<InventoryStatus>,
    pub is_in_use: Option<bool>,
    pub notes: Option<String>,
}

impl UnitDefaults {
    fn validate_against(&self, base_weight: f64) -> Result<(), ServiceError> {
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ServiceError::ValidationError(
                    "Weight must be zero or a positive number of grams".to_string(),
                ));
            }
            if weight > base_weight {
                return Err(ServiceError::ValidationError(format!(
                    "Weight {} g exceeds the spool's base weight of {} g",
                    weight, base_weight
                )));
            }
        }
        if self.is_in_use == Some(true)
            && self.status.map_or(false, |s| s != InventoryStatus::InUse)
        {
            return Err(ServiceError::ValidationError(
                "A unit marked in use must have status in_use".to_string(),
            ));
        }
        Ok(())
    }

    fn payload_for(&self, spool: &Spool) -> InventoryCreate {
        let status = match (self.status, self.is_in_use) {
            (Some(status), _) => status,
            (None, Some(true)) => InventoryStatus::InUse,
            (None, _) => InventoryStatus::InStock,
        };
        let is_in_use = match self.is_in_use {
            Some(flag) => Some(flag),
            None if status == InventoryStatus::InUse => Some(true),
            None => None,
        };
        InventoryCreate {
            spool_id: spool.id.clone(),
            weight: Some(self.weight.unwrap_or(spool.base_weight)),
            is_in_use,
            status_name: Some(status),
            custom_properties: self.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSpoolRequest {
    pub spool: SpoolCreate,
    /// Units to add after the archetype is created; zero adds none.
    pub quantity: u32,
    pub unit: UnitDefaults,
}

impl CreateSpoolRequest {
    pub fn new(spool: SpoolCreate, quantity: u32) -> Self {
        Self {
            spool,
            quantity,
            unit: UnitDefaults::default(),
        }
    }

    /// Everything that can be checked before the first request goes out.
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.spool.validate()?;
        self.unit.validate_against(self.spool.base_weight)
    }
}

/// Creates `quantity` units concurrently and sorts the results into
/// successes and positioned failures.
async fn create_units(
    backend: &dyn InventoryBackend,
    spool: &Spool,
    quantity: u32,
    unit: &UnitDefaults,
) -> (Vec<InventoryUnit>, Vec<UnitFailure>) {
    let payload = unit.payload_for(spool);
    let results = join_all((0..quantity).map(|_| backend.create_inventory_unit(&payload))).await;

    let mut created = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(unit) => created.push(unit),
            Err(error) => {
                warn!(position = index + 1, error = %error, "Unit creation failed");
                failures.push(UnitFailure {
                    position: index as u32 + 1,
                    error,
                });
            }
        }
    }
    (created, failures)
}

/// Archetype plus units, as submitted from the new-spool form.
#[derive(Clone)]
pub struct CreateSpoolWorkflow {
    backend: Arc<dyn InventoryBackend>,
    cache: QueryCache,
}

impl CreateSpoolWorkflow {
    pub fn new(backend: Arc<dyn InventoryBackend>, cache: QueryCache) -> Self {
        Self { backend, cache }
    }

    /// Runs the whole intake.
    ///
    /// Returns `Err` only when nothing was created: validation failed or the
    /// archetype creation itself was rejected. Once the archetype exists the
    /// result is always `Ok`, with unit failures counted in the outcome.
    #[instrument(skip_all, fields(barcode = ?request.spool.barcode, quantity = request.quantity))]
    pub async fn run(&self, request: &CreateSpoolRequest) -> Result<WorkflowOutcome, ServiceError> {
        request.validate()?;

        let spool = self.backend.create_spool(&request.spool).await.map_err(|err| {
            warn!(error = %err, "Archetype creation failed; no units created");
            err
        })?;
        info!(id = %spool.id, barcode = %spool.barcode, "Created spool archetype");

        let (created, failures) = if request.quantity > 0 {
            create_units(self.backend.as_ref(), &spool, request.quantity, &request.unit).await
        } else {
            (Vec::new(), Vec::new())
        };

        self.cache.apply(&InvalidationPlan::for_intake());

        let outcome = WorkflowOutcome {
            spool,
            requested: request.quantity,
            created,
            failures,
        };
        info!(
            kind = %outcome.kind(),
            created = outcome.created_count(),
            failed = outcome.failed_count(),
            "Spool intake finished"
        );
        Ok(outcome)
    }

    /// Submits the form and clears it once the archetype exists. On `Err`
    /// the form keeps its contents so the user can correct and resubmit.
    pub async fn submit(&self, form: &mut SpoolForm) -> Result<WorkflowOutcome, ServiceError> {
        let outcome = self.run(&form.to_request()).await?;
        form.reset();
        Ok(outcome)
    }
}

/// Adds units of an archetype that already exists.
#[derive(Clone)]
pub struct AddUnitsWorkflow {
    backend: Arc<dyn InventoryBackend>,
    cache: QueryCache,
}

impl AddUnitsWorkflow {
    pub fn new(backend: Arc<dyn InventoryBackend>, cache: QueryCache) -> Self {
        Self { backend, cache }
    }

    #[instrument(skip_all, fields(spool_id = %spool.id, quantity = quantity))]
    pub async fn run(
        &self,
        spool: &Spool,
        quantity: u32,
        unit: &UnitDefaults,
    ) -> Result<WorkflowOutcome, ServiceError> {
        if quantity == 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        unit.validate_against(spool.base_weight)?;

        let (created, failures) = create_units(self.backend.as_ref(), spool, quantity, unit).await;
        if !created.is_empty() {
            self.cache.apply(&InvalidationPlan::for_mutation(Mutation::create(
                Entity::InventoryUnit,
            )));
        }

        let outcome = WorkflowOutcome {
            spool: spool.clone(),
            requested: quantity,
            created,
            failures,
        };
        info!(
            kind = %outcome.kind(),
            created = outcome.created_count(),
            failed = outcome.failed_count(),
            "Added units to inventory"
        );
        Ok(outcome)
    }
}
