use crate::errors::ServiceError;
use crate::models::{InventoryUnit, Spool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeKind {
    /// Quantity was zero; only the archetype was created.
    ArchetypeOnly,
    Complete,
    /// Some unit creations failed.
    Partial,
    /// Every unit creation failed. The archetype still exists.
    NoUnits,
}

/// One unit creation that did not go through.
#[derive(Debug)]
pub struct UnitFailure {
    /// 1-based position in the batch.
    pub position: u32,
    pub error: ServiceError,
}

/// Result of an intake run once the archetype exists.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub spool: Spool,
    pub requested: u32,
    pub created: Vec<InventoryUnit>,
    pub failures: Vec<UnitFailure>,
}

impl WorkflowOutcome {
    pub fn kind(&self) -> OutcomeKind {
        if self.requested == 0 {
            OutcomeKind::ArchetypeOnly
        } else if self.failures.is_empty() {
            OutcomeKind::Complete
        } else if self.created.is_empty() {
            OutcomeKind::NoUnits
        } else {
            OutcomeKind::Partial
        }
    }

    pub fn created_count(&self) -> u32 {
        self.created.len() as u32
    }

    pub fn failed_count(&self) -> u32 {
        self.failures.len() as u32
    }

    pub fn first_error(&self) -> Option<&ServiceError> {
        self.failures.first().map(|failure| &failure.error)
    }
}
