use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use super::clock::Clock;
use super::debounce::Debouncer;
use crate::errors::ServiceError;
use crate::models::Spool;
use crate::services::SpoolService;

/// What the lookup currently shows for the settled barcode.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupStatus {
    Idle,
    Searching,
    Found(Vec<Spool>),
    NotFound,
    Failed(String),
}

impl LookupStatus {
    fn from_result(result: Result<Vec<Spool>, ServiceError>) -> Self {
        match result {
            Ok(spools) if spools.is_empty() => Self::NotFound,
            Ok(spools) => Self::Found(spools),
            Err(err) => Self::Failed(err.user_message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupState {
    pub status: LookupStatus,
    /// Trimmed barcode that last settled, `None` when the field is blank.
    pub debounced_value: Option<String>,
}

impl Default for LookupState {
    fn default() -> Self {
        Self {
            status: LookupStatus::Idle,
            debounced_value: None,
        }
    }
}

impl LookupState {
    /// The archetype when exactly one matches. Callers lock the create form
    /// in that case since the spool already exists.
    pub fn unique_match(&self) -> Option<&Spool> {
        match &self.status {
            LookupStatus::Found(spools) if spools.len() == 1 => spools.first(),
            _ => None,
        }
    }

    pub fn is_unique_match(&self) -> bool {
        self.unique_match().is_some()
    }

    pub fn is_searching(&self) -> bool {
        self.status == LookupStatus::Searching
    }
}

/// Barcode-as-you-type lookup.
///
/// Results are matched to the barcode they were fetched for and only the
/// entry for the current settled value is kept, so a slow response for an
/// older value can never replace the state of a newer one.
pub struct LookupController<C: Clock> {
    debouncer: Debouncer<String, C>,
    spools: SpoolService,
    results: HashMap<String, LookupStatus>,
    current: Option<String>,
}

impl<C: Clock> LookupController<C> {
    pub fn new(spools: SpoolService, clock: C, delay: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(clock, delay),
            spools,
            results: HashMap::new(),
            current: None,
        }
    }

    pub fn spools(&self) -> &SpoolService {
        &self.spools
    }

    /// Records a keystroke. Nothing is searched until the input settles.
    pub fn on_input(&mut self, text: &str) {
        self.debouncer.input(text.to_string());
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Settles pending input whose quiet period has elapsed. Returns the
    /// barcode to search for, or `None` when nothing settled or the settled
    /// value is blank.
    pub fn poll(&mut self) -> Option<String> {
        let settled = self.debouncer.poll()?;
        let barcode = settled.trim();
        if barcode.is_empty() {
            debug!("Lookup input cleared");
            self.current = None;
            return None;
        }

        let barcode = barcode.to_string();
        debug!(barcode = %barcode, "Lookup input settled");
        self.current = Some(barcode.clone());
        // Every settle issues a fresh search, so an earlier outcome for the
        // same barcode is no longer current.
        self.results.retain(|key, _| *key == barcode);
        self.results.insert(barcode.clone(), LookupStatus::Searching);
        Some(barcode)
    }

    /// Runs the cached barcode search without touching controller state.
    pub async fn search(&self, barcode: &str) -> Result<Vec<Spool>, ServiceError> {
        self.spools.search_by_barcode(barcode).await
    }

    /// Records a result for `barcode`. Results for anything but the current
    /// settled value are dropped, since a later settle searches again.
    pub fn complete(&mut self, barcode: String, result: Result<Vec<Spool>, ServiceError>) {
        if self.current.as_deref() != Some(barcode.as_str()) {
            debug!(barcode = %barcode, "Result arrived for a superseded barcode");
            return;
        }
        self.results
            .insert(barcode, LookupStatus::from_result(result));
    }

    /// Settles, searches and records in one step.
    #[instrument(skip(self))]
    pub async fn tick(&mut self) -> Option<LookupState> {
        let barcode = self.poll()?;
        let result = self.search(&barcode).await;
        self.complete(barcode, result);
        Some(self.state())
    }

    pub fn state(&self) -> LookupState {
        match &self.current {
            None => LookupState::default(),
            Some(value) => LookupState {
                status: self
                    .results
                    .get(value)
                    .cloned()
                    .unwrap_or(LookupStatus::Searching),
                debounced_value: Some(value.clone()),
            },
        }
    }

    /// Forgets the input and all remembered results, e.g. after a
    /// successful create.
    pub fn reset(&mut self) {
        self.debouncer.reset();
        self.results.clear();
        self.current = None;
    }
}
