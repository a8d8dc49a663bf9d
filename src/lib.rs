//! Filament Inventory client core
//!
//! Talks to the filament-spool inventory backend: cached catalog and
//! inventory queries, debounced barcode lookup, and the spool intake
//! workflow that creates an archetype plus its physical units.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod insights;
pub mod lookup;
pub mod models;
pub mod notifications;
pub mod services;
pub mod telemetry;
pub mod workflow;

use std::sync::Arc;

use crate::auth::{FileSessionStore, MemorySessionStore, SessionStore};
use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::errors::ServiceError;
use crate::gateway::{InventoryBackend, LookupBackend, RestGateway};
use crate::insights::InsightGenerator;
use crate::lookup::{LookupController, LookupHandle, SystemClock};
use crate::models::{Brand, Color, Material};
use crate::services::Services;
use crate::workflow::{AddUnitsWorkflow, CreateSpoolWorkflow};

pub mod prelude {
    pub use crate::cache::{Collection, QueryCache, QueryKey};
    pub use crate::config::ClientConfig;
    pub use crate::errors::ServiceError;
    pub use crate::lookup::{LookupState, LookupStatus};
    pub use crate::models::*;
    pub use crate::notifications::{Notification, NotificationLevel};
    pub use crate::workflow::{
        CreateSpoolRequest, OutcomeKind, SpoolForm, UnitDefaults, WorkflowOutcome,
    };
    pub use crate::InventoryClient;
}

/// Everything a presentation layer needs, wired to one backend and one
/// shared cache.
#[derive(Clone)]
pub struct InventoryClient {
    config: ClientConfig,
    backend: Arc<dyn InventoryBackend>,
    services: Services,
}

impl InventoryClient {
    /// Builds a REST-backed client. The session is read from
    /// `config.session_file` when set, otherwise kept in memory.
    pub fn connect(config: ClientConfig) -> Result<Self, ServiceError> {
        let session: Arc<dyn SessionStore> = match &config.session_file {
            Some(path) => Arc::new(
                FileSessionStore::open(path)
                    .map_err(|e| ServiceError::ConfigError(e.to_string()))?,
            ),
            None => Arc::new(MemorySessionStore::new()),
        };
        Self::with_session(config, session)
    }

    pub fn with_session(
        config: ClientConfig,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, ServiceError> {
        let gateway = Arc::new(RestGateway::new(&config, session)?);
        Ok(Self::with_backend(config, gateway))
    }

    /// Wires the client to any backend, e.g. an in-memory fake.
    pub fn with_backend<G>(config: ClientConfig, backend: Arc<G>) -> Self
    where
        G: InventoryBackend
            + LookupBackend<Brand>
            + LookupBackend<Color>
            + LookupBackend<Material>
            + 'static,
    {
        let services = Services::new(backend.clone(), QueryCache::new());
        Self {
            config,
            backend,
            services,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn cache(&self) -> &QueryCache {
        self.services.cache()
    }

    pub fn create_workflow(&self) -> CreateSpoolWorkflow {
        CreateSpoolWorkflow::new(self.backend.clone(), self.cache().clone())
    }

    pub fn add_units_workflow(&self) -> AddUnitsWorkflow {
        AddUnitsWorkflow::new(self.backend.clone(), self.cache().clone())
    }

    pub fn insight_generator(&self) -> InsightGenerator {
        InsightGenerator::new(self.services.dashboard.clone())
    }

    /// Synchronous lookup controller driven by the caller's own loop.
    pub fn lookup_controller(&self) -> LookupController<SystemClock> {
        LookupController::new(
            self.services.spools.clone(),
            SystemClock,
            self.config.debounce(),
        )
    }

    /// Lookup running on a background task. Needs a tokio runtime.
    pub fn spawn_lookup(&self) -> LookupHandle {
        LookupHandle::spawn(self.services.spools.clone(), self.config.debounce())
    }
}
