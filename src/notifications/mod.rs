//! Human-readable messages for workflow outcomes and errors.

use std::time::Duration;

use crate::errors::ServiceError;
use crate::workflow::{OutcomeKind, WorkflowOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
    Info,
}

impl NotificationLevel {
    /// How long a toast of this level stays on screen.
    pub fn default_duration(&self) -> Duration {
        match self {
            Self::Success => Duration::from_millis(3000),
            Self::Warning => Duration::from_millis(4000),
            Self::Error => Duration::from_millis(5000),
            Self::Info => Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub duration: Duration,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            duration: level.default_duration(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Message for a create-spool run.
    pub fn for_created(outcome: &WorkflowOutcome) -> Self {
        let requested = outcome.requested;
        let created = outcome.created_count();
        match outcome.kind() {
            OutcomeKind::ArchetypeOnly => Self::success("Spool created."),
            OutcomeKind::Complete => Self::success(format!(
                "Spool created and {created} item(s) added to inventory."
            )),
            OutcomeKind::Partial => Self::warning(format!(
                "Spool created, but only {created} of {requested} item(s) were added to inventory ({} failed).",
                outcome.failed_count()
            )),
            OutcomeKind::NoUnits => Self::error(format!(
                "Spool created, but none of the {requested} item(s) could be added to inventory."
            )),
        }
    }

    /// Message for adding units to an existing spool.
    pub fn for_added(outcome: &WorkflowOutcome) -> Self {
        let requested = outcome.requested;
        let created = outcome.created_count();
        match outcome.kind() {
            OutcomeKind::Complete | OutcomeKind::ArchetypeOnly => {
                Self::success(format!("Added {created} item(s) to inventory."))
            }
            OutcomeKind::Partial => Self::warning(format!(
                "Added only {created} of {requested} item(s) to inventory ({} failed).",
                outcome.failed_count()
            )),
            OutcomeKind::NoUnits => Self::error(format!(
                "None of the {requested} item(s) could be added to inventory."
            )),
        }
    }

    pub fn for_error(err: &ServiceError) -> Self {
        Self::error(err.user_message())
    }
}
