//! Debounced barcode lookup.

pub mod clock;
pub mod controller;
pub mod debounce;
pub mod handle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{LookupController, LookupState, LookupStatus};
pub use debounce::{DebounceState, Debouncer, DEFAULT_DEBOUNCE};
pub use handle::{LookupHandle, TokioClock};
