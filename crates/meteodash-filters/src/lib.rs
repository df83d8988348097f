//! Filter state for Meteodash
//!
//! Holds the selected location, date range and parameters, persists them
//! across restarts and notifies subscribers when they change.

pub mod error;
pub mod selection;
pub mod state;
pub mod storage;
pub mod store;

pub use error::FilterError;
pub use selection::{LocationSelection, ParameterSelection, ToggleOutcome};
pub use state::FilterState;
pub use storage::{FileStorage, MemoryStorage, StateStorage, StorageError};
pub use store::{FilterSettings, FilterStore, STORAGE_KEY};
