//! The filter store: single source of truth for location, date range and
//! parameter selection.
//!
//! Every change is written to [`StateStorage`] under [`STORAGE_KEY`] and
//! broadcast on a `watch` channel. On open the store is rehydrated from that
//! key: persisted fields are laid over the defaults, and the defaults are used
//! as a whole when the payload is missing, unreadable or from another version.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use meteodash_core::FiltersConfig;
use meteodash_weather::{dates, DateRange};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::FilterError;
use crate::selection::{LocationSelection, ToggleOutcome};
use crate::state::FilterState;
use crate::storage::{StateStorage, StorageError};

pub const STORAGE_KEY: &str = "weather-filters";
pub const STATE_VERSION: u32 = 0;

/// On-disk envelope around the filter tuple.
#[derive(Serialize, Deserialize)]
struct Persisted<S> {
    state: S,
    #[serde(default)]
    version: u32,
}

/// Store limits taken from the `[filters]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    pub max_range_days: i64,
    pub default_range_days: i64,
    pub enforce_range: bool,
}

impl From<&FiltersConfig> for FilterSettings {
    fn from(config: &FiltersConfig) -> Self {
        Self {
            max_range_days: config.max_range_days,
            default_range_days: config.default_range_days,
            enforce_range: config.enforce_range,
        }
    }
}

pub struct FilterStore {
    storage: Arc<dyn StateStorage>,
    settings: FilterSettings,
    initial: FilterState,
    state: watch::Sender<FilterState>,
}

impl FilterStore {
    pub fn open(storage: Arc<dyn StateStorage>, config: &FiltersConfig) -> Self {
        Self::open_at(storage, config, Local::now().date_naive())
    }

    /// Open with an explicit "today" for the default date window.
    pub fn open_at(storage: Arc<dyn StateStorage>, config: &FiltersConfig, today: NaiveDate) -> Self {
        let settings = FilterSettings::from(config);
        let initial = FilterState::defaults(today, settings.default_range_days);

        let state = match rehydrate(storage.as_ref(), &initial) {
            Ok(Some(state)) => {
                tracing::info!("Rehydrated filters from {}", STORAGE_KEY);
                state
            }
            Ok(None) => {
                tracing::debug!("No persisted filters, using defaults");
                initial.clone()
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable persisted filters: {}", e);
                initial.clone()
            }
        };

        let (state, _) = watch::channel(state);
        Self {
            storage,
            settings,
            initial,
            state,
        }
    }

    pub fn state(&self) -> FilterState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.state.subscribe()
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Replace the date range as given.
    pub fn set_date_range(&self, range: DateRange) {
        self.update("setDateRange", |state| state.date_range = range);
    }

    /// Replace the date range if it is ordered and within the configured span.
    ///
    /// With `enforce_range` off this behaves like [`set_date_range`](Self::set_date_range).
    pub fn try_set_date_range(&self, range: DateRange) -> Result<(), FilterError> {
        let max_days = self.settings.max_range_days;
        if self.settings.enforce_range && !dates::validate_range(&range.start, &range.end, max_days) {
            return Err(FilterError::InvalidRange {
                start: range.start,
                end: range.end,
                max_days,
            });
        }
        self.set_date_range(range);
        Ok(())
    }

    pub fn set_selected_location(&self, selection: impl Into<LocationSelection>) {
        let selection = selection.into();
        self.update("setSelectedLocation", |state| {
            state.selected_location = selection
        });
    }

    /// Replace the parameter ids as given; callers keep to one or two ids.
    pub fn set_selected_parameters(&self, ids: Vec<String>) {
        self.update("setSelectedParameters", |state| {
            state.selected_parameters.replace(ids)
        });
    }

    pub fn toggle_parameter(&self, id: &str) -> ToggleOutcome {
        let mut outcome = ToggleOutcome::KeptLast;
        self.update("toggleParameter", |state| {
            outcome = state.selected_parameters.toggle(id)
        });
        outcome
    }

    /// Back to the state computed when the store was opened.
    pub fn reset_filters(&self) {
        let initial = self.initial.clone();
        self.update("resetFilters", |state| *state = initial);
    }

    /// Write the current state to storage.
    pub fn persist(&self) -> Result<(), FilterError> {
        let state = self.state.borrow().clone();
        let raw = serde_json::to_string(&Persisted {
            state: &state,
            version: STATE_VERSION,
        })
        .map_err(StorageError::from)?;
        self.storage.set_item(STORAGE_KEY, &raw)?;
        Ok(())
    }

    /// Forget persisted filters; the in-memory state is untouched.
    pub fn clear_persisted(&self) -> Result<(), FilterError> {
        self.storage.remove_item(STORAGE_KEY)?;
        Ok(())
    }

    fn update(&self, action: &str, mutate: impl FnOnce(&mut FilterState)) -> bool {
        let changed = self.state.send_if_modified(|state| {
            let before = state.clone();
            mutate(state);
            *state != before
        });

        if changed {
            tracing::debug!(action, "Filters changed");
            if let Err(e) = self.persist() {
                tracing::warn!("Failed to persist filters after {}: {}", action, e);
            }
        }
        changed
    }
}

/// Read the persisted filters, taking any field the payload lacks from `initial`.
fn rehydrate(
    storage: &dyn StateStorage,
    initial: &FilterState,
) -> Result<Option<FilterState>, StorageError> {
    let Some(raw) = storage.get_item(STORAGE_KEY)? else {
        return Ok(None);
    };
    let persisted: Persisted<Map<String, Value>> = serde_json::from_str(&raw)?;
    if persisted.version != STATE_VERSION {
        tracing::warn!(
            "Persisted filters have version {}, expected {}",
            persisted.version,
            STATE_VERSION
        );
        return Ok(None);
    }

    let mut merged = match serde_json::to_value(initial)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    for (field, value) in persisted.state {
        if !merged.contains_key(&field) {
            tracing::debug!("Ignoring unknown persisted filter field {}", field);
            continue;
        }
        merged.insert(field, value);
    }
    Ok(Some(serde_json::from_value(Value::Object(merged))?))
}
