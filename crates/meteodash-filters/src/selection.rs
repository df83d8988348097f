//! Location and parameter selections.

use meteodash_weather::catalog::{self, MAX_SELECTED_PARAMETERS};
use meteodash_weather::Location;
use serde::{Deserialize, Serialize};

/// Either one catalog location or every location at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocationSelection {
    Single(Location),
    All,
}

impl LocationSelection {
    /// Coordinates to query, `None` for the "all" sentinel.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match self {
            Self::Single(location) => Some((location.lat, location.lon)),
            Self::All => None,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Single(location) => Some(location),
            Self::All => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Single(location) => &location.name,
            Self::All => "All locations",
        }
    }
}

impl Default for LocationSelection {
    fn default() -> Self {
        Self::Single(catalog::default_location())
    }
}

impl From<Location> for LocationSelection {
    fn from(location: Location) -> Self {
        Self::Single(location)
    }
}

/// Outcome of [`ParameterSelection::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Added at the end after evicting the oldest selection.
    Replaced { evicted: String },
    /// Refused: the last selected parameter cannot be removed.
    KeptLast,
}

impl ToggleOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::KeptLast)
    }
}

/// Ordered parameter ids, oldest first.
///
/// `toggle` keeps between one and [`MAX_SELECTED_PARAMETERS`] entries, evicting
/// the oldest when a new id would overflow. `replace` is taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSelection(Vec<String>);

impl ParameterSelection {
    pub fn new(ids: Vec<String>) -> Self {
        Self(ids)
    }

    pub fn single(id: impl Into<String>) -> Self {
        Self(vec![id.into()])
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|p| p == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn replace(&mut self, ids: Vec<String>) {
        self.0 = ids;
    }

    pub fn toggle(&mut self, id: &str) -> ToggleOutcome {
        if let Some(pos) = self.0.iter().position(|p| p == id) {
            if self.0.len() > 1 {
                self.0.remove(pos);
                return ToggleOutcome::Removed;
            }
            return ToggleOutcome::KeptLast;
        }

        if self.0.len() < MAX_SELECTED_PARAMETERS {
            self.0.push(id.to_string());
            return ToggleOutcome::Added;
        }

        let evicted = self.0.remove(0);
        self.0.push(id.to_string());
        ToggleOutcome::Replaced { evicted }
    }
}

impl Default for ParameterSelection {
    fn default() -> Self {
        Self::single(catalog::DEFAULT_PARAMETER)
    }
}
