use chrono::NaiveDate;
use meteodash_weather::{dates, DailyWeatherParams, DateRange, HourlyWeatherParams};
use serde::{Deserialize, Serialize};

use crate::selection::{LocationSelection, ParameterSelection};

/// The persisted filter tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub date_range: DateRange,
    pub selected_location: LocationSelection,
    pub selected_parameters: ParameterSelection,
}

impl FilterState {
    /// Trailing `days`-day window ending `today`, default location and parameter.
    pub fn defaults(today: NaiveDate, days: i64) -> Self {
        Self {
            date_range: dates::default_range(today, days),
            selected_location: LocationSelection::default(),
            selected_parameters: ParameterSelection::default(),
        }
    }

    /// Request inputs for the overview charts, `None` when no single location is selected.
    pub fn daily_params(&self) -> Option<DailyWeatherParams> {
        let (lat, lon) = self.selected_location.coordinates()?;
        Some(DailyWeatherParams {
            lat,
            lon,
            start_date: self.date_range.start.clone(),
            end_date: self.date_range.end.clone(),
        })
    }

    pub fn hourly_params(&self) -> Option<HourlyWeatherParams> {
        let (lat, lon) = self.selected_location.coordinates()?;
        Some(HourlyWeatherParams {
            lat,
            lon,
            start_date: self.date_range.start.clone(),
            end_date: self.date_range.end.clone(),
            parameters: self.selected_parameters.ids().to_vec(),
        })
    }
}
