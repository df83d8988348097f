use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// A selectable city from the location catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Cow<'static, str>,
    pub name: Cow<'static, str>,
    pub lat: f64,
    pub lon: f64,
}

/// A chartable hourly quantity and the archive field that backs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub id: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub color: &'static str,
    pub api_key: &'static str,
}

/// Calendar date range as ISO `YYYY-MM-DD` strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// True when both ends parse, end is after start and the span fits `max_days`.
    pub fn is_valid(&self, max_days: i64) -> bool {
        crate::dates::validate_range(&self.start, &self.end, max_days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyWeatherParams {
    pub lat: f64,
    pub lon: f64,
    pub start_date: String,
    pub end_date: String,
}

impl DailyWeatherParams {
    /// All inputs needed to issue the request are present.
    pub fn is_complete(&self) -> bool {
        coordinates_present(self.lat, self.lon)
            && !self.start_date.is_empty()
            && !self.end_date.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyWeatherParams {
    pub lat: f64,
    pub lon: f64,
    pub start_date: String,
    pub end_date: String,
    pub parameters: Vec<String>,
}

impl HourlyWeatherParams {
    /// All inputs needed to issue the request are present, including one parameter.
    pub fn is_complete(&self) -> bool {
        coordinates_present(self.lat, self.lon)
            && !self.start_date.is_empty()
            && !self.end_date.is_empty()
            && !self.parameters.is_empty()
    }
}

fn coordinates_present(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite()
}

/// Daily aggregates as returned by the archive, one array per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyData {
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m_max: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeatherResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: String,
    pub daily: DailyData,
}

/// Hourly values keyed by archive field name, aligned with `time`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyData {
    pub time: Vec<String>,
    #[serde(flatten)]
    pub fields: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeatherResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: String,
    pub hourly: HourlyData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_params_completeness() {
        let mut params = DailyWeatherParams {
            lat: 40.7128,
            lon: -74.006,
            start_date: "2024-01-01".into(),
            end_date: "2024-01-20".into(),
        };
        assert!(params.is_complete());

        params.end_date.clear();
        assert!(!params.is_complete());

        params.end_date = "2024-01-20".into();
        params.lat = f64::NAN;
        assert!(!params.is_complete());
    }

    #[test]
    fn test_hourly_params_require_a_parameter() {
        let params = HourlyWeatherParams {
            lat: 51.5074,
            lon: -0.1278,
            start_date: "2024-01-01".into(),
            end_date: "2024-01-02".into(),
            parameters: vec![],
        };
        assert!(!params.is_complete());
    }

    #[test]
    fn test_hourly_response_collects_fields() {
        let body = serde_json::json!({
            "latitude": 40.71,
            "longitude": -74.0,
            "timezone": "America/New_York",
            "hourly_units": {"time": "iso8601", "temperature_2m": "°C"},
            "hourly": {
                "time": ["2024-01-01T00:00", "2024-01-01T01:00"],
                "temperature_2m": [1.5, null]
            }
        });
        let response: HourlyWeatherResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.hourly.time.len(), 2);
        assert_eq!(
            response.hourly.fields.get("temperature_2m"),
            Some(&vec![Some(1.5), None])
        );
    }

    #[test]
    fn test_daily_response_tolerates_missing_fields() {
        let body = serde_json::json!({
            "latitude": 40.71,
            "longitude": -74.0,
            "daily": {"time": ["2024-01-01"], "precipitation_sum": [0.2]}
        });
        let response: DailyWeatherResponse = serde_json::from_value(body).unwrap();
        assert!(response.daily.temperature_2m_mean.is_empty());
        assert_eq!(response.daily.precipitation_sum, vec![Some(0.2)]);
    }

    #[test]
    fn test_location_serde_round_trip() {
        let location = Location {
            id: Cow::Borrowed("tokyo"),
            name: Cow::Borrowed("Tokyo, Japan"),
            lat: 35.6762,
            lon: 139.6503,
        };
        let json = serde_json::to_string(&location).unwrap();
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(back, location);
    }
}
