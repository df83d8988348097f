//! Reshape archive responses into one row per time step for charting.

use serde::Serialize;

use crate::catalog;
use crate::types::{DailyWeatherResponse, HourlyWeatherResponse};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyChartRow {
    pub date: String,
    pub temp_mean: Option<f64>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind_speed: Option<f64>,
}

/// One hourly time step with a value per selected parameter id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyChartRow {
    pub time: String,
    pub values: Vec<(String, Option<f64>)>,
}

impl HourlyChartRow {
    pub fn value(&self, id: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(key, _)| key == id)
            .and_then(|(_, v)| *v)
    }
}

fn at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten()
}

/// One row per entry of `daily.time`, in source order.
pub fn to_daily_series(response: &DailyWeatherResponse) -> Vec<DailyChartRow> {
    let daily = &response.daily;
    daily
        .time
        .iter()
        .enumerate()
        .map(|(i, date)| DailyChartRow {
            date: date.clone(),
            temp_mean: at(&daily.temperature_2m_mean, i),
            temp_max: at(&daily.temperature_2m_max, i),
            temp_min: at(&daily.temperature_2m_min, i),
            precipitation: at(&daily.precipitation_sum, i),
            wind_speed: at(&daily.wind_speed_10m_max, i),
        })
        .collect()
}

/// One row per entry of `hourly.time`, with values keyed by parameter id.
///
/// Ids missing from the catalog are skipped; catalog ids whose field is absent
/// from the response yield `None`.
pub fn to_hourly_series<S: AsRef<str>>(
    response: &HourlyWeatherResponse,
    parameter_ids: &[S],
) -> Vec<HourlyChartRow> {
    let columns: Vec<(&str, Option<&Vec<Option<f64>>>)> = parameter_ids
        .iter()
        .filter_map(|id| {
            let id = id.as_ref();
            match catalog::api_key_for(id) {
                Some(field) => Some((id, response.hourly.fields.get(field))),
                None => {
                    tracing::debug!("Skipping unknown parameter {:?}", id);
                    None
                }
            }
        })
        .collect();

    response
        .hourly
        .time
        .iter()
        .enumerate()
        .map(|(i, time)| HourlyChartRow {
            time: time.clone(),
            values: columns
                .iter()
                .map(|(id, series)| (id.to_string(), series.and_then(|s| at(s, i))))
                .collect(),
        })
        .collect()
}

/// Min and max of the present values, `None` when every value is missing.
pub fn series_stats<R, F>(rows: &[R], field: F) -> Option<(f64, f64)>
where
    F: Fn(&R) -> Option<f64>,
{
    rows.iter()
        .filter_map(field)
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DailyData, HourlyData};
    use std::collections::HashMap;

    fn daily() -> DailyWeatherResponse {
        DailyWeatherResponse {
            latitude: 51.5,
            longitude: -0.12,
            timezone: "Europe/London".into(),
            daily: DailyData {
                time: vec!["2024-01-01".into(), "2024-01-02".into(), "2024-01-03".into()],
                temperature_2m_mean: vec![Some(5.1), None, Some(6.4)],
                temperature_2m_max: vec![Some(8.0), Some(7.2), Some(9.9)],
                temperature_2m_min: vec![Some(2.3), Some(1.1)],
                precipitation_sum: vec![Some(0.0), Some(3.4), Some(1.2)],
                wind_speed_10m_max: vec![],
            },
        }
    }

    #[test]
    fn test_daily_rows_follow_time_axis() {
        let rows = to_daily_series(&daily());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, "2024-01-01");
        assert_eq!(rows[2].date, "2024-01-03");
        assert_eq!(rows[0].temp_mean, Some(5.1));
        assert_eq!(rows[1].precipitation, Some(3.4));
    }

    #[test]
    fn test_daily_nulls_and_short_arrays_become_none() {
        let rows = to_daily_series(&daily());
        assert_eq!(rows[1].temp_mean, None);
        assert_eq!(rows[2].temp_min, None);
        assert!(rows.iter().all(|r| r.wind_speed.is_none()));
    }

    #[test]
    fn test_daily_fields_copied_by_index() {
        let mut response = daily();
        response.daily.temperature_2m_min = vec![Some(2.3), Some(1.1), Some(3.0)];
        response.daily.wind_speed_10m_max = vec![Some(12.0), Some(20.5), Some(8.4)];

        let rows = to_daily_series(&response);
        let expected = [
            ("2024-01-01", Some(5.1), Some(8.0), Some(2.3), Some(0.0), Some(12.0)),
            ("2024-01-02", None, Some(7.2), Some(1.1), Some(3.4), Some(20.5)),
            ("2024-01-03", Some(6.4), Some(9.9), Some(3.0), Some(1.2), Some(8.4)),
        ];
        assert_eq!(rows.len(), expected.len());
        for (row, (date, mean, max, min, precip, wind)) in rows.iter().zip(expected) {
            assert_eq!(row.date, date);
            assert_eq!(row.temp_mean, mean, "{}", date);
            assert_eq!(row.temp_max, max, "{}", date);
            assert_eq!(row.temp_min, min, "{}", date);
            assert_eq!(row.precipitation, precip, "{}", date);
            assert_eq!(row.wind_speed, wind, "{}", date);
        }
    }

    #[test]
    fn test_empty_daily_response() {
        let mut response = daily();
        response.daily = DailyData::default();
        assert!(to_daily_series(&response).is_empty());
    }

    fn hourly() -> HourlyWeatherResponse {
        let mut fields = HashMap::new();
        fields.insert("temperature_2m".to_string(), vec![Some(1.0), Some(1.5)]);
        fields.insert("relative_humidity_2m".to_string(), vec![Some(80.0), None]);
        HourlyWeatherResponse {
            latitude: 40.71,
            longitude: -74.0,
            timezone: "America/New_York".into(),
            hourly: HourlyData {
                time: vec!["2024-01-01T00:00".into(), "2024-01-01T01:00".into()],
                fields,
            },
        }
    }

    #[test]
    fn test_hourly_rows_keyed_by_parameter_id() {
        let rows = to_hourly_series(&hourly(), &["temperature", "humidity"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, "2024-01-01T00:00");
        assert_eq!(rows[0].value("temperature"), Some(1.0));
        assert_eq!(rows[0].value("humidity"), Some(80.0));
        assert_eq!(rows[1].value("humidity"), None);
        // Selection order is kept
        assert_eq!(rows[0].values[0].0, "temperature");
        assert_eq!(rows[0].values[1].0, "humidity");
    }

    #[test]
    fn test_hourly_unknown_and_missing_parameters() {
        let rows = to_hourly_series(&hourly(), &["bogus", "precipitation"]);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.values, [("precipitation".to_string(), None)]);
            assert_eq!(row.value("bogus"), None);
        }
    }

    #[test]
    fn test_series_stats() {
        let rows = to_daily_series(&daily());
        assert_eq!(series_stats(&rows, |r| r.temp_max), Some((7.2, 9.9)));
        assert_eq!(series_stats(&rows, |r| r.temp_mean), Some((5.1, 6.4)));
        assert_eq!(series_stats(&rows, |r| r.wind_speed), None);
    }
}
