//! Historical weather archive client (Open-Meteo compatible).

use std::future::Future;
use std::time::Duration;

use meteodash_core::ApiConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::{self, DAILY_FIELDS};
use crate::error::WeatherError;
use crate::types::{
    DailyWeatherParams, DailyWeatherResponse, HourlyWeatherParams, HourlyWeatherResponse,
};

const ARCHIVE_PATH: &str = "/archive";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Source of raw archive responses.
///
/// The query layer is generic over this so it can run against a fake.
pub trait WeatherSource: Send + Sync + 'static {
    fn fetch_daily(
        &self,
        params: &DailyWeatherParams,
    ) -> impl Future<Output = Result<DailyWeatherResponse, WeatherError>> + Send;

    fn fetch_hourly(
        &self,
        params: &HourlyWeatherParams,
    ) -> impl Future<Output = Result<HourlyWeatherResponse, WeatherError>> + Send;
}

/// Error body returned by the archive on 400.
#[derive(Debug, Deserialize)]
struct ArchiveErrorBody {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: Client,
    base_url: String,
    timezone: String,
}

impl ArchiveClient {
    pub fn new(config: &ApiConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timezone: config.timezone.clone(),
        })
    }

    /// Client against an arbitrary base URL with default settings.
    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        Self::new(&ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        })
    }

    fn archive_url(&self) -> String {
        format!("{}{}", self.base_url, ARCHIVE_PATH)
    }

    /// Fetch the five daily aggregates over the date span.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_daily(
        &self,
        params: &DailyWeatherParams,
    ) -> Result<DailyWeatherResponse, WeatherError> {
        let fields = ("daily", DAILY_FIELDS.join(","));
        let query = self.base_query(
            params.lat,
            params.lon,
            &params.start_date,
            &params.end_date,
            fields,
        );

        let response = self.client.get(self.archive_url()).query(&query).send().await?;
        self.handle_response(response).await
    }

    /// Fetch hourly values for the requested parameter ids.
    ///
    /// Ids missing from the parameter catalog are dropped from the request.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_hourly(
        &self,
        params: &HourlyWeatherParams,
    ) -> Result<HourlyWeatherResponse, WeatherError> {
        let fields = ("hourly", hourly_fields(&params.parameters).join(","));
        let query = self.base_query(
            params.lat,
            params.lon,
            &params.start_date,
            &params.end_date,
            fields,
        );

        let response = self.client.get(self.archive_url()).query(&query).send().await?;
        self.handle_response(response).await
    }

    fn base_query(
        &self,
        lat: f64,
        lon: f64,
        start_date: &str,
        end_date: &str,
        fields: (&'static str, String),
    ) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("start_date", start_date.to_string()),
            ("end_date", end_date.to_string()),
            fields,
            ("timezone", self.timezone.clone()),
        ]
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| WeatherError::Parse(e.to_string()));
        }

        match status {
            StatusCode::BAD_REQUEST => {
                let text = response.text().await.unwrap_or_default();
                let reason = serde_json::from_str::<ArchiveErrorBody>(&text)
                    .ok()
                    .and_then(|b| b.reason)
                    .unwrap_or(text);
                Err(WeatherError::BadRequest(reason))
            }
            StatusCode::NOT_FOUND => {
                let text = response.text().await.unwrap_or_default();
                Err(WeatherError::NotFound(text))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                Err(WeatherError::RateLimited(retry_after))
            }
            s if s.is_server_error() => {
                let text = response.text().await.unwrap_or_default();
                Err(WeatherError::Server {
                    status: s.as_u16(),
                    message: text,
                })
            }
            s => {
                let text = response.text().await.unwrap_or_default();
                Err(WeatherError::Api(format!("{}: {}", s, text)))
            }
        }
    }
}

/// Archive field names for the known parameter ids, in selection order.
pub fn hourly_fields<S: AsRef<str>>(parameter_ids: &[S]) -> Vec<&'static str> {
    parameter_ids
        .iter()
        .filter_map(|id| {
            let key = catalog::api_key_for(id.as_ref());
            if key.is_none() {
                tracing::debug!("Dropping unknown parameter id {:?}", id.as_ref());
            }
            key
        })
        .collect()
}

impl WeatherSource for ArchiveClient {
    fn fetch_daily(
        &self,
        params: &DailyWeatherParams,
    ) -> impl Future<Output = Result<DailyWeatherResponse, WeatherError>> + Send {
        ArchiveClient::fetch_daily(self, params)
    }

    fn fetch_hourly(
        &self,
        params: &HourlyWeatherParams,
    ) -> impl Future<Output = Result<HourlyWeatherResponse, WeatherError>> + Send {
        ArchiveClient::fetch_hourly(self, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn daily_params() -> DailyWeatherParams {
        DailyWeatherParams {
            lat: 51.5074,
            lon: -0.1278,
            start_date: "2024-03-01".into(),
            end_date: "2024-03-02".into(),
        }
    }

    #[test]
    fn test_hourly_fields_drop_unknown_ids() {
        assert_eq!(
            hourly_fields(&["humidity", "nonsense", "windspeed"]),
            vec!["relative_humidity_2m", "wind_speed_10m"]
        );
    }

    #[tokio::test]
    async fn test_fetch_daily() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/archive"))
            .and(query_param("latitude", "51.5074"))
            .and(query_param("longitude", "-0.1278"))
            .and(query_param("start_date", "2024-03-01"))
            .and(query_param("end_date", "2024-03-02"))
            .and(query_param(
                "daily",
                "temperature_2m_mean,temperature_2m_max,temperature_2m_min,precipitation_sum,wind_speed_10m_max",
            ))
            .and(query_param("timezone", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 51.5,
                "longitude": -0.12,
                "timezone": "Europe/London",
                "daily": {
                    "time": ["2024-03-01", "2024-03-02"],
                    "temperature_2m_mean": [7.1, 8.0],
                    "temperature_2m_max": [10.2, 11.0],
                    "temperature_2m_min": [3.4, 5.5],
                    "precipitation_sum": [0.0, 4.2],
                    "wind_speed_10m_max": [18.0, 22.3]
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ArchiveClient::with_base_url(&mock_server.uri()).unwrap();
        let response = client.fetch_daily(&daily_params()).await.unwrap();

        assert_eq!(response.timezone, "Europe/London");
        assert_eq!(response.daily.time.len(), 2);
        assert_eq!(response.daily.precipitation_sum[1], Some(4.2));
    }

    #[tokio::test]
    async fn test_fetch_hourly_maps_parameter_ids() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/archive"))
            .and(query_param("hourly", "temperature_2m,surface_pressure"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 35.7,
                "longitude": 139.6,
                "timezone": "Asia/Tokyo",
                "hourly": {
                    "time": ["2024-03-01T00:00", "2024-03-01T01:00"],
                    "temperature_2m": [4.0, 3.8],
                    "surface_pressure": [1012.1, 1011.9]
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ArchiveClient::with_base_url(&mock_server.uri()).unwrap();
        let params = HourlyWeatherParams {
            lat: 35.6762,
            lon: 139.6503,
            start_date: "2024-03-01".into(),
            end_date: "2024-03-02".into(),
            parameters: vec!["temperature".into(), "unknown".into(), "pressure".into()],
        };
        let response = client.fetch_hourly(&params).await.unwrap();

        assert_eq!(response.hourly.fields.len(), 2);
        assert!(response.hourly.fields.contains_key("surface_pressure"));
    }

    #[tokio::test]
    async fn test_bad_request_reason() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/archive"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": true,
                "reason": "Parameter 'start_date' is out of allowed range"
            })))
            .mount(&mock_server)
            .await;

        let client = ArchiveClient::with_base_url(&mock_server.uri()).unwrap();
        let result = client.fetch_daily(&daily_params()).await;

        match result {
            Err(WeatherError::BadRequest(reason)) => assert!(reason.contains("start_date")),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/archive"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = ArchiveClient::with_base_url(&mock_server.uri()).unwrap();
        let result = client.fetch_daily(&daily_params()).await;

        assert!(matches!(result, Err(WeatherError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/archive"))
            .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "30"))
            .mount(&mock_server)
            .await;

        let client = ArchiveClient::with_base_url(&mock_server.uri()).unwrap();
        let result = client.fetch_daily(&daily_params()).await;

        assert!(matches!(result, Err(WeatherError::RateLimited(30))));
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/archive"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&mock_server)
            .await;

        let client = ArchiveClient::with_base_url(&mock_server.uri()).unwrap();
        let result = client.fetch_daily(&daily_params()).await;

        match result {
            Err(WeatherError::Server { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected Server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/archive"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = ArchiveClient::with_base_url(&mock_server.uri()).unwrap();
        let result = client.fetch_daily(&daily_params()).await;

        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_offline() {
        // Nothing listens on port 9 locally
        let client = ArchiveClient::with_base_url("http://127.0.0.1:9").unwrap();
        let err = client.fetch_daily(&daily_params()).await.unwrap_err();

        assert_eq!(err.kind(), meteodash_core::FailureKind::Offline);
        assert!(err.is_retryable());
    }
}
