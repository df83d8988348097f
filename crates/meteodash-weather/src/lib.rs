//! Weather data for Meteodash
//!
//! Fetches historical daily and hourly observations from an Open-Meteo
//! compatible archive, caches them per request, and reshapes them into
//! chart rows.

pub mod catalog;
pub mod client;
pub mod dates;
pub mod error;
pub mod query;
pub mod retry;
pub mod transform;
pub mod types;

pub use client::{ArchiveClient, WeatherSource};
pub use error::WeatherError;
pub use query::{QueryCache, QueryKey, QueryObserver, QueryState, QueryStatus, WeatherQueries};
pub use retry::RetryPolicy;
pub use transform::{series_stats, to_daily_series, to_hourly_series, DailyChartRow, HourlyChartRow};
pub use types::*;
