//! Static catalogs of locations and parameters, plus chart and date constants.

use std::borrow::Cow;

use crate::types::{Location, Parameter};

const fn location(id: &'static str, name: &'static str, lat: f64, lon: f64) -> Location {
    Location {
        id: Cow::Borrowed(id),
        name: Cow::Borrowed(name),
        lat,
        lon,
    }
}

pub const LOCATIONS: &[Location] = &[
    location("nyc", "New York, USA", 40.7128, -74.006),
    location("london", "London, UK", 51.5074, -0.1278),
    location("tokyo", "Tokyo, Japan", 35.6762, 139.6503),
    location("sydney", "Sydney, Australia", -33.8688, 151.2093),
    location("mumbai", "Mumbai, India", 19.076, 72.8777),
    location("sao-paulo", "São Paulo, Brazil", -23.5505, -46.6333),
];

pub const PARAMETERS: &[Parameter] = &[
    Parameter {
        id: "temperature",
        label: "Temperature",
        unit: "°C",
        color: "#F59E0B",
        api_key: "temperature_2m",
    },
    Parameter {
        id: "humidity",
        label: "Relative Humidity",
        unit: "%",
        color: "#8B5CF6",
        api_key: "relative_humidity_2m",
    },
    Parameter {
        id: "apparent_temp",
        label: "Apparent Temperature",
        unit: "°C",
        color: "#F97316",
        api_key: "apparent_temperature",
    },
    Parameter {
        id: "precipitation",
        label: "Precipitation",
        unit: "mm",
        color: "#0891B2",
        api_key: "precipitation",
    },
    Parameter {
        id: "pressure",
        label: "Sea Level Pressure",
        unit: "hPa",
        color: "#10B981",
        api_key: "surface_pressure",
    },
    Parameter {
        id: "windspeed",
        label: "Wind Speed 10m",
        unit: "km/h",
        color: "#6B7280",
        api_key: "wind_speed_10m",
    },
];

/// Parameter selected on first start and after a reset.
pub const DEFAULT_PARAMETER: &str = "temperature";

/// At most this many parameters are charted together.
pub const MAX_SELECTED_PARAMETERS: usize = 2;

/// Daily aggregate fields, in request order.
pub const DAILY_FIELDS: [&str; 5] = [
    "temperature_2m_mean",
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "wind_speed_10m_max",
];

pub mod date_config {
    pub const DATE_FORMAT: &str = "%b %-d, %Y";
}

/// Series colours of the daily overview.
pub mod chart_config {
    pub const TEMPERATURE_MEAN_COLOR: &str = "#F59E0B";
    pub const TEMPERATURE_MAX_COLOR: &str = "#EF4444";
    pub const TEMPERATURE_MIN_COLOR: &str = "#3B82F6";
    pub const PRECIPITATION_COLOR: &str = "#0891B2";
    pub const WINDSPEED_COLOR: &str = "#6B7280";
}

/// The location selected on first start.
pub fn default_location() -> Location {
    LOCATIONS[0].clone()
}

pub fn find_location(id: &str) -> Option<&'static Location> {
    LOCATIONS.iter().find(|l| l.id == id)
}

pub fn find_parameter(id: &str) -> Option<&'static Parameter> {
    PARAMETERS.iter().find(|p| p.id == id)
}

/// Archive field name for a parameter id.
pub fn api_key_for(id: &str) -> Option<&'static str> {
    find_parameter(id).map(|p| p.api_key)
}

/// Labels of the known ids in selection order, joined with `", "`.
pub fn parameter_labels<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .filter_map(|id| find_parameter(id.as_ref()))
        .map(|p| p.label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Title for a multi-parameter chart, e.g. `Temperature & Relative Humidity`.
pub fn chart_title<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .filter_map(|id| find_parameter(id.as_ref()))
        .map(|p| p.label)
        .collect::<Vec<_>>()
        .join(" & ")
}

/// RGB components of a `#RRGGBB` colour constant.
pub fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
