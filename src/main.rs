//! Meteodash - historical weather dashboard in the terminal.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meteodash_core::{AppError, Config};
use meteodash_filters::{FileStorage, FilterState, FilterStore, LocationSelection, ToggleOutcome};
use meteodash_weather::query::QueryState;
use meteodash_weather::catalog::chart_config;
use meteodash_weather::{
    catalog, dates, series_stats, to_daily_series, to_hourly_series, ArchiveClient, DailyChartRow,
    DateRange, QueryStatus, WeatherQueries,
};

#[derive(Parser)]
#[command(name = "meteodash", version, about = "Historical weather dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Hourly rows to print in the details view
    #[arg(long, default_value_t = 24)]
    hours: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Show overview and details for the current filters
    Show,
    /// List selectable locations and parameters
    Catalog,
    /// Select a location by id, or `all`
    Location { id: String },
    /// Set the date range (YYYY-MM-DD)
    Range { start: String, end: String },
    /// Add or remove a chart parameter
    Toggle { id: String },
    /// Restore the default filters
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    meteodash_core::init()?;
    let cli = Cli::parse();

    let (config, _) = Config::load_validated()
        .map_err(AppError::from_config_load)
        .inspect_err(|e| eprintln!("{}", e.user_message()))?;

    let state_dir = config.state_dir()?;
    let storage = Arc::new(FileStorage::new(state_dir));
    let store = FilterStore::open(storage, &config.filters);

    match cli.command.unwrap_or(Command::Show) {
        Command::Show => {}
        Command::Catalog => {
            print_catalog();
            return Ok(());
        }
        Command::Location { id } => {
            let selection = if id == "all" {
                LocationSelection::All
            } else {
                catalog::find_location(&id)
                    .with_context(|| format!("Unknown location {:?}; see `meteodash catalog`", id))?
                    .clone()
                    .into()
            };
            store.set_selected_location(selection);
        }
        Command::Range { start, end } => {
            if let Err(e) = store.try_set_date_range(DateRange::new(start, end)) {
                eprintln!("{}", e.user_message());
                return Err(e.into());
            }
        }
        Command::Toggle { id } => {
            anyhow::ensure!(
                catalog::find_parameter(&id).is_some(),
                "Unknown parameter {:?}; see `meteodash catalog`",
                id
            );
            if store.toggle_parameter(&id) == ToggleOutcome::KeptLast {
                println!("At least one parameter must stay selected.");
            }
        }
        Command::Reset => store.reset_filters(),
    }

    let client = ArchiveClient::new(&config.api)?;
    let queries = WeatherQueries::new(client, &config.query);
    show_dashboard(&store.state(), &queries, cli.hours).await;

    let removed = queries.collect_garbage();
    tracing::debug!("Dashboard rendered, {} cache entries collected", removed);
    Ok(())
}

fn print_catalog() {
    println!("Locations:");
    for location in catalog::LOCATIONS {
        println!("  {:<10} {} ({}, {})", location.id, location.name, location.lat, location.lon);
    }
    println!("  {:<10} All locations", "all");
    println!("\nParameters:");
    for parameter in catalog::PARAMETERS {
        println!("  {:<14} {} ({}) {}", parameter.id, parameter.label, parameter.unit, parameter.color);
    }
}

/// One column of the daily overview.
struct DailySeries {
    label: &'static str,
    unit: &'static str,
    color: &'static str,
    value: fn(&DailyChartRow) -> Option<f64>,
}

fn daily_series() -> [DailySeries; 5] {
    [
        DailySeries {
            label: "Mean",
            unit: "°C",
            color: chart_config::TEMPERATURE_MEAN_COLOR,
            value: |r| r.temp_mean,
        },
        DailySeries {
            label: "Max",
            unit: "°C",
            color: chart_config::TEMPERATURE_MAX_COLOR,
            value: |r| r.temp_max,
        },
        DailySeries {
            label: "Min",
            unit: "°C",
            color: chart_config::TEMPERATURE_MIN_COLOR,
            value: |r| r.temp_min,
        },
        DailySeries {
            label: "Precip",
            unit: "mm",
            color: chart_config::PRECIPITATION_COLOR,
            value: |r| r.precipitation,
        },
        DailySeries {
            label: "Wind",
            unit: "km/h",
            color: chart_config::WINDSPEED_COLOR,
            value: |r| r.wind_speed,
        },
    ]
}

async fn show_dashboard(state: &FilterState, queries: &WeatherQueries<ArchiveClient>, hours: usize) {
    let colored = std::io::stdout().is_terminal();
    println!("{}", state.selected_location.display_name());
    println!("{}", dates::format_range_display(&state.date_range));
    println!();

    let (Some(daily_params), Some(hourly_params)) = (state.daily_params(), state.hourly_params())
    else {
        println!("Select a single location to see charts.");
        return;
    };

    let daily = queries.daily_observer();
    let hourly = queries.hourly_observer();
    let (daily_state, hourly_state) =
        tokio::join!(daily.observe(daily_params), hourly.observe(hourly_params));

    println!("== Overview ==");
    match ready(&daily_state) {
        Some(response) => {
            let series = daily_series();
            let rows = to_daily_series(response);

            let header: Vec<String> = series
                .iter()
                .map(|s| paint(&format!("{:>8}", s.label), s.color, colored))
                .collect();
            println!("{:<8}{}", "Date", header.concat());
            for row in &rows {
                let cells: Vec<String> = series
                    .iter()
                    .map(|s| format!("{:>8}", cell((s.value)(row))))
                    .collect();
                println!("{:<8}{}", dates::format_chart_date(&row.date), cells.concat());
            }
            println!();
            for s in &series {
                let label = paint(&format!("{:<8}", s.label), s.color, colored);
                println!("{}{}", label, range_line(&rows, s));
            }
        }
        None => report_failure(&daily_state),
    }
    println!();

    let ids = state.selected_parameters.ids();
    println!("== {} ==", catalog::chart_title(ids));
    println!("Parameters: {}", catalog::parameter_labels(ids));
    match ready(&hourly_state) {
        Some(response) => {
            for row in to_hourly_series(response, ids).iter().take(hours) {
                let values: Vec<String> = row
                    .values
                    .iter()
                    .map(|(id, value)| match catalog::find_parameter(id) {
                        Some(p) => paint(&format!("{} {}", cell(*value), p.unit), p.color, colored),
                        None => cell(*value),
                    })
                    .collect();
                println!("{:<20} {}", dates::format_tooltip_date(&row.time), values.join("  "));
            }
        }
        None => report_failure(&hourly_state),
    }
}

/// `min .. max unit` over the rows, or `no data` for an all-null series.
fn range_line(rows: &[DailyChartRow], series: &DailySeries) -> String {
    match series_stats(rows, series.value) {
        Some((lo, hi)) => format!("{:.1} .. {:.1} {}", lo, hi, series.unit),
        None => "no data".to_string(),
    }
}

/// Wrap `text` in a 24-bit foreground colour escape.
fn paint(text: &str, color: &str, enabled: bool) -> String {
    match catalog::hex_rgb(color) {
        Some((r, g, b)) if enabled => format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, text),
        _ => text.to_string(),
    }
}

fn ready<T>(state: &QueryState<T>) -> Option<&T> {
    match state.status {
        QueryStatus::Success => state.data.as_deref(),
        _ => None,
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

fn report_failure<T>(state: &QueryState<T>) {
    let Some(error) = &state.error else {
        println!("No data.");
        return;
    };
    let app_error = AppError::from(error.as_ref());
    tracing::error!("{}", error);
    let kind = error.kind();
    println!("{}: {}", kind.title(), app_error.user_message());
    if app_error.is_retryable() {
        println!("Run the command again to retry.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, temp_max: Option<f64>) -> DailyChartRow {
        DailyChartRow {
            date: date.into(),
            temp_mean: None,
            temp_max,
            temp_min: None,
            precipitation: None,
            wind_speed: None,
        }
    }

    #[test]
    fn test_range_line() {
        let rows = [
            row("2024-01-01", Some(8.0)),
            row("2024-01-02", None),
            row("2024-01-03", Some(-1.5)),
        ];
        let [_, max, _, _, wind] = daily_series();
        assert_eq!(range_line(&rows, &max), "-1.5 .. 8.0 °C");
        assert_eq!(range_line(&rows, &wind), "no data");
    }

    #[test]
    fn test_paint() {
        assert_eq!(
            paint("Max", chart_config::TEMPERATURE_MAX_COLOR, true),
            "\x1b[38;2;239;68;68mMax\x1b[0m"
        );
        assert_eq!(paint("Max", chart_config::TEMPERATURE_MAX_COLOR, false), "Max");
        assert_eq!(paint("Max", "red", true), "Max");
    }
}
