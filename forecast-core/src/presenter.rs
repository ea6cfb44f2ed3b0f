//! Display state and the pure helpers that turn fetched data into text.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::model::{CurrentConditions, ForecastDay, TemperatureUnit, WeatherReport, convert};

const ICON_BASE_URL: &str = "https://www.weatherbit.io/static/img/icons";

/// Which forecast days make it onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForecastPolicy {
    /// First N entries exactly as the provider returned them.
    #[default]
    FirstN,
    /// Entries whose date (midnight UTC) is strictly after now, then the first N.
    FutureOnly,
}

/// Apply `policy` and cap the result at `num_of_days`, keeping provider order.
pub fn select_forecast(
    days: Vec<ForecastDay>,
    num_of_days: usize,
    policy: ForecastPolicy,
    now: DateTime<Utc>,
) -> Vec<ForecastDay> {
    match policy {
        ForecastPolicy::FirstN => days.into_iter().take(num_of_days).collect(),
        ForecastPolicy::FutureOnly => days
            .into_iter()
            .filter(|day| start_of_day_utc(day.valid_date) > now)
            .take(num_of_days)
            .collect(),
    }
}

fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// "Mon, Jan 8"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

/// Hour and minute in the host's timezone, e.g. "3:05 PM".
pub fn format_time<Tz>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ts.with_timezone(tz).format("%-I:%M %p").to_string()
}

pub fn format_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    format!("{:.1}{}", convert(celsius, unit), unit.symbol())
}

pub fn icon_url(icon_code: &str) -> String {
    format!("{ICON_BASE_URL}/{icon_code}.png")
}

/// What a loaded widget shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyView {
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastDay>,
}

impl ReadyView {
    pub fn from_report(
        report: WeatherReport,
        num_of_days: usize,
        policy: ForecastPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            current: report.current,
            forecast: select_forecast(report.forecast, num_of_days, policy, now),
        }
    }
}

/// Exactly one of these is active at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UiState {
    #[default]
    Init,
    Loading,
    Error(String),
    Ready(ReadyView),
}

impl UiState {
    pub fn is_loading(&self) -> bool {
        matches!(self, UiState::Init | UiState::Loading)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            UiState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn ready(&self) -> Option<&ReadyView> {
        match self {
            UiState::Ready(view) => Some(view),
            _ => None,
        }
    }
}

/// Text lines of the widget for `state`.
pub fn render<Tz>(state: &UiState, unit: TemperatureUnit, tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = vec!["Weather Forecast".to_string()];

    match state {
        UiState::Init | UiState::Loading => lines.push("Loading weather forecast...".to_string()),
        UiState::Error(message) => {
            lines.push(format!("Error fetching weather forecast: {message}"));
        }
        UiState::Ready(view) => {
            let current = &view.current;
            lines.push(format!("Current Location: {}", current.city_name));
            lines.push(format!(
                "Now: {}, {}, humidity {}%, precipitation {:.1}%",
                format_temperature(current.temperature_c, unit),
                current.description,
                current.humidity_pct,
                current.precipitation_pct,
            ));

            for day in &view.forecast {
                lines.push(String::new());
                lines.push(format!(
                    "{} {}",
                    format_date(day.valid_date),
                    format_time(day.timestamp, tz)
                ));
                lines.push(format!("  {} ({})", day.description, icon_url(&day.icon_code)));
                lines.push(format!(
                    "  Temperature: {}",
                    format_temperature(day.temperature_c, unit)
                ));
                lines.push(format!("  Humidity: {}%", day.humidity_pct));
                lines.push(format!("  Precipitation: {:.1}%", day.precipitation_pct));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32, temp: f64) -> ForecastDay {
        let valid_date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        ForecastDay {
            valid_date,
            timestamp: start_of_day_utc(valid_date),
            temperature_c: temp,
            humidity_pct: 50,
            precipitation_pct: 0.0,
            description: format!("day {d}"),
            icon_code: "c01d".into(),
        }
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn week() -> Vec<ForecastDay> {
        (8..=14).map(|d| day(2024, 1, d, d as f64)).collect()
    }

    #[test]
    fn first_n_truncates_without_filtering() {
        let picked = select_forecast(week(), 3, ForecastPolicy::FirstN, noon(2024, 1, 10));
        let dates: Vec<u32> = picked.iter().map(|d| chrono::Datelike::day(&d.valid_date)).collect();
        assert_eq!(dates, vec![8, 9, 10]);
    }

    #[test]
    fn future_only_drops_today_and_earlier() {
        let picked = select_forecast(week(), 3, ForecastPolicy::FutureOnly, noon(2024, 1, 10));
        let dates: Vec<u32> = picked.iter().map(|d| chrono::Datelike::day(&d.valid_date)).collect();
        assert_eq!(dates, vec![11, 12, 13]);
    }

    #[test]
    fn future_only_is_strict_at_midnight() {
        let midnight = start_of_day_utc(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap());
        let picked = select_forecast(week(), 1, ForecastPolicy::FutureOnly, midnight);
        assert_eq!(picked[0].valid_date, NaiveDate::from_ymd_opt(2024, 1, 12).unwrap());
    }

    #[test]
    fn length_is_min_of_limit_and_survivors() {
        let now = noon(2024, 1, 12);
        assert_eq!(select_forecast(week(), 4, ForecastPolicy::FutureOnly, now).len(), 2);
        assert_eq!(select_forecast(week(), 4, ForecastPolicy::FirstN, now).len(), 4);
        assert_eq!(select_forecast(week(), 10, ForecastPolicy::FirstN, now).len(), 7);
        assert!(select_forecast(Vec::new(), 3, ForecastPolicy::FirstN, now).is_empty());
    }

    #[test]
    fn format_date_is_short_weekday_month_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(format_date(date), "Mon, Jan 8");
        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        assert_eq!(format_date(date), "Wed, Dec 25");
    }

    #[test]
    fn format_time_is_twelve_hour_clock() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 8, 15, 5, 0).unwrap();
        assert_eq!(format_time(ts, &Utc), "3:05 PM");

        let ts = Utc.with_ymd_and_hms(2024, 1, 8, 0, 30, 0).unwrap();
        assert_eq!(format_time(ts, &Utc), "12:30 AM");

        let plus_two = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_time(ts, &plus_two), "2:30 AM");
    }

    #[test]
    fn icon_url_points_at_provider_assets() {
        assert_eq!(icon_url("r01d"), "https://www.weatherbit.io/static/img/icons/r01d.png");
    }

    #[test]
    fn temperature_is_converted_only_for_display() {
        assert_eq!(format_temperature(0.0, TemperatureUnit::Fahrenheit), "32.0°F");
        assert_eq!(format_temperature(21.34, TemperatureUnit::Celsius), "21.3°C");
    }

    #[test]
    fn render_loading_and_error() {
        let loading = render(&UiState::Loading, TemperatureUnit::Celsius, &Utc);
        assert_eq!(loading, vec!["Weather Forecast", "Loading weather forecast..."]);

        let error = render(
            &UiState::Error("Access to location was denied.".into()),
            TemperatureUnit::Celsius,
            &Utc,
        );
        assert_eq!(error[1], "Error fetching weather forecast: Access to location was denied.");
    }

    #[test]
    fn render_ready_lists_each_selected_day() {
        let view = ReadyView {
            current: CurrentConditions {
                city_name: "Utrecht".into(),
                temperature_c: 10.0,
                humidity_pct: 80,
                precipitation_pct: 0.5,
                description: "Light rain".into(),
            },
            forecast: week().into_iter().take(2).collect(),
        };

        let lines = render(&UiState::Ready(view), TemperatureUnit::Fahrenheit, &Utc);
        assert_eq!(lines[1], "Current Location: Utrecht");
        assert_eq!(lines[2], "Now: 50.0°F, Light rain, humidity 80%, precipitation 0.5%");
        assert!(lines.contains(&"Mon, Jan 8 12:00 AM".to_string()));
        assert!(lines.contains(&"Tue, Jan 9 12:00 AM".to_string()));
        assert_eq!(lines.iter().filter(|l| l.starts_with("  Temperature")).count(), 2);
    }
}
