//! Pure mapping from lookup outcomes to display fields.

use serde::Serialize;

use crate::{
    error::ValidationError,
    model::{OutcomeStatus, Units, WeatherResult},
};

/// Marker for a value upstream did not report.
pub const NOT_AVAILABLE: &str = "N/A";

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

pub const MSG_NOT_FOUND: &str = "Location not found. Try a different city.";
pub const MSG_UNAUTHORIZED: &str =
    "Invalid API key (401). Check your API key and whether you are using a proxy.";
pub const MSG_NETWORK: &str = "Network or parsing error retrieving weather.";
pub const MSG_PERMISSION_DENIED: &str =
    "Location permission is denied. Enable it in your settings or enter a city or postal code.";
pub const MSG_LOCATION_UNAVAILABLE: &str =
    "Unable to determine location. Please enter a city or postal code.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

/// Fields of the result panel, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultPanel {
    pub location: String,
    pub summary: String,
    pub description: String,
    pub temperature: String,
    pub feels_like: String,
    pub humidity: String,
    pub pressure: String,
    pub wind: String,
    pub icon_url: Option<String>,
    pub observed_at: Option<String>,
}

/// Everything the presentation layer needs. `result` is `None` when the panel is hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayModel {
    pub result: Option<ResultPanel>,
    pub message: Option<Message>,
    pub prompt_manual_input: bool,
}

impl DisplayModel {
    fn error(text: impl Into<String>, prompt_manual_input: bool) -> Self {
        Self {
            result: None,
            message: Some(Message::error(text)),
            prompt_manual_input,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self.message,
            Some(Message {
                kind: MessageKind::Error,
                ..
            })
        )
    }
}

pub fn present(outcome: &OutcomeStatus) -> DisplayModel {
    match outcome {
        OutcomeStatus::Success(result) => DisplayModel {
            result: Some(panel(result)),
            message: None,
            prompt_manual_input: false,
        },
        other => DisplayModel::error(
            message_for(other).unwrap_or_default(),
            other.needs_manual_input(),
        ),
    }
}

/// Rejected manual input. Nothing was fetched.
pub fn present_validation_error(err: &ValidationError) -> DisplayModel {
    DisplayModel::error(err.to_string(), matches!(err, ValidationError::EmptyQuery))
}

/// User-facing text for a non-success outcome.
pub fn message_for(outcome: &OutcomeStatus) -> Option<String> {
    let text = match outcome {
        OutcomeStatus::Success(_) => return None,
        OutcomeStatus::NotFound => MSG_NOT_FOUND.to_string(),
        OutcomeStatus::Unauthorized => MSG_UNAUTHORIZED.to_string(),
        OutcomeStatus::UpstreamError { code, message } => {
            format!("Weather API error: {code} {message}")
        }
        OutcomeStatus::NetworkError(_) => MSG_NETWORK.to_string(),
        OutcomeStatus::PermissionDenied => MSG_PERMISSION_DENIED.to_string(),
        OutcomeStatus::LocationUnavailable => MSG_LOCATION_UNAVAILABLE.to_string(),
    };
    Some(text)
}

fn panel(result: &WeatherResult) -> ResultPanel {
    let temperature = format_temperature(result.temperature, result.units);
    let description = result.description.clone().unwrap_or_default();

    let condition = result.condition.as_deref().unwrap_or("Weather");
    let summary = if description.is_empty() {
        format!("{condition} — {temperature}")
    } else {
        format!("{condition} — {temperature} ({description})")
    };

    ResultPanel {
        location: format!("{} — {}", result.location, result.source),
        summary,
        description,
        feels_like: format_temperature(result.feels_like, result.units),
        temperature,
        humidity: with_suffix(result.humidity, "%"),
        pressure: with_suffix(result.pressure, " hPa"),
        wind: with_suffix(
            result.wind_speed,
            &format!(" {}", result.units.wind_speed_unit()),
        ),
        icon_url: result.icon.as_deref().map(icon_url),
        observed_at: result
            .observed_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string()),
    }
}

/// Whole degrees with the unit glyph, or `N/A`.
pub fn format_temperature(value: Option<f64>, units: Units) -> String {
    match value.filter(|v| v.is_finite()) {
        // `as i64` folds -0.0 into 0
        Some(v) => format!("{}{}", v.round() as i64, units.temperature_glyph()),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn with_suffix(value: Option<f64>, suffix: &str) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{v}{suffix}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn icon_url(code: &str) -> String {
    format!("{ICON_BASE_URL}/{code}@2x.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use chrono::DateTime;

    fn result() -> WeatherResult {
        WeatherResult {
            location: "London, GB".into(),
            condition: Some("Clouds".into()),
            description: Some("broken clouds".into()),
            temperature: Some(15.4),
            feels_like: Some(14.6),
            humidity: Some(81.0),
            pressure: Some(1012.0),
            wind_speed: Some(4.1),
            icon: Some("04d".into()),
            observed_at: DateTime::from_timestamp(1_700_000_000, 0),
            units: Units::Metric,
            source: Source::Device,
        }
    }

    #[test]
    fn success_populates_panel() {
        let model = present(&OutcomeStatus::Success(result()));
        let panel = model.result.expect("panel shown");

        assert!(model.message.is_none());
        assert!(!model.prompt_manual_input);
        assert_eq!(panel.location, "London, GB — device");
        assert_eq!(panel.summary, "Clouds — 15°C (broken clouds)");
        assert_eq!(panel.temperature, "15°C");
        assert_eq!(panel.feels_like, "15°C");
        assert_eq!(panel.humidity, "81%");
        assert_eq!(panel.pressure, "1012 hPa");
        assert_eq!(panel.wind, "4.1 m/s");
        assert_eq!(
            panel.icon_url.as_deref(),
            Some("https://openweathermap.org/img/wn/04d@2x.png")
        );
        assert_eq!(panel.observed_at.as_deref(), Some("2023-11-14 22:13 UTC"));
    }

    #[test]
    fn missing_numbers_render_not_available() {
        let mut r = result();
        r.humidity = None;
        r.pressure = None;
        r.wind_speed = None;
        r.feels_like = None;
        r.temperature = None;
        r.condition = None;
        r.description = None;
        r.icon = None;

        let panel = present(&OutcomeStatus::Success(r)).result.unwrap();

        assert_eq!(panel.humidity, "N/A");
        assert_eq!(panel.pressure, "N/A");
        assert_eq!(panel.wind, "N/A");
        assert_eq!(panel.feels_like, "N/A");
        assert_eq!(panel.temperature, "N/A");
        assert_eq!(panel.summary, "Weather — N/A");
        assert!(panel.icon_url.is_none());
    }

    #[test]
    fn imperial_uses_fahrenheit_and_mph() {
        let mut r = result();
        r.units = Units::Imperial;
        r.temperature = Some(59.7);
        r.source = Source::Manual;

        let panel = present(&OutcomeStatus::Success(r)).result.unwrap();
        assert_eq!(panel.temperature, "60°F");
        assert_eq!(panel.wind, "4.1 mph");
        assert_eq!(panel.location, "London, GB — manual");
    }

    #[test]
    fn temperature_rounding() {
        assert_eq!(format_temperature(Some(-0.4), Units::Metric), "0°C");
        assert_eq!(format_temperature(Some(-3.6), Units::Metric), "-4°C");
        assert_eq!(format_temperature(Some(2.5), Units::Metric), "3°C");
        assert_eq!(format_temperature(Some(f64::NAN), Units::Metric), "N/A");
    }

    #[test]
    fn errors_hide_panel_with_one_message() {
        let cases = [
            (OutcomeStatus::NotFound, MSG_NOT_FOUND.to_string(), false),
            (OutcomeStatus::Unauthorized, MSG_UNAUTHORIZED.to_string(), false),
            (
                OutcomeStatus::UpstreamError {
                    code: 500,
                    message: "Internal Server Error".into(),
                },
                "Weather API error: 500 Internal Server Error".to_string(),
                false,
            ),
            (
                OutcomeStatus::NetworkError("connection reset".into()),
                MSG_NETWORK.to_string(),
                false,
            ),
            (OutcomeStatus::PermissionDenied, MSG_PERMISSION_DENIED.to_string(), true),
            (
                OutcomeStatus::LocationUnavailable,
                MSG_LOCATION_UNAVAILABLE.to_string(),
                true,
            ),
        ];

        for (outcome, text, prompt) in cases {
            let model = present(&outcome);
            assert!(model.result.is_none(), "{outcome:?} must hide the panel");
            assert!(model.is_error());
            assert_eq!(model.message.unwrap().text, text);
            assert_eq!(model.prompt_manual_input, prompt);
        }
    }

    #[test]
    fn network_detail_is_not_shown() {
        let model = present(&OutcomeStatus::NetworkError("dns error: secret-host".into()));
        assert!(!model.message.unwrap().text.contains("secret-host"));
    }

    #[test]
    fn validation_error_message() {
        let model = present_validation_error(&ValidationError::EmptyQuery);
        assert_eq!(model.message.unwrap().text, "Please enter a city or postal code.");
        assert!(model.result.is_none());
        assert!(model.prompt_manual_input);
    }
}
