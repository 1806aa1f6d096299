//! Human-friendly rendering of lookup reports.

use wxlookup_core::{DisplayModel, Report, presenter::ResultPanel};

pub fn print_report(report: &Report, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.display)?);
        return Ok(());
    }

    if let Some(failure) = report.location_failure {
        eprintln!("{}", failure.hint());
    }
    if let Some(message) = &report.display.message {
        eprintln!("{}", message.text);
    }
    if let Some(text) = render(&report.display) {
        print!("{text}");
    }
    Ok(())
}

/// Result panel as text, or `None` when the panel is hidden.
pub fn render(display: &DisplayModel) -> Option<String> {
    display.result.as_ref().map(render_panel)
}

fn render_panel(panel: &ResultPanel) -> String {
    let mut out = format!("{}\n{}\n", panel.location, panel.summary);
    let rows = [
        ("Temperature", &panel.temperature),
        ("Feels like", &panel.feels_like),
        ("Humidity", &panel.humidity),
        ("Pressure", &panel.pressure),
        ("Wind speed", &panel.wind),
    ];
    for (label, value) in rows {
        out.push_str(&format!("  {label:<12} {value}\n"));
    }
    if let Some(observed) = &panel.observed_at {
        out.push_str(&format!("  {:<12} {observed}\n", "Observed"));
    }
    if let Some(icon) = &panel.icon_url {
        out.push_str(&format!("  {:<12} {icon}\n", "Icon"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxlookup_core::{OutcomeStatus, Source, Units, WeatherResult, present};

    #[test]
    fn renders_panel_rows() {
        let outcome = OutcomeStatus::Success(WeatherResult {
            location: "Paris, FR".into(),
            condition: Some("Clear".into()),
            description: Some("clear sky".into()),
            temperature: Some(21.6),
            feels_like: Some(21.0),
            humidity: None,
            pressure: Some(1016.0),
            wind_speed: Some(2.57),
            icon: None,
            observed_at: None,
            units: Units::Metric,
            source: Source::Manual,
        });

        let text = render(&present(&outcome)).expect("panel shown");

        assert!(text.starts_with("Paris, FR — manual\nClear — 22°C (clear sky)\n"));
        assert!(text.contains("  Humidity     N/A\n"));
        assert!(text.contains("  Wind speed   2.57 m/s\n"));
        assert!(!text.contains("Icon"));
    }

    #[test]
    fn hidden_panel_renders_nothing() {
        assert!(render(&present(&OutcomeStatus::NotFound)).is_none());
    }
}
