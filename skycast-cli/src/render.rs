//! Human-readable terminal output for view snapshots.

use std::fmt::Write;

use skycast_core::{Location, Notice, ViewState};

/// Numbered candidate list, 1-based to match the `:N` picker.
pub fn candidates(found: &[Location]) -> String {
    let mut out = String::new();
    for (i, location) in found.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {} [{}]", i + 1, location.name, location.key);
    }
    out
}

/// Weather block for the selected location, or nothing when none is selected.
pub fn weather(state: &ViewState) -> String {
    let Some(selected) = &state.selected else {
        return String::new();
    };

    let mut out = String::new();
    let star = if state.is_favorite { " *" } else { "" };
    let _ = writeln!(out, "{} [{}]{star}", selected.name, selected.key);

    match &state.current {
        Some(now) => {
            let _ = writeln!(
                out,
                "  Now: {}, {} (observed {})",
                now.temperature,
                now.condition,
                now.observed_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => out.push_str("  Now: unavailable\n"),
    }

    for day in &state.forecast {
        let _ = writeln!(
            out,
            "  {}  {:>5} .. {:<5}  {}",
            day.date.format("%a %d %b"),
            day.minimum.to_string(),
            day.maximum.to_string(),
            day.headline
        );
    }

    if let Some(advice) = &state.recommendation {
        let _ = writeln!(out, "  Wear: {advice}");
    }
    out
}

/// Full snapshot for the interactive session.
pub fn state(state: &ViewState) -> String {
    let mut out = format!("> {}\n", state.query);
    out.push_str(&candidates(&state.candidates));
    out.push_str(&weather(state));
    out
}

pub fn favorites(stored: &[Location]) -> String {
    if stored.is_empty() {
        return "No favorites yet.\n".to_string();
    }
    stored.iter().map(|l| format!("{} [{}]\n", l.name, l.key)).collect()
}

pub fn notice(notice: &Notice) {
    eprintln!("{notice}");
}

pub fn help() -> &'static str {
    "Type to search. :N picks candidate N, :u toggles units, :f toggles favorite, \
     :l lists favorites, :h shows this help, :q quits.\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use skycast_core::{
        TemperatureDisplay, UnitSystem,
        model::Reading,
        panel::{CurrentDisplay, ForecastDisplay},
    };

    fn selected_state() -> ViewState {
        ViewState {
            query: "Tel Aviv".into(),
            candidates: vec![Location::new("215854", "Tel Aviv")],
            selected: Some(Location::new("215854", "Tel Aviv")),
            is_favorite: true,
            current: Some(CurrentDisplay {
                condition: "Sunny".into(),
                temperature: TemperatureDisplay::of(Reading::celsius(25.0), UnitSystem::Metric),
                observed_at: Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap(),
            }),
            forecast: vec![ForecastDisplay {
                date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                minimum: TemperatureDisplay::of(Reading::celsius(20.0), UnitSystem::Metric),
                maximum: TemperatureDisplay::of(Reading::celsius(30.0), UnitSystem::Metric),
                headline: "Hot".into(),
            }],
            recommendation: None,
            units: UnitSystem::Metric,
        }
    }

    #[test]
    fn candidates_are_numbered_from_one() {
        let out = candidates(&[Location::new("623", "Paris"), Location::new("328328", "London")]);
        assert_eq!(out, "  1. Paris [623]\n  2. London [328328]\n");
    }

    #[test]
    fn weather_shows_current_forecast_and_favorite_marker() {
        let out = weather(&selected_state());

        assert!(out.starts_with("Tel Aviv [215854] *\n"));
        assert!(out.contains("Now: 25°C, Sunny (observed 2024-06-10 09:30 UTC)"));
        assert!(out.contains("Mon 10 Jun"));
        assert!(out.contains("20°C"));
        assert!(out.contains("30°C"));
        assert!(out.contains("Hot"));
    }

    #[test]
    fn missing_current_is_marked_unavailable() {
        let mut state = selected_state();
        state.current = None;
        assert!(weather(&state).contains("Now: unavailable"));
    }

    #[test]
    fn nothing_selected_renders_no_weather() {
        assert!(weather(&ViewState::default()).is_empty());
    }

    #[test]
    fn empty_favorites_say_so() {
        assert_eq!(favorites(&[]), "No favorites yet.\n");
    }
}
