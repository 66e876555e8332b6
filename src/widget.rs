use std::io::Read;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::change::{ChangeMode, ChangeResult};
use crate::equation::{evaluate_equation, EquationToken};
use crate::format::{format_value, DisplayFormat};
use crate::metrics::MetricsSnapshot;

// Widgets are edited in place, so stored rows often carry `null` for
// fields that have not been filled in yet.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_active<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn lenient_equation<'de, D>(deserializer: D) -> Result<Vec<EquationToken>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(EquationToken::decode_lenient(values))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(rename = "valueFormat", default, deserialize_with = "null_as_default")]
    pub value_format: DisplayFormat,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(rename = "changeMode", default, deserialize_with = "null_as_default")]
    pub change_mode: ChangeMode,
}

fn default_active() -> bool {
    true
}

/// A custom dashboard widget as stored in `custom_widgets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDefinition {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "lenient_equation")]
    pub equation: Vec<EquationToken>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_config: DisplayConfig,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: i32,
    #[serde(default = "default_active", deserialize_with = "null_as_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetSummary {
    pub title: String,
    pub subtitle: Option<String>,
    pub section: Option<String>,
    pub current: f64,
    pub previous: f64,
    pub value: String,
    #[serde(flatten)]
    pub change: ChangeResult,
}

pub fn summarize_widget(
    definition: &WidgetDefinition,
    current: &MetricsSnapshot,
    previous: &MetricsSnapshot,
) -> WidgetSummary {
    let config = &definition.display_config;
    let current_value = evaluate_equation(&definition.equation, current);
    let previous_value = evaluate_equation(&definition.equation, previous);

    WidgetSummary {
        title: definition.title.clone(),
        subtitle: config.subtitle.clone(),
        section: definition.section.clone(),
        current: current_value,
        previous: previous_value,
        value: format_value(current_value, config.value_format),
        change: config.change_mode.calculate(current_value, previous_value),
    }
}

/// Active widgets in display order.
pub fn active_widgets(mut widgets: Vec<WidgetDefinition>) -> Vec<WidgetDefinition> {
    widgets.retain(|widget| widget.is_active);
    widgets.sort_by_key(|widget| widget.position);
    widgets
}

/// Decodes stored widgets one at a time. A row that cannot be decoded is
/// logged and left out instead of failing the whole list.
pub fn decode_widgets(values: Vec<Value>) -> Vec<WidgetDefinition> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(widget) => Some(widget),
            Err(err) => {
                log::warn!("skipping malformed widget #{index}: {err}");
                None
            }
        })
        .collect()
}

pub fn load_widgets(reader: impl Read) -> serde_json::Result<Vec<WidgetDefinition>> {
    let values: Vec<Value> = serde_json::from_reader(reader)?;
    Ok(active_widgets(decode_widgets(values)))
}

pub fn summarize_all(
    widgets: &[WidgetDefinition],
    current: &MetricsSnapshot,
    previous: &MetricsSnapshot,
) -> Vec<WidgetSummary> {
    widgets
        .iter()
        .map(|widget| summarize_widget(widget, current, previous))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeType;
    use crate::metrics::MetricKey;

    const WIDGETS: &str = r#"[
        {
            "title": "Average donation",
            "description": "Raised per approved donation",
            "section": "donations",
            "equation": [
                {"type": "operand", "value": "donations_amount"},
                {"type": "operator", "value": "/"},
                {"type": "operand", "value": "donations_approved"}
            ],
            "display_config": {"valueFormat": "currency", "subtitle": "this month"},
            "position": 2,
            "is_active": true
        },
        {
            "title": "Hidden",
            "equation": [],
            "position": 0,
            "is_active": false
        },
        {
            "title": "Events held",
            "equation": [{"type": "operand", "value": "events_count"}],
            "display_config": {"changeMode": "absolute"},
            "position": 1
        }
    ]"#;

    #[test]
    fn loading_drops_inactive_and_orders_by_position() {
        let widgets = load_widgets(WIDGETS.as_bytes()).unwrap();
        let titles: Vec<&str> = widgets.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Events held", "Average donation"]);
        assert_eq!(widgets[0].display_config.value_format, DisplayFormat::Number);
        assert_eq!(widgets[1].display_config.value_format, DisplayFormat::Currency);
    }

    #[test]
    fn summary_formats_value_and_compares_against_previous() {
        let widgets = load_widgets(WIDGETS.as_bytes()).unwrap();
        let current = MetricsSnapshot::partial([
            (MetricKey::DonationsAmount, 2469.0),
            (MetricKey::DonationsApproved, 2.0),
            (MetricKey::EventsCount, 6.0),
        ]);
        let previous = MetricsSnapshot::partial([
            (MetricKey::DonationsAmount, 900.0),
            (MetricKey::EventsCount, 8.0),
        ]);

        let summaries = summarize_all(&widgets, &current, &previous);

        assert_eq!(summaries[0].value, "6");
        assert_eq!(summaries[0].change.change, "-2");
        assert_eq!(summaries[0].change.change_type, ChangeType::Negative);

        // previous donations_approved is zero, so the ratio divides by zero
        assert_eq!(summaries[1].value, "$1,234.50");
        assert_eq!(summaries[1].previous, 0.0);
        assert_eq!(summaries[1].change.change, "+100%");
        assert_eq!(summaries[1].subtitle.as_deref(), Some("this month"));
    }

    const PARTLY_EDITED: &str = r#"[
        {
            "title": "Raised",
            "equation": [{"type": "operand", "value": "donations_amount"}],
            "display_config": {"valueFormat": "currency"},
            "position": 1
        },
        {
            "title": "Power user",
            "equation": [
                {"type": "operand", "value": "events_count"},
                {"type": "operator", "value": "^"},
                {"type": "operand", "value": "donations_count"}
            ],
            "position": 2
        },
        {
            "title": "Blank",
            "equation": null,
            "display_config": null,
            "position": null,
            "is_active": null
        },
        {
            "title": "Half configured",
            "display_config": {"valueFormat": null, "subtitle": null, "changeMode": null},
            "position": 3
        },
        {"description": "no title"},
        {"title": "Bad equation shape", "equation": "events_count"}
    ]"#;

    #[test]
    fn partly_edited_widgets_degrade_instead_of_failing_the_list() {
        let widgets = load_widgets(PARTLY_EDITED.as_bytes()).unwrap();
        let titles: Vec<&str> = widgets.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Blank", "Raised", "Power user", "Half configured"]);

        let blank = &widgets[0];
        assert!(blank.equation.is_empty());
        assert_eq!(blank.display_config, DisplayConfig::default());
        assert_eq!(blank.position, 0);
        assert!(blank.is_active);

        let current = MetricsSnapshot::partial([
            (MetricKey::DonationsAmount, 40.0),
            (MetricKey::EventsCount, 6.0),
        ]);
        let previous = MetricsSnapshot::default();
        let summaries = summarize_all(&widgets, &current, &previous);

        assert_eq!(summaries[0].value, "0");
        assert_eq!(summaries[1].value, "$40.00");
        // the `^` pair is skipped, leaving events_count
        assert_eq!(summaries[2].value, "6");
        assert_eq!(summaries[3].value, "0");
        assert_eq!(summaries[3].change.change_type, ChangeType::Neutral);
    }

    #[test]
    fn empty_equation_renders_zero() {
        let widget = WidgetDefinition {
            title: "Draft".to_string(),
            description: None,
            section: None,
            equation: Vec::new(),
            display_config: DisplayConfig {
                value_format: DisplayFormat::Currency,
                ..DisplayConfig::default()
            },
            position: 0,
            is_active: true,
        };
        let snapshot = MetricsSnapshot::default();
        let summary = summarize_widget(&widget, &snapshot, &snapshot);
        assert_eq!(summary.value, "$0.00");
        assert_eq!(summary.change.change_type, ChangeType::Neutral);
    }
}
