use serde::{Deserialize, Serialize};

use crate::format::{format_number, to_fixed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Positive,
    Negative,
    Neutral,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Positive => "positive",
            ChangeType::Negative => "negative",
            ChangeType::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResult {
    pub change: String,
    pub change_type: ChangeType,
}

impl ChangeResult {
    fn new(change: impl Into<String>, change_type: ChangeType) -> Self {
        Self {
            change: change.into(),
            change_type,
        }
    }

    fn neutral(change: &str) -> Self {
        Self::new(change, ChangeType::Neutral)
    }
}

/// Which change algorithm a widget card uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeMode {
    #[default]
    Percent,
    Absolute,
}

impl ChangeMode {
    pub fn calculate(self, current: f64, previous: f64) -> ChangeResult {
        match self {
            ChangeMode::Percent => calculate_change(current, previous),
            ChangeMode::Absolute => calculate_absolute_change(current, previous),
        }
    }
}

/// Percentage change from `previous` to `current`.
///
/// Growth from a zero base is reported as a flat `+100%`.
pub fn calculate_change(current: f64, previous: f64) -> ChangeResult {
    if previous == 0.0 {
        return if current > 0.0 {
            ChangeResult::new("+100%", ChangeType::Positive)
        } else {
            ChangeResult::neutral("0%")
        };
    }

    let percent_change = (current - previous) / previous * 100.0;
    if !percent_change.is_finite() || percent_change == 0.0 {
        return ChangeResult::neutral("0%");
    }

    let magnitude = format!("{}%", to_fixed(percent_change.abs(), 1));
    if percent_change > 0.0 {
        ChangeResult::new(format!("+{magnitude}"), ChangeType::Positive)
    } else {
        ChangeResult::new(format!("-{magnitude}"), ChangeType::Negative)
    }
}

pub fn calculate_absolute_change(current: f64, previous: f64) -> ChangeResult {
    let delta = current - previous;
    if !delta.is_finite() || delta == 0.0 {
        return ChangeResult::neutral("0");
    }

    if delta > 0.0 {
        ChangeResult::new(format!("+{}", format_number(delta)), ChangeType::Positive)
    } else {
        ChangeResult::new(format_number(delta), ChangeType::Negative)
    }
}
