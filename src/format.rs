use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DisplayFormat {
    #[default]
    Number,
    Currency,
    Percent,
}

impl From<String> for DisplayFormat {
    fn from(value: String) -> Self {
        DisplayFormat::from(value.as_str())
    }
}

impl From<&str> for DisplayFormat {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "currency" => DisplayFormat::Currency,
            "percent" | "percentage" => DisplayFormat::Percent,
            _ => DisplayFormat::Number,
        }
    }
}

/// Renders a widget value. Non-finite input is rendered as zero.
pub fn format_value(value: f64, format: DisplayFormat) -> String {
    // also folds -0.0 into 0.0
    let value = if value.is_finite() && value != 0.0 { value } else { 0.0 };

    match format {
        DisplayFormat::Currency => format_currency(value),
        DisplayFormat::Percent => format!("{}%", to_fixed(value * 100.0, 1)),
        DisplayFormat::Number => format_number(value),
    }
}

pub fn format_number(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

/// Fixed-point rendering with ties rounded away from zero, so `0.125`
/// becomes `0.13` rather than `0.12`. Zero never carries a sign.
pub fn to_fixed(value: f64, places: u32) -> String {
    let value = if value.is_finite() { value } else { 0.0 };

    match Decimal::from_f64(value) {
        Some(decimal) => {
            let mut rounded =
                decimal.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(places);
            if rounded.is_zero() {
                rounded.set_sign_positive(true);
            }
            rounded.to_string()
        }
        // outside the decimal range; no fractional digits survive there anyway
        None => format!("{:.*}", places as usize, value),
    }
}

fn format_currency(value: f64) -> String {
    let fixed = to_fixed(value.abs(), 2);
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${}.{cents}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
