//! Turns a raw observation into the text shown on a slot.
//!
//! Everything here is pure: the only outside input, the current price used by
//! [`Rule::MarketCap`], is handed in through [`DeriveContext`] by the caller.

use serde_json::Value;

use crate::types::{CoinFormat, FormattedLabel, MetricSpec, RawObservation, Rule, UNAVAILABLE};

/// Atomic units per whole coin.
pub const ATOMIC_UNITS_PER_COIN: f64 = 100_000_000.0;
/// Ticker shown after coin amounts.
pub const COIN_SYMBOL: &str = "XEL";

/// Values a recipe may need beyond the metric's own observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeriveContext {
    /// Current USD price, `None` when the ticker is unavailable.
    pub price: Option<f64>,
}

impl DeriveContext {
    pub fn with_price(price: Option<f64>) -> Self {
        Self { price }
    }
}

/// Build the full label, `"{name} {value}"`.
pub fn derive(spec: &MetricSpec, observation: &RawObservation, ctx: &DeriveContext) -> FormattedLabel {
    FormattedLabel::new(&spec.name, &derive_value(spec, observation, ctx))
}

/// Format just the value part of a metric's label.
///
/// Rules run in recipe order and the last one that applies wins. When none
/// applies the raw value is shown as-is, and a missing value shows `N/A`.
pub fn derive_value(spec: &MetricSpec, observation: &RawObservation, ctx: &DeriveContext) -> String {
    let raw = match observation.lookup(spec.key.as_deref()) {
        Some(value) if !value.is_null() => value,
        _ => return UNAVAILABLE.to_string(),
    };

    spec.rules
        .iter()
        .filter_map(|rule| apply_rule(rule, raw, observation, ctx))
        .last()
        .unwrap_or_else(|| passthrough(raw))
}

fn apply_rule(rule: &Rule, raw: &Value, observation: &RawObservation, ctx: &DeriveContext) -> Option<String> {
    let amount = raw.as_f64()?;

    match rule {
        Rule::Coins(format) => Some(format_coins(amount, *format)),
        Rule::Seconds => Some(format!("{:.0}s avg", amount / 1000.0)),
        Rule::PercentOfMax { max_key } => {
            let maximum = observation.lookup(Some(max_key)).and_then(Value::as_f64)?;
            percent_of(amount, maximum)
        }
        Rule::MarketCap => {
            let price = ctx.price?;
            Some(format!("${}", thousands(amount / ATOMIC_UNITS_PER_COIN * price)))
        }
        Rule::Currency => Some(format!("${:.4}", amount)),
    }
}

fn format_coins(atomic: f64, format: CoinFormat) -> String {
    let coins = atomic / ATOMIC_UNITS_PER_COIN;
    match format {
        CoinFormat::Whole => format!("{:.0} {}", coins, COIN_SYMBOL),
        CoinFormat::Reward => format!("{:.4} {}", coins, COIN_SYMBOL),
        CoinFormat::Millions => format!("{:.1}M {}", coins / 1_000_000.0, COIN_SYMBOL),
    }
}

/// `None` when the maximum is zero so another rule or the raw value shows instead.
fn percent_of(numerator: f64, maximum: f64) -> Option<String> {
    if maximum == 0.0 {
        return None;
    }
    Some(format!("{:.2}%", numerator / maximum * 100.0))
}

/// Zero-decimal amount with comma thousands separators.
pub fn thousands(amount: f64) -> String {
    let rounded = format!("{:.0}", amount);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

fn passthrough(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Null => UNAVAILABLE.to_string(),
        other => other.to_string(),
    }
}
