use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Literal shown in place of a value that could not be fetched or derived.
pub const UNAVAILABLE: &str = "N/A";

/// Upstream a metric reads its raw value from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// JSON-RPC method on the node, e.g. `get_info`.
    NodeRpc { method: String },
    /// USD price from the ticker endpoint.
    Price,
}

impl Source {
    pub fn node(method: &str) -> Self {
        Source::NodeRpc {
            method: method.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Source::NodeRpc { method } => method,
            Source::Price => "price",
        }
    }
}

/// How whole-coin amounts are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinFormat {
    /// `1234 XEL`
    Whole,
    /// `5.0000 XEL`
    Reward,
    /// `18.4M XEL`
    Millions,
}

/// A single derivation step. A metric's recipe lists these in evaluation
/// order and the last one that applies decides the displayed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    /// Atomic units to whole coins.
    Coins(CoinFormat),
    /// Milliseconds to `Ns avg`.
    Seconds,
    /// Value as a share of another field of the same payload.
    PercentOfMax { max_key: String },
    /// Atomic circulating supply times the current price.
    MarketCap,
    /// Price with a currency prefix.
    Currency,
}

/// Static description of one tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Stable label prefix, also the registry key (e.g. `"Price:"`).
    pub name: String,
    pub source: Source,
    /// Dotted path into the fetched payload; `None` uses the payload itself.
    pub key: Option<String>,
    pub rules: Vec<Rule>,
}

impl MetricSpec {
    pub fn new(name: &str, source: Source, key: Option<&str>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.to_string(),
            source,
            key: key.map(str::to_string),
            rules,
        }
    }

    /// Whether deriving this metric needs the current price.
    pub fn needs_price(&self) -> bool {
        self.rules.iter().any(|rule| matches!(rule, Rule::MarketCap))
    }
}

/// Outcome of a fetch. Transport failures are folded into `Unavailable`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawObservation {
    Available(Value),
    Unavailable { reason: String },
}

impl RawObservation {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        RawObservation::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RawObservation::Available(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            RawObservation::Available(value) => Some(value),
            RawObservation::Unavailable { .. } => None,
        }
    }

    /// Resolve a dotted key path against the payload.
    pub fn lookup(&self, key: Option<&str>) -> Option<&Value> {
        let value = self.value()?;
        match key {
            Some(path) => lookup_path(value, path),
            None => Some(value),
        }
    }

    /// Numeric view of the payload itself, used for the price.
    pub fn as_f64(&self) -> Option<f64> {
        self.value().and_then(Value::as_f64)
    }
}

/// Walk `a.b.c` through nested JSON objects.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
}

/// Final display string for a metric, e.g. `Price: $0.0123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormattedLabel(String);

impl FormattedLabel {
    pub fn new(name: &str, value: &str) -> Self {
        Self(format!("{} {}", name, value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormattedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a remote slot or container (a Discord snowflake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SlotId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(SlotId)
    }
}

/// Logical metric name bound to the remote slot that displays it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBinding {
    pub name: String,
    pub id: SlotId,
}

impl SlotBinding {
    pub fn new(name: &str, id: SlotId) -> Self {
        Self {
            name: name.to_string(),
            id,
        }
    }
}
