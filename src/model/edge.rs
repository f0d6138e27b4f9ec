use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::model::node::NodeIndex;

/// Dense index of an edge inside a [`TemporalGraph`](crate::store::TemporalGraph).
/// Indices follow insertion order and double as the timestamp tie-break.
pub type EdgeIndex = usize;

// ---------------------------------------------------------------------------
// EdgeRecord: one raw transfer as handed over by the ingestion collaborator
// ---------------------------------------------------------------------------

/// A raw transfer record. Field spellings used by ledger exports
/// (`from_address`, `to_address`, `timeStamp`) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Sending address.
    #[serde(alias = "from_address", alias = "from")]
    pub source: String,
    /// Receiving address.
    #[serde(alias = "to_address", alias = "to")]
    pub destination: String,
    /// Transfer time. Absent or unparseable values are rejected at ingest.
    #[serde(default, alias = "timeStamp")]
    pub timestamp: Option<TimeValue>,
    /// Transferred amount. Must be a finite, non-negative number.
    #[serde(default)]
    pub value: Option<AmountValue>,
}

impl EdgeRecord {
    /// Build a well-formed record from already-typed fields.
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        timestamp: i64,
        value: f64,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            timestamp: Some(TimeValue::Seconds(timestamp)),
            value: Some(AmountValue::Number(value)),
        }
    }

    /// Validate the record and return its typed timestamp and value.
    /// `index` is the record's position in the input sequence and is carried
    /// into the error so the offending row can be located.
    pub fn validate(&self, index: usize) -> LedgerResult<(i64, f64)> {
        if self.source.trim().is_empty() {
            return Err(invalid(index, "source", "is empty"));
        }
        if self.destination.trim().is_empty() {
            return Err(invalid(index, "destination", "is empty"));
        }

        let timestamp = match &self.timestamp {
            None => return Err(invalid(index, "timestamp", "is missing")),
            Some(t) => t
                .to_seconds()
                .ok_or_else(|| invalid(index, "timestamp", &format!("cannot parse {t}")))?,
        };

        let value = match &self.value {
            None => return Err(invalid(index, "value", "is missing")),
            Some(v) => v
                .to_f64()
                .ok_or_else(|| invalid(index, "value", &format!("is not numeric: {v}")))?,
        };
        if !value.is_finite() {
            return Err(invalid(index, "value", "is not a finite number"));
        }
        if value < 0.0 {
            return Err(invalid(index, "value", &format!("must be non-negative, got {value}")));
        }

        Ok((timestamp, value))
    }
}

fn invalid(index: usize, field: &'static str, reason: &str) -> LedgerError {
    LedgerError::InvalidRecord {
        index,
        field,
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Loosely-typed field values accepted at the boundary
// ---------------------------------------------------------------------------

/// A timestamp as it appears in the source data: integer seconds, or text
/// holding either integer seconds or a calendar date-time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(i64),
    Text(String),
}

impl TimeValue {
    /// Resolve to Unix seconds. Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`
    /// (interpreted as UTC) and bare dates.
    pub fn to_seconds(&self) -> Option<i64> {
        match self {
            TimeValue::Seconds(s) => Some(*s),
            TimeValue::Text(raw) => {
                let raw = raw.trim();
                if let Ok(s) = raw.parse::<i64>() {
                    return Some(s);
                }
                if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                    return Some(dt.timestamp());
                }
                if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
                    return Some(dt.and_utc().timestamp());
                }
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc().timestamp())
            }
        }
    }
}

impl std::fmt::Display for TimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeValue::Seconds(s) => write!(f, "{s}"),
            TimeValue::Text(t) => write!(f, "{t:?}"),
        }
    }
}

/// A transfer amount: JSON number or numeric text (ledger exports often
/// carry token amounts as strings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountValue {
    Number(f64),
    Text(String),
}

impl AmountValue {
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            AmountValue::Number(n) => Some(*n),
            AmountValue::Text(t) => t.trim().parse::<f64>().ok(),
        }
    }
}

impl std::fmt::Display for AmountValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmountValue::Number(n) => write!(f, "{n}"),
            AmountValue::Text(t) => write!(f, "{t:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Edge: a validated, stored transfer
// ---------------------------------------------------------------------------

/// A directed, timestamped transfer between two stored nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Insertion-order index.
    pub id: EdgeIndex,
    /// Sending node.
    pub source: NodeIndex,
    /// Receiving node.
    pub target: NodeIndex,
    /// Unix seconds.
    pub timestamp: i64,
    /// Transferred amount, always >= 0.
    pub value: f64,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Whether `node` is one of this edge's endpoints.
    pub fn touches(&self, node: NodeIndex) -> bool {
        self.source == node || self.target == node
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint.
    pub fn other(&self, node: NodeIndex) -> Option<NodeIndex> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// Chronological ordering key: timestamp, then insertion order.
    pub fn order_key(&self) -> (i64, EdgeIndex) {
        (self.timestamp, self.id)
    }
}

/// Which incident edges a neighborhood query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}
