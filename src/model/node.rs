use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::edge::TimeValue;

/// Dense index of a node inside a [`TemporalGraph`](crate::store::TemporalGraph).
pub type NodeIndex = usize;

// ---------------------------------------------------------------------------
// Node: an address seen in the ledger
// ---------------------------------------------------------------------------

/// A ledger address. Nodes are created implicitly by the first edge that
/// references them and are never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Dense index, stable for the lifetime of the store.
    pub index: NodeIndex,
    /// Opaque address string (unique key).
    pub address: String,
    /// Earliest timestamp of any incident edge or node record.
    pub first_seen: Option<i64>,
    /// Optional classification label assigned by downstream tooling.
    pub label: Option<String>,
    /// Free-form attributes supplied by node records.
    pub attributes: BTreeMap<String, String>,
}

impl Node {
    pub(crate) fn new(index: NodeIndex, address: impl Into<String>) -> Self {
        Self {
            index,
            address: address.into(),
            first_seen: None,
            label: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Lower `first_seen` to `timestamp` if it is earlier (or unset).
    pub(crate) fn observe(&mut self, timestamp: i64) {
        self.first_seen = Some(match self.first_seen {
            Some(current) => current.min(timestamp),
            None => timestamp,
        });
    }
}

// ---------------------------------------------------------------------------
// NodeRecord: optional node metadata from the ingestion collaborator
// ---------------------------------------------------------------------------

/// Node metadata record. Applying one never creates or changes edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Address of the node.
    #[serde(alias = "node_id", alias = "address")]
    pub id: String,
    /// Observation time; lowers the node's first-seen time when earlier.
    #[serde(default, alias = "timeStamp")]
    pub timestamp: Option<TimeValue>,
    /// Classification label.
    #[serde(default, alias = "node_type")]
    pub label: Option<String>,
    /// Extra attributes, merged into the node's attribute map.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: None,
            label: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(TimeValue::Seconds(timestamp));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
