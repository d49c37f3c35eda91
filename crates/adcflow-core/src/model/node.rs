// ── Device nodes ──
//
// A `Node` is one existing backend object on the target device, as
// discovered before post-processing starts. `NodeList` keeps them sorted
// ascending on `key` (byte-wise, case-sensitive) so the reconciliation
// processor can binary-search it by address or by FQDN hostname.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::search::binary_search;

/// Partition holding objects shared by every tenant.
pub const COMMON_PARTITION: &str = "Common";

/// Metadata entry name marking a shared node that tenants reference.
pub const REFERENCES_METADATA: &str = "references";

/// One metadata entry attached to a device node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An existing node on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Absolute path, `/Partition/Name` or `/Partition/SubPath/Name`.
    pub full_path: String,
    pub partition: String,
    /// Sort and search key: the address for static nodes, the FQDN
    /// hostname for DNS nodes.
    pub key: String,
    /// Created by DNS resolution of an FQDN node.
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<NodeMetadata>>,
    /// Set by reconciliation when a shared Common node was left for audit.
    #[serde(default)]
    pub common_node: bool,
}

impl Node {
    pub fn is_common(&self) -> bool {
        self.partition == COMMON_PARTITION
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// `/Common/<name>` with no sub-path, carrying `references` metadata.
    pub fn is_shared_common_reference(&self) -> bool {
        let bare = self
            .full_path
            .strip_prefix("/Common/")
            .is_some_and(|name| !name.is_empty() && !name.contains('/'));
        bare && self.is_common()
            && self
                .metadata
                .as_deref()
                .is_some_and(|entries| entries.iter().any(|m| m.name == REFERENCES_METADATA))
    }

    /// Builds a node from a raw device REST record.
    ///
    /// Returns `None` when the record has no `fullPath`.
    pub fn from_device_record(record: &Value) -> Option<Self> {
        let full_path = record.get("fullPath")?.as_str()?.to_owned();
        let partition = record
            .get("partition")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| full_path.split('/').nth(1).map(str::to_owned))
            .unwrap_or_default();
        let domain = record
            .pointer("/fqdn/tmName")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
        let ephemeral = match record.get("ephemeral") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag == "true",
            _ => false,
        };
        // Nodes created by DNS resolution carry their parent's tmName but
        // are found by the address they resolved to.
        let key = match &domain {
            Some(hostname) if !ephemeral => hostname.clone(),
            _ => {
                let address = record.get("address").and_then(Value::as_str).unwrap_or_default();
                address.strip_suffix("%0").unwrap_or(address).to_owned()
            }
        };
        let metadata = record
            .get("metadata")
            .and_then(|raw| serde_json::from_value(raw.clone()).ok());

        Some(Self {
            full_path,
            partition,
            key,
            ephemeral,
            domain,
            metadata,
            common_node: false,
        })
    }
}

// ── NodeList ────────────────────────────────────────────────────────

/// Device nodes sorted ascending on `key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Node>", into = "Vec<Node>")]
pub struct NodeList(Vec<Node>);

impl NodeList {
    pub fn new(mut nodes: Vec<Node>) -> Self {
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        Self(nodes)
    }

    /// Converts raw device REST records, skipping ones without `fullPath`.
    pub fn from_device_records(records: &[Value]) -> Self {
        let nodes = records
            .iter()
            .filter_map(|record| {
                let node = Node::from_device_record(record);
                if node.is_none() {
                    tracing::debug!(?record, "skipping device node without fullPath");
                }
                node
            })
            .collect();
        Self::new(nodes)
    }

    /// Index of a node whose key equals `key`.
    pub fn find(&self, key: &str) -> Option<usize> {
        binary_search(&self.0, |node| key.cmp(node.key.as_str()))
    }

    pub fn get(&self, idx: usize) -> Option<&Node> {
        self.0.get(idx)
    }

    /// Flags a node as a shared Common node left for audit.
    pub fn mark_common(&mut self, idx: usize) {
        if let Some(node) = self.0.get_mut(idx) {
            node.common_node = true;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.0.iter()
    }
}

impl From<Vec<Node>> for NodeList {
    fn from(nodes: Vec<Node>) -> Self {
        Self::new(nodes)
    }
}

impl From<NodeList> for Vec<Node> {
    fn from(list: NodeList) -> Self {
        list.0
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
