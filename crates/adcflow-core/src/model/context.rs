// ── Run context ──
//
// Device state gathered before post-processing. Core never fetches it;
// the caller hands in a `DeviceSnapshot` (or builds a `Context` directly).

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::model::node::NodeList;

/// The device being configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Dotted TMOS version, e.g. `"14.1.2"`.
    pub tmos_version: String,
}

/// Environment for one post-processing run.
///
/// A run owns the context exclusively: the node processor flags shared
/// Common nodes in `nodes` as it goes.
#[derive(Debug, Clone)]
pub struct Context {
    pub target: Target,
    pub nodes: NodeList,
}

impl Context {
    pub fn new(tmos_version: impl Into<String>, nodes: NodeList) -> Self {
        Self {
            target: Target {
                tmos_version: tmos_version.into(),
            },
            nodes,
        }
    }
}

/// Device state as captured to a file: `{ "tmosVersion": ..., "nodes": [...] }`.
///
/// `nodes` holds raw device REST node records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    #[serde(default)]
    pub tmos_version: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Value>,
}

impl DeviceSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw).map_err(|source| CoreError::Json {
            what: "device snapshot".into(),
            source,
        })
    }

    /// Builds the run context, falling back to `default_version` when the
    /// snapshot carries none.
    pub fn into_context(self, default_version: Option<&str>) -> Result<Context, CoreError> {
        let version = self
            .tmos_version
            .or_else(|| default_version.map(str::to_owned))
            .ok_or_else(|| CoreError::MissingField {
                field: "tmosVersion".into(),
            })?;
        Ok(Context::new(version, NodeList::from_device_records(&self.nodes)))
    }
}
