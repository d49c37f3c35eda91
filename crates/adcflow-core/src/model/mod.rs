// ── Domain model ──
//
// Device-side state consumed by the post-processing pipeline. Declarations
// themselves stay as `serde_json::Value` trees.

pub mod context;
pub mod node;

pub use context::{Context, DeviceSnapshot, Target};
pub use node::{COMMON_PARTITION, Node, NodeList, NodeMetadata, REFERENCES_METADATA};
