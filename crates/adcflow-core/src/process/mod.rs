// ── Tag processors ──

mod address;
pub mod min_version;
pub mod node;

pub use min_version::{MinVersionProcessor, VersionPolicy};
pub use node::NodeProcessor;
