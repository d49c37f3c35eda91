// adcflow-core: Post-validation rewriting of ADC declarations against live device state.

pub mod collect;
pub mod error;
pub mod model;
pub mod process;
pub mod runner;
pub mod search;
pub mod tag;
pub mod value;
pub mod version;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collect::{TagCollector, VersionGate};
pub use error::{CoreError, PostProcessError};
pub use process::{MinVersionProcessor, NodeProcessor, VersionPolicy};
pub use runner::{PostProcessor, RunReport};
pub use tag::{ErrorRecord, PostProcessTag, ProcessOutput, TagProcessor, TaggedItem, TaggedItems};

// Re-export model types at the crate root for ergonomics.
pub use model::{Context, DeviceSnapshot, Node, NodeList, NodeMetadata, Target};
