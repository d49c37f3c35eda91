// ── Post-process runner ──
//
// Runs every tag processor over one declaration in a fixed order and
// folds their results together, so a single run reports every warning
// and every rejection at once.

use serde::Serialize;
use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::error::PostProcessError;
use crate::model::Context;
use crate::process::{MinVersionProcessor, NodeProcessor};
use crate::tag::{ErrorRecord, PostProcessTag, ProcessOutput, TagProcessor, TaggedItems};

/// Everything one pipeline run found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub warnings: Vec<ErrorRecord>,
    pub errors: Vec<ErrorRecord>,
}

impl RunReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The warnings on success, or every error as one aggregate.
    pub fn into_result(self) -> Result<Vec<ErrorRecord>, PostProcessError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(PostProcessError::new(self.errors))
        }
    }

    fn absorb(&mut self, result: Result<Option<ProcessOutput>, PostProcessError>) {
        match result {
            Ok(Some(output)) => self.warnings.extend(output.warnings),
            Ok(None) => {}
            Err(err) => self.errors.extend(err.into_records()),
        }
    }
}

/// The configured set of tag processors.
#[derive(Debug, Clone, Default)]
pub struct PostProcessor {
    min_version: MinVersionProcessor,
    node: NodeProcessor,
}

impl PostProcessor {
    pub fn new(min_version: MinVersionProcessor, node: NodeProcessor) -> Self {
        Self { min_version, node }
    }

    /// Applies every tag to `declaration`. `original` is the declaration
    /// as the user submitted it, before defaults were filled in.
    pub fn run(
        &self,
        ctx: &mut Context,
        declaration: &mut Value,
        tagged: &TaggedItems,
        original: Option<&Value>,
    ) -> RunReport {
        let mut report = RunReport::default();
        for tag in PostProcessTag::iter() {
            let items = tagged.get(tag);
            debug!(%tag, count = items.map_or(0, <[_]>::len), "running tag processor");
            let result = match tag {
                PostProcessTag::MinVersion => {
                    self.min_version.process(ctx, declaration, items, original)
                }
                PostProcessTag::Node => self.node.process(ctx, declaration, items, original),
            };
            report.absorb(result);
        }
        info!(
            warnings = report.warnings.len(),
            errors = report.errors.len(),
            "post-processing finished"
        );
        report
    }
}
