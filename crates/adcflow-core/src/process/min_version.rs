// ── Minimum-version gate ──
//
// Properties annotated with a minimum device version are stripped from
// the declaration when the target runs something older. The user only
// hears about it when they set the property themselves: schema defaults
// filled in after submission disappear silently.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::PostProcessError;
use crate::model::Context;
use crate::tag::{ErrorRecord, PostProcessTag, ProcessOutput, TagProcessor, TaggedItem};
use crate::value;
use crate::version;

/// What to do when the device or gate version cannot be compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Keep the property and say nothing.
    #[default]
    FailOpen,
    /// Treat the device as too old.
    FailClosed,
}

/// Annotation payload: a bare version string or `{ version, strict }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct MinVersion {
    version: String,
    #[serde(default)]
    strict: bool,
}

impl MinVersion {
    fn from_schema_data(data: &Value) -> Option<Self> {
        match data {
            Value::String(version) => Some(Self {
                version: version.clone(),
                strict: false,
            }),
            Value::Object(_) => serde_json::from_value(data.clone()).ok(),
            _ => None,
        }
    }
}

/// Processor for the `minVersion` tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinVersionProcessor {
    policy: VersionPolicy,
}

impl MinVersionProcessor {
    pub fn new(policy: VersionPolicy) -> Self {
        Self { policy }
    }

    fn too_low(self, device: &str, required: &str) -> bool {
        version::is_less(device, required).unwrap_or_else(|| {
            warn!(device, required, policy = ?self.policy, "version gate comparison unavailable");
            self.policy == VersionPolicy::FailClosed
        })
    }
}

enum Finding {
    Warning(ErrorRecord),
    Error(ErrorRecord),
}

impl MinVersionProcessor {
    fn check(
        self,
        ctx: &Context,
        declaration: &mut Value,
        item: &TaggedItem,
        original: Option<&Value>,
    ) -> Option<Finding> {
        let Some(gate) = MinVersion::from_schema_data(&item.data) else {
            debug!(path = %item.instance_path, "minVersion item without a usable version");
            return None;
        };
        if !self.too_low(&ctx.target.tmos_version, &gate.version) {
            return None;
        }

        // Stripped regardless of who supplied it; a second pass over the
        // same items finds nothing left to remove and stays quiet.
        let removed = value::pointer_remove(declaration, &item.instance_path);
        debug!(path = %item.instance_path, required = %gate.version, removed = removed.is_some(), "stripped version-gated property");
        if removed.is_none() {
            return None;
        }

        let explicit =
            original.is_some_and(|o| value::pointer_get(o, &item.instance_path).is_some());
        if !explicit {
            return None;
        }

        let subject = format!("{}.{}", item.parent_class(), item.property());
        let params = json!({ "minVersion": gate.version });
        if gate.strict {
            let message = format!(
                "{subject} is only valid on BIG-IP versions {} and above.",
                gate.version
            );
            Some(Finding::Error(
                ErrorRecord::new(Self::TAG, &item.instance_path, message).with_params(params),
            ))
        } else {
            let message = format!(
                "{subject} ignored. This is only valid on BIG-IP versions {} and above.",
                gate.version
            );
            Some(Finding::Warning(
                ErrorRecord::new(Self::TAG, &item.instance_path, message)
                    .with_params(params)
                    .with_tenant(item.tenant.clone()),
            ))
        }
    }
}

impl TagProcessor for MinVersionProcessor {
    const TAG: PostProcessTag = PostProcessTag::MinVersion;

    fn process(
        &self,
        ctx: &mut Context,
        declaration: &mut Value,
        items: Option<&[TaggedItem]>,
        original: Option<&Value>,
    ) -> Result<Option<ProcessOutput>, PostProcessError> {
        let Some(items) = items else {
            return Ok(None);
        };

        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        for item in items {
            match self.check(ctx, declaration, item, original) {
                Some(Finding::Warning(record)) => {
                    warn!(path = %record.data_path, "{}", record.message);
                    warnings.push(record);
                }
                Some(Finding::Error(record)) => errors.push(record),
                None => {}
            }
        }

        if errors.is_empty() {
            Ok(Some(ProcessOutput { warnings }))
        } else {
            Err(PostProcessError::new(errors))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::NodeList;

    fn ctx(version: &str) -> Context {
        Context::new(version, NodeList::default())
    }

    fn declaration() -> Value {
        json!({
            "class": "ADC",
            "T": {
                "class": "Tenant",
                "A": {
                    "class": "Application",
                    "widget": { "class": "Widget", "prop": 5, "other": true }
                }
            }
        })
    }

    fn item(schema_data: Value) -> TaggedItem {
        TaggedItem {
            instance_path: "/T/A/widget/prop".into(),
            data: schema_data,
            parent_data: json!({ "class": "Widget" }),
            parent_data_property: Some("prop".into()),
            tenant: Some("T".into()),
        }
    }

    #[test]
    fn absent_items_are_a_no_op() {
        let mut decl = declaration();
        let out = MinVersionProcessor::default()
            .process(&mut ctx("13.0"), &mut decl, None, None)
            .unwrap();
        assert_eq!(out, None);
        assert_eq!(decl, declaration());
    }

    #[test]
    fn explicit_property_on_old_device_is_stripped_with_warning() {
        let mut decl = declaration();
        let original = declaration();
        let items = [item(json!("14.1"))];
        let out = MinVersionProcessor::default()
            .process(&mut ctx("13.0"), &mut decl, Some(&items), Some(&original))
            .unwrap()
            .unwrap();

        assert_eq!(decl.pointer("/T/A/widget/prop"), None);
        assert_eq!(decl.pointer("/T/A/widget/other"), Some(&json!(true)));
        assert_eq!(out.warnings.len(), 1);
        let warning = &out.warnings[0];
        assert!(
            warning
                .message
                .ends_with("ignored. This is only valid on BIG-IP versions 14.1 and above."),
            "{}",
            warning.message
        );
        assert!(warning.message.starts_with("Widget.prop "));
        assert_eq!(warning.tenant.as_deref(), Some("T"));
        assert_eq!(warning.keyword, "f5PostProcess(minVersion)");
        assert_eq!(warning.data_path, "/T/A/widget/prop");
    }

    #[test]
    fn strict_gate_rejects_and_still_strips() {
        let mut decl = declaration();
        let original = declaration();
        let items = [item(json!({ "version": "14.1", "strict": true }))];
        let err = MinVersionProcessor::default()
            .process(&mut ctx("13.0"), &mut decl, Some(&items), Some(&original))
            .unwrap_err();

        assert_eq!(err.records().len(), 1);
        assert!(
            err.records()[0]
                .message
                .ends_with("is only valid on BIG-IP versions 14.1 and above.")
        );
        assert_eq!(decl.pointer("/T/A/widget/prop"), None);
    }

    #[test]
    fn defaulted_property_is_stripped_silently() {
        let mut decl = declaration();
        let mut original = declaration();
        original
            .pointer_mut("/T/A/widget")
            .unwrap()
            .as_object_mut()
            .unwrap()
            .remove("prop");
        let items = [item(json!({ "version": "14.1", "strict": true }))];
        let out = MinVersionProcessor::default()
            .process(&mut ctx("13.0"), &mut decl, Some(&items), Some(&original))
            .unwrap()
            .unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(decl.pointer("/T/A/widget/prop"), None);
    }

    #[test]
    fn new_enough_device_keeps_property() {
        for device in ["14.1", "14.1.0", "15.0"] {
            let mut decl = declaration();
            let items = [item(json!("14.1"))];
            let out = MinVersionProcessor::default()
                .process(&mut ctx(device), &mut decl, Some(&items), Some(&declaration()))
                .unwrap()
                .unwrap();
            assert!(out.warnings.is_empty());
            assert_eq!(decl, declaration());
        }
    }

    #[test]
    fn second_pass_adds_no_warnings() {
        let mut decl = declaration();
        let original = declaration();
        let items = [item(json!("14.1"))];
        let processor = MinVersionProcessor::default();
        let mut context = ctx("13.0");

        let first = processor
            .process(&mut context, &mut decl, Some(&items), Some(&original))
            .unwrap()
            .unwrap();
        let second = processor
            .process(&mut context, &mut decl, Some(&items), Some(&original))
            .unwrap()
            .unwrap();
        assert_eq!(first.warnings.len(), 1);
        assert!(second.warnings.is_empty());
    }

    #[test]
    fn unavailable_comparison_follows_policy() {
        let items = [item(json!("14.1"))];

        let mut decl = declaration();
        MinVersionProcessor::new(VersionPolicy::FailOpen)
            .process(&mut ctx("unknown"), &mut decl, Some(&items), Some(&declaration()))
            .unwrap();
        assert_eq!(decl, declaration());

        let mut decl = declaration();
        let out = MinVersionProcessor::new(VersionPolicy::FailClosed)
            .process(&mut ctx("unknown"), &mut decl, Some(&items), Some(&declaration()))
            .unwrap()
            .unwrap();
        assert_eq!(decl.pointer("/T/A/widget/prop"), None);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn all_strict_failures_are_reported_together() {
        let mut decl = declaration();
        let original = declaration();
        let mut second = item(json!({ "version": "16.0", "strict": true }));
        second.instance_path = "/T/A/widget/other".into();
        second.parent_data_property = Some("other".into());
        let items = [item(json!({ "version": "14.1", "strict": true })), second];

        let err = MinVersionProcessor::default()
            .process(&mut ctx("13.0"), &mut decl, Some(&items), Some(&original))
            .unwrap_err();
        let paths: Vec<&str> = err.records().iter().map(|r| r.data_path.as_str()).collect();
        assert_eq!(paths, ["/T/A/widget/prop", "/T/A/widget/other"]);
    }
}
