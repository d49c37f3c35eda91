// ── Tag collection ──
//
// Gathers `TaggedItem`s from an ADC declaration: member lists of every
// Pool for the `node` tag, and properties listed in a version-gate table
// for the `minVersion` tag. Only Tenant and Application objects are
// descended into at the top two levels; below an Application every
// object and array is visited in declaration key order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::tag::{PostProcessTag, TaggedItem, TaggedItems};
use crate::value::pointer_join;

const TENANT_CLASS: &str = "Tenant";
const APPLICATION_CLASS: &str = "Application";
const POOL_CLASS: &str = "Pool";
const MEMBERS_PROPERTY: &str = "members";

/// A property that needs at least `version` on the target device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionGate {
    pub class: String,
    pub property: String,
    pub version: String,
    /// Reject instead of strip-and-warn when the user set the property.
    #[serde(default)]
    pub strict: bool,
}

impl VersionGate {
    pub fn new(class: impl Into<String>, property: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            property: property.into(),
            version: version.into(),
            strict: false,
        }
    }

    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn schema_data(&self) -> Value {
        json!({ "version": self.version, "strict": self.strict })
    }
}

/// Walks declarations and groups what it finds per tag.
#[derive(Debug, Clone, Copy)]
pub struct TagCollector<'a> {
    gates: &'a [VersionGate],
}

impl<'a> TagCollector<'a> {
    pub fn new(gates: &'a [VersionGate]) -> Self {
        Self { gates }
    }

    pub fn collect(&self, declaration: &Value) -> TaggedItems {
        let mut items = TaggedItems::new();
        let Some(root) = declaration.as_object() else {
            return items;
        };

        for (tenant, tenant_obj) in classed(root, TENANT_CLASS) {
            for (app, app_obj) in classed(tenant_obj, APPLICATION_CLASS) {
                let mut walk = Walk {
                    gates: self.gates,
                    tenant,
                    items: &mut items,
                    path: vec![tenant.clone(), app.clone()],
                };
                for (name, child) in app_obj {
                    walk.descend(name.clone(), child);
                }
            }
        }

        debug!(count = items.len(), "collected tagged items");
        items
    }
}

fn classed<'m>(
    map: &'m Map<String, Value>,
    class: &'m str,
) -> impl Iterator<Item = (&'m String, &'m Map<String, Value>)> {
    map.iter().filter_map(move |(name, child)| {
        let obj = child.as_object()?;
        (obj.get("class").and_then(Value::as_str) == Some(class)).then_some((name, obj))
    })
}

struct Walk<'a> {
    gates: &'a [VersionGate],
    tenant: &'a str,
    items: &'a mut TaggedItems,
    path: Vec<String>,
}

impl Walk<'_> {
    fn descend(&mut self, segment: String, child: &Value) {
        self.path.push(segment);
        self.visit(child);
        self.path.pop();
    }

    fn visit(&mut self, value: &Value) {
        match value {
            Value::Object(obj) => {
                self.tag_object(obj);
                for (name, child) in obj {
                    self.descend(name.clone(), child);
                }
            }
            Value::Array(list) => {
                for (idx, child) in list.iter().enumerate() {
                    self.descend(idx.to_string(), child);
                }
            }
            _ => {}
        }
    }

    fn tag_object(&mut self, obj: &Map<String, Value>) {
        let Some(class) = obj.get("class").and_then(Value::as_str) else {
            return;
        };

        if class == POOL_CLASS {
            if let Some(members @ Value::Array(_)) = obj.get(MEMBERS_PROPERTY) {
                self.push(PostProcessTag::Node, obj, MEMBERS_PROPERTY, members.clone());
            }
        }

        for gate in self.gates.iter().filter(|g| g.class == class) {
            if obj.contains_key(&gate.property) {
                self.push(PostProcessTag::MinVersion, obj, &gate.property, gate.schema_data());
            }
        }
    }

    fn push(&mut self, tag: PostProcessTag, parent: &Map<String, Value>, property: &str, data: Value) {
        let instance_path = pointer_join(self.path.iter().map(String::as_str).chain([property]));
        self.items.push(
            tag,
            TaggedItem {
                instance_path,
                data,
                parent_data: Value::Object(parent.clone()),
                parent_data_property: Some(property.to_owned()),
                tenant: Some(self.tenant.to_owned()),
            },
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn declaration() -> Value {
        json!({
            "class": "ADC",
            "schemaVersion": "3.0.0",
            "T1": {
                "class": "Tenant",
                "A": {
                    "class": "Application",
                    "web": {
                        "class": "Pool",
                        "members": [{ "servicePort": 80, "serverAddresses": ["10.0.0.1"] }],
                        "minimumMonitors": 1
                    },
                    "svc": {
                        "class": "Service_HTTP",
                        "virtualAddresses": ["10.1.0.1"],
                        "profileHTTP": { "class": "HTTP_Profile", "knownMethods": ["GET"] }
                    }
                },
                "notAnApp": { "class": "Pool", "members": [] }
            },
            "Shared": { "class": "Application", "p": { "class": "Pool", "members": [] } }
        })
    }

    #[test]
    fn pools_under_applications_are_tagged() {
        let items = TagCollector::new(&[]).collect(&declaration());
        let nodes = items.get(PostProcessTag::Node).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].instance_path, "/T1/A/web/members");
        assert_eq!(nodes[0].tenant.as_deref(), Some("T1"));
        assert_eq!(nodes[0].parent_class(), "Pool");
        assert_eq!(nodes[0].data.as_array().unwrap().len(), 1);
        assert!(items.get(PostProcessTag::MinVersion).is_none());
    }

    #[test]
    fn gated_properties_are_tagged_at_any_depth() {
        let gates = [
            VersionGate::new("HTTP_Profile", "knownMethods", "14.1").strict(),
            VersionGate::new("Pool", "minimumMonitors", "13.1"),
            VersionGate::new("Pool", "absent", "99.0"),
        ];
        let items = TagCollector::new(&gates).collect(&declaration());
        let gated = items.get(PostProcessTag::MinVersion).unwrap();
        let paths: Vec<&str> = gated.iter().map(|i| i.instance_path.as_str()).collect();
        assert_eq!(paths, ["/T1/A/web/minimumMonitors", "/T1/A/svc/profileHTTP/knownMethods"]);
        assert_eq!(gated[1].data, json!({ "version": "14.1", "strict": true }));
        assert_eq!(gated[1].property(), "knownMethods");
    }

    #[test]
    fn objects_inside_arrays_are_visited() {
        let decl = json!({
            "T": {
                "class": "Tenant",
                "A": {
                    "class": "Application",
                    "rules": { "class": "Endpoint_Policy", "rules": [
                        { "class": "Policy_Rule", "flag": true }
                    ] }
                }
            }
        });
        let gates = [VersionGate::new("Policy_Rule", "flag", "15.0")];
        let items = TagCollector::new(&gates).collect(&decl);
        let gated = items.get(PostProcessTag::MinVersion).unwrap();
        assert_eq!(gated[0].instance_path, "/T/A/rules/rules/0/flag");
    }

    #[test]
    fn non_object_declaration_yields_nothing() {
        assert!(TagCollector::new(&[]).collect(&json!([1, 2])).is_empty());
    }
}
