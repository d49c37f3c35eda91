// ── Tag processor contract ──
//
// Schema validation marks declaration locations with a tag keyword. Each
// keyword routes its collected `TaggedItem`s to exactly one processor.
// The set of tags is closed: adding one means adding a `PostProcessTag`
// variant and a `TagProcessor` impl, and the compiler finds every match
// that needs the new case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{CoreError, PostProcessError};
use crate::model::Context;

/// Every post-processing tag keyword the pipeline understands.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum PostProcessTag {
    #[strum(serialize = "minVersion")]
    #[serde(rename = "minVersion")]
    MinVersion,
    #[strum(serialize = "node")]
    #[serde(rename = "node")]
    Node,
}

impl PostProcessTag {
    /// Keyword stamped on every record this tag produces.
    pub fn keyword(self) -> String {
        format!("f5PostProcess({self})")
    }
}

/// One location collected for a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedItem {
    /// JSON pointer from the declaration root to the matched value.
    pub instance_path: String,
    /// The annotation payload (`schemaData`) or the matched value itself,
    /// depending on the tag.
    #[serde(default, alias = "schemaData")]
    pub data: Value,
    /// The object holding the matched value.
    #[serde(default)]
    pub parent_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_data_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl TaggedItem {
    /// `class` of the enclosing object, or `""`.
    pub fn parent_class(&self) -> &str {
        self.parent_data
            .get("class")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Property name under `parent_data`, falling back to the last path segment.
    pub fn property(&self) -> &str {
        self.parent_data_property
            .as_deref()
            .or_else(|| self.instance_path.rsplit('/').next())
            .unwrap_or_default()
    }
}

/// A warning or error finding, as surfaced to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    pub data_path: String,
    pub keyword: String,
    pub params: Value,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(tag: PostProcessTag, data_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tenant: None,
            data_path: data_path.into(),
            keyword: tag.keyword(),
            params: Value::Object(serde_json::Map::new()),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: Option<String>) -> Self {
        self.tenant = tenant;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Successful processor result: zero or more non-fatal findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessOutput {
    pub warnings: Vec<ErrorRecord>,
}

/// The contract shared by every post-processing tag.
pub trait TagProcessor {
    const TAG: PostProcessTag;

    /// Applies this tag's transformation to `declaration` in place.
    ///
    /// - `Ok(None)` when `items` is absent: nothing was collected.
    /// - `Ok(Some(output))` with any warnings on success.
    /// - `Err` with every fatal finding across all items. Items are
    ///   independent: one failing item does not stop the others, and a
    ///   failing item leaves no partial mutation behind unless the
    ///   processor documents otherwise.
    fn process(
        &self,
        ctx: &mut Context,
        declaration: &mut Value,
        items: Option<&[TaggedItem]>,
        original: Option<&Value>,
    ) -> Result<Option<ProcessOutput>, PostProcessError>;
}

// ── Collected items, keyed by tag ───────────────────────────────────

/// Tagged items grouped per tag keyword, in collection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedItems(BTreeMap<PostProcessTag, Vec<TaggedItem>>);

impl TaggedItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses items gathered elsewhere: `{ "<tag keyword>": [<item>, ...] }`.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let keyed: BTreeMap<String, Vec<TaggedItem>> =
            serde_json::from_str(raw).map_err(|source| CoreError::Json {
                what: "tagged items".into(),
                source,
            })?;
        let mut items = Self::new();
        for (keyword, list) in keyed {
            let tag = keyword
                .parse::<PostProcessTag>()
                .map_err(|_| CoreError::UnknownTag(keyword.clone()))?;
            items.0.entry(tag).or_default().extend(list);
        }
        Ok(items)
    }

    pub fn push(&mut self, tag: PostProcessTag, item: TaggedItem) {
        self.0.entry(tag).or_default().push(item);
    }

    /// Items for `tag`, or `None` if the tag matched nothing.
    pub fn get(&self, tag: PostProcessTag) -> Option<&[TaggedItem]> {
        self.0.get(&tag).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn tags_round_trip_through_their_keywords() {
        for tag in PostProcessTag::iter() {
            assert_eq!(PostProcessTag::from_str(&tag.to_string()).unwrap(), tag);
        }
        assert_eq!(PostProcessTag::MinVersion.keyword(), "f5PostProcess(minVersion)");
        assert!(PostProcessTag::from_str("pointer").is_err());
    }

    #[test]
    fn tagged_item_accepts_wire_names() {
        let item: TaggedItem = serde_json::from_value(json!({
            "instancePath": "/T/A/widget/prop",
            "schemaData": "14.1",
            "parentData": { "class": "Widget" },
            "parentDataProperty": "prop"
        }))
        .unwrap();
        assert_eq!(item.data, json!("14.1"));
        assert_eq!(item.parent_class(), "Widget");
        assert_eq!(item.property(), "prop");
    }

    #[test]
    fn property_falls_back_to_last_segment() {
        let item = TaggedItem {
            instance_path: "/T/A/widget/other".into(),
            data: Value::Null,
            parent_data: Value::Null,
            parent_data_property: None,
            tenant: None,
        };
        assert_eq!(item.property(), "other");
        assert_eq!(item.parent_class(), "");
    }

    #[test]
    fn error_record_serializes_camel_case() {
        let record = ErrorRecord::new(PostProcessTag::Node, "/T/A/p/members", "bad")
            .with_tenant(Some("T".into()));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "tenant": "T",
                "dataPath": "/T/A/p/members",
                "keyword": "f5PostProcess(node)",
                "params": {},
                "message": "bad"
            })
        );
    }

    #[test]
    fn tagged_items_group_by_tag() {
        let mut items = TaggedItems::new();
        assert!(items.get(PostProcessTag::Node).is_none());
        items.push(
            PostProcessTag::Node,
            TaggedItem {
                instance_path: "/T/A/p/members".into(),
                data: json!([]),
                parent_data: json!({}),
                parent_data_property: Some("members".into()),
                tenant: Some("T".into()),
            },
        );
        assert_eq!(items.get(PostProcessTag::Node).unwrap().len(), 1);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn tagged_items_parse_from_keyed_json() {
        let items = TaggedItems::from_json(
            r#"{ "minVersion": [{ "instancePath": "/T/A/w/p", "schemaData": "14.1" }] }"#,
        )
        .unwrap();
        assert_eq!(items.get(PostProcessTag::MinVersion).unwrap()[0].data, json!("14.1"));

        let err = TaggedItems::from_json(r#"{ "pointer": [] }"#).unwrap_err();
        assert!(matches!(err, CoreError::UnknownTag(ref k) if k == "pointer"));
    }
}
