// ── Deep structural helpers ──
//
// Safe get/set/copy over declaration trees. Everything works on the one
// `serde_json::Value` tagged union, so a path that runs into an unexpected
// shape is reported instead of silently ignored. Two path syntaxes exist:
// delimited paths ("tenant.app.pool.members.0") and JSON pointers
// ("/tenant/app/pool/members/0") as produced for tagged items.

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

// ── Delimited paths ─────────────────────────────────────────────────

/// Reads a nested value by a delimited path. Missing segments yield `None`.
pub fn get_deep<'a>(root: &'a Value, path: &str, delimiter: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    get_deep_segments(root, path.split(delimiter))
}

/// Reads a nested value by pre-split segments.
pub fn get_deep_segments<'a, I, S>(root: &'a Value, segments: I) -> Option<&'a Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .try_fold(root, |node, segment| child(node, segment.as_ref()))
}

/// Writes `value` at a dot-delimited path, creating intermediate containers.
///
/// A created container is an array when the segment that will index into
/// it is a non-negative integer literal, and an object otherwise. Arrays
/// grow with `null` padding when indexed past their end.
pub fn set_deep(root: &mut Value, dot_path: &str, value: Value) -> Result<(), CoreError> {
    let segments: Vec<&str> = dot_path.split('.').collect();
    set_segments(root, &segments, value).map_err(|reason| CoreError::invalid_path(dot_path, reason))
}

/// Structural copy of anything serializable.
///
/// Returns `None` when the value cannot be represented as JSON (a map with
/// non-string keys, a failing `Serialize` impl). `Value` trees cannot hold
/// cycles, so a self-referencing structure never reaches this point.
pub fn deep_copy<T: Serialize + ?Sized>(value: &T) -> Option<Value> {
    serde_json::to_value(value)
        .map_err(|err| tracing::debug!(error = %err, "value is not copyable"))
        .ok()
}

// ── JSON pointers ───────────────────────────────────────────────────

/// Splits a JSON pointer into unescaped segments. `""` is the root.
pub fn pointer_segments(pointer: &str) -> Result<Vec<String>, CoreError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer
        .strip_prefix('/')
        .ok_or_else(|| CoreError::invalid_path(pointer, "JSON pointer must start with '/'"))?;
    Ok(rest.split('/').map(unescape).collect())
}

/// Escapes one segment for inclusion in a JSON pointer.
pub fn pointer_escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Builds a JSON pointer from raw segments.
pub fn pointer_join<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|segment| format!("/{}", pointer_escape(segment.as_ref())))
        .collect()
}

pub fn pointer_get<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    root.pointer(pointer)
}

/// Sets (`Some`) or removes (`None`) the value at `pointer`.
///
/// Setting creates intermediate containers like [`set_deep`]; `-` as the
/// final segment appends to an array. Removing a path that does not exist
/// is not an error.
pub fn pointer_set(root: &mut Value, pointer: &str, value: Option<Value>) -> Result<(), CoreError> {
    let Some(value) = value else {
        pointer_remove(root, pointer);
        return Ok(());
    };
    let segments = pointer_segments(pointer)?;
    let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
    set_segments(root, &refs, value).map_err(|reason| CoreError::invalid_path(pointer, reason))
}

/// Removes and returns the value at `pointer`, if there was one.
///
/// Object keys keep their relative order; array elements after a removed
/// index shift down. The root itself cannot be removed.
pub fn pointer_remove(root: &mut Value, pointer: &str) -> Option<Value> {
    let segments = pointer_segments(pointer).ok()?;
    let (last, parents) = segments.split_last()?;
    let parent = parents
        .iter()
        .try_fold(root, |node, segment| child_mut(node, segment))?;
    match parent {
        Value::Object(map) => map.shift_remove(last.as_str()),
        Value::Array(items) => {
            let idx = parse_index(last).filter(|idx| *idx < items.len())?;
            Some(items.remove(idx))
        }
        _ => None,
    }
}

// ── Internals ───────────────────────────────────────────────────────

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Non-negative integer literal without leading zeros ("0", "7", "12").
fn parse_index(segment: &str) -> Option<usize> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment.len() == 1 || !segment.starts_with('0'));
    if canonical { segment.parse().ok() } else { None }
}

fn container_for(segment: &str) -> Value {
    if parse_index(segment).is_some() || segment == "-" {
        Value::Array(Vec::new())
    } else {
        Value::Object(serde_json::Map::new())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => parse_index(segment).and_then(|idx| items.get(idx)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => parse_index(segment).and_then(|idx| items.get_mut(idx)),
        _ => None,
    }
}

fn array_slot(items: &mut Vec<Value>, segment: &str) -> Result<usize, String> {
    let idx = if segment == "-" {
        items.len()
    } else {
        parse_index(segment).ok_or_else(|| format!("'{segment}' is not an array index"))?
    };
    if idx >= items.len() {
        items.resize(idx + 1, Value::Null);
    }
    Ok(idx)
}

fn set_segments(root: &mut Value, segments: &[&str], value: Value) -> Result<(), String> {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for (idx, segment) in parents.iter().enumerate() {
        let next = segments.get(idx + 1).copied().unwrap_or(*last);
        if node.is_null() {
            *node = container_for(segment);
        }
        node = match node {
            Value::Object(map) => map
                .entry((*segment).to_owned())
                .or_insert_with(|| container_for(next)),
            Value::Array(items) => {
                let slot = array_slot(items, segment)?;
                let entry = &mut items[slot];
                if entry.is_null() {
                    *entry = container_for(next);
                }
                entry
            }
            other => {
                return Err(format!("'{segment}' descends into a {} value", kind(other)));
            }
        };
    }

    if node.is_null() {
        *node = container_for(last);
    }
    match node {
        Value::Object(map) => {
            map.insert((*last).to_owned(), value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = array_slot(items, last)?;
            items[slot] = value;
            Ok(())
        }
        other => Err(format!("'{last}' descends into a {} value", kind(other))),
    }
}
