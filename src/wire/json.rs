//! JSON rendering of field trees.
//!
//! Field numbers become object keys. A field seen once renders as its value,
//! a repeated field as an array. Length-delimited values render as a nested
//! object when the bytes parse completely as a message, else as text when
//! they are UTF-8, else as `{"_bytes": n, "_hex": "..."}`.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::tree::FieldTree;
use super::value::WireValue;
use crate::binary::to_hex;

/// Nesting depth used when a tree is serialized directly.
pub const DEFAULT_RENDER_DEPTH: usize = 32;

/// Renders a tree as a JSON value, descending at most `max_depth` levels
/// into nested messages.
#[must_use]
pub fn to_json(tree: &FieldTree<'_>, max_depth: usize) -> Value {
    render_tree(tree, 0, max_depth)
}

fn render_tree(tree: &FieldTree<'_>, depth: usize, max_depth: usize) -> Value {
    let mut map = Map::with_capacity(tree.len());
    for (field, values) in tree.iter() {
        let rendered = match values {
            [single] => render_value(single, depth, max_depth),
            many => Value::Array(
                many.iter()
                    .map(|v| render_value(v, depth, max_depth))
                    .collect(),
            ),
        };
        map.insert(field.to_string(), rendered);
    }
    Value::Object(map)
}

fn render_value(value: &WireValue<'_>, depth: usize, max_depth: usize) -> Value {
    match value {
        WireValue::Varint(v) | WireValue::Fixed64(v) => json!(v),
        WireValue::Fixed32(v) => json!(v),
        WireValue::LengthDelimited(bytes) => {
            if bytes.is_empty() {
                return Value::String(String::new());
            }
            if depth < max_depth {
                if let Ok(nested) = FieldTree::parse(bytes) {
                    return render_tree(&nested, depth + 1, max_depth);
                }
            }
            match std::str::from_utf8(bytes) {
                Ok(text) => Value::String(text.to_owned()),
                Err(_) => json!({ "_bytes": bytes.len(), "_hex": to_hex(bytes) }),
            }
        }
    }
}

impl Serialize for FieldTree<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json(self, DEFAULT_RENDER_DEPTH).serialize(serializer)
    }
}
