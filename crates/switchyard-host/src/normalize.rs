//! Turns raw service records into presentation-ready string records.
//!
//! A raw record is a JSON object. Each attribute is either a plain value or
//! a text node, an object whose only key is `text`. Absent attributes and
//! attributes whose value is falsy (`null`, `false`, `0`, `""`, empty
//! containers, text nodes with falsy text) never reach the rendered record.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::FieldSchema;

pub const ITEM_PATH: &str = "item";
const TEXT_KEY: &str = "text";

/// Field name to non-empty UTF-8 text, in schema order.
pub type RenderRecord = IndexMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("expected a record object, found {found}")]
    NotARecord { found: &'static str },
    #[error("expected a list under `item`, found {found}")]
    MalformedCollection { found: &'static str },
}

/// A declared field as found in a raw record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Plain(&'a Value),
    TextNode { node: &'a Value, text: &'a Value },
}

impl<'a> FieldValue<'a> {
    fn classify(value: &'a Value) -> Self {
        match text_of(value) {
            Some(text) => FieldValue::TextNode { node: value, text },
            None => FieldValue::Plain(value),
        }
    }

    /// Unwraps a text node; a falsy payload falls back to the node itself.
    pub fn resolve(self) -> &'a Value {
        match self {
            FieldValue::Plain(value) => value,
            FieldValue::TextNode { node, text } => {
                if is_truthy(text) {
                    text
                } else {
                    node
                }
            }
        }
    }
}

pub fn lookup<'a>(record: &'a Map<String, Value>, name: &str) -> Option<FieldValue<'a>> {
    record.get(name).map(FieldValue::classify)
}

fn text_of(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get(TEXT_KEY),
        _ => None,
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => match text_of(value) {
            Some(text) => is_truthy(text),
            None => !map.is_empty(),
        },
    }
}

/// Text form of a resolved value: strings verbatim, scalars via their JSON
/// text, containers as compact JSON.
pub fn encode_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => match text_of(other) {
            Some(text) => encode_text(text),
            None => other.to_string(),
        },
    }
}

pub fn normalize_one(
    schema: &FieldSchema,
    raw_item: &Value,
) -> Result<RenderRecord, NormalizeError> {
    let record = raw_item.as_object().ok_or(NormalizeError::NotARecord {
        found: kind_of(raw_item),
    })?;
    let mut rendered = RenderRecord::new();
    for name in schema.output_names() {
        let Some(field) = lookup(record, name) else {
            continue;
        };
        let value = field.resolve();
        if !is_truthy(value) {
            continue;
        }
        rendered.insert(name.to_string(), encode_text(value));
    }
    Ok(rendered)
}

pub fn normalize_many(
    schema: &FieldSchema,
    raw_collection: &Value,
) -> Result<Vec<RenderRecord>, NormalizeError> {
    collection_items(raw_collection)?
        .into_iter()
        .map(|item| normalize_one(schema, item))
        .collect()
}

/// Elements under `item`, in source order. A missing or `null` path is an
/// empty collection and a lone record counts as one element.
pub fn collection_items(raw_collection: &Value) -> Result<Vec<&Value>, NormalizeError> {
    let items = match raw_collection {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map.get(ITEM_PATH),
        other => {
            return Err(NormalizeError::MalformedCollection {
                found: kind_of(other),
            });
        }
    };
    match items {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.iter().collect()),
        Some(item @ Value::Object(_)) => Ok(vec![item]),
        Some(other) => Err(NormalizeError::MalformedCollection {
            found: kind_of(other),
        }),
    }
}

/// Copy used by create/edit responses: a falsy field becomes `null`
/// instead of being dropped.
pub fn copy_field(data: &Value, name: &str) -> Value {
    let Some(field) = data.as_object().and_then(|record| lookup(record, name)) else {
        return Value::Null;
    };
    let value = field.resolve();
    if is_truthy(value) {
        Value::String(encode_text(value))
    } else {
        Value::Null
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
