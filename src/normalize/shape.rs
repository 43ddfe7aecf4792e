//! Decodes raw field values into one unambiguous variant before any
//! flattening happens.
//!
//! The CMS does not tag field types in its payloads and has shipped two
//! response conventions: nested `attributes` with `{ data: … }` wrapped
//! relations, and flattened fields with relations inlined. Each value is run
//! through a fixed chain of decoders; a candidate that fails strict decoding
//! falls through to the next one and finally to a plain value.

use serde_json::{Map, Value};

use super::media::RawMedia;

/// Copied verbatim even when object-shaped.
pub const TIMESTAMP_FIELDS: [&str; 3] = ["createdAt", "updatedAt", "publishedAt"];

/// Locale variants are fetched per-locale instead of carried on the entry.
pub const LOCALIZATIONS_FIELD: &str = "localizations";

/// A content entry in either convention.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub id: Option<i64>,
    pub document_id: Option<String>,
    /// Fields with the `attributes` wrapper (if any) removed. Never holds
    /// `id` or `documentId`.
    pub attrs: Map<String, Value>,
}

impl RawItem {
    /// Reads an entry object, taking fields from `attributes` when that
    /// wrapper is present and from the object itself otherwise.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let nested = obj.get("attributes").and_then(Value::as_object);
        let document_id = obj
            .get("documentId")
            .and_then(Value::as_str)
            .or_else(|| nested.and_then(|a| a.get("documentId")).and_then(Value::as_str))
            .map(str::to_string);

        let mut attrs = nested.unwrap_or(obj).clone();
        attrs.remove("id");
        attrs.remove("documentId");

        Self {
            id: obj.get("id").and_then(Value::as_i64),
            document_id,
            attrs,
        }
    }

    /// Strict form: only objects carrying an integer `id` are entries.
    pub fn decode(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        obj.get("id").and_then(Value::as_i64)?;
        Some(Self::from_object(obj))
    }

    /// Decodes the entry as an upload when its fields carry a string `url`.
    fn as_media(&self) -> Option<RawMedia> {
        if !self.attrs.get("url").map_or(false, Value::is_string) {
            return None;
        }
        let mut fields = self.attrs.clone();
        if let Some(id) = self.id {
            fields.insert("id".to_string(), Value::from(id));
        }
        serde_json::from_value(Value::Object(fields)).ok()
    }
}

/// What a single relation slot points at.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Media(RawMedia),
    Entry(RawItem),
    /// A list element that decoded as neither.
    Plain(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// Timestamps and plain structured data.
    Verbatim(Value),
    Dropped,
    /// `{ data: null }`.
    Null,
    One(Target),
    Many(Vec<Target>),
}

impl FieldShape {
    /// Whether the field references other content entries, as opposed to
    /// uploads or plain data.
    pub fn is_relation(&self) -> bool {
        match self {
            FieldShape::One(Target::Entry(_)) => true,
            FieldShape::Many(targets) => targets.iter().any(|t| matches!(t, Target::Entry(_))),
            _ => false,
        }
    }
}

pub fn classify(key: &str, value: &Value) -> FieldShape {
    if TIMESTAMP_FIELDS.contains(&key) {
        return FieldShape::Verbatim(value.clone());
    }
    if key == LOCALIZATIONS_FIELD {
        return FieldShape::Dropped;
    }

    match value {
        Value::Object(obj) => decode_wrapper(obj)
            .or_else(|| decode_inline_media(value).map(|m| FieldShape::One(Target::Media(m))))
            .or_else(|| RawItem::decode(value).map(|item| FieldShape::One(Target::Entry(item))))
            .unwrap_or_else(|| FieldShape::Verbatim(value.clone())),
        Value::Array(items) => {
            decode_inline_list(items).unwrap_or_else(|| FieldShape::Verbatim(value.clone()))
        }
        _ => FieldShape::Verbatim(value.clone()),
    }
}

/// `{ data: … }`, optionally with `meta`, and nothing else. Object and
/// array payloads are always unwrapped.
fn decode_wrapper(obj: &Map<String, Value>) -> Option<FieldShape> {
    let data = obj.get("data")?;
    if !obj.keys().all(|k| k == "data" || k == "meta") {
        return None;
    }
    match data {
        Value::Null => Some(FieldShape::Null),
        Value::Object(_) => Some(FieldShape::One(decode_wrapped_target(data))),
        Value::Array(items) => Some(FieldShape::Many(items.iter().map(decode_wrapped_target).collect())),
        _ => None,
    }
}

/// Uploads are told apart by `url`; any other object is an entry, with a
/// `null` id when it carries none.
fn decode_wrapped_target(value: &Value) -> Target {
    let Some(obj) = value.as_object() else {
        return Target::Plain(value.clone());
    };
    let item = RawItem::from_object(obj);
    match item.as_media() {
        Some(media) => Target::Media(media),
        None => Target::Entry(item),
    }
}

fn decode_inline_media(value: &Value) -> Option<RawMedia> {
    let obj = value.as_object()?;
    if !obj.contains_key("url") && !obj.get("attributes").map_or(false, |a| a.get("url").is_some()) {
        return None;
    }
    RawItem::from_object(obj).as_media()
}

/// An array is a media list when its first element carries `url`, and a
/// relation list when every element is an entry.
fn decode_inline_list(items: &[Value]) -> Option<FieldShape> {
    let first = items.first()?.as_object()?;
    if first.contains_key("url") {
        let targets = items
            .iter()
            .map(|v| match decode_inline_media(v) {
                Some(media) => Target::Media(media),
                None => Target::Plain(v.clone()),
            })
            .collect();
        return Some(FieldShape::Many(targets));
    }
    items
        .iter()
        .map(|v| RawItem::decode(v).map(Target::Entry))
        .collect::<Option<Vec<_>>>()
        .map(FieldShape::Many)
}
