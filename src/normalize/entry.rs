use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::media::NormalizedMedia;
use crate::error::Result;

/// A content entry with every `attributes`/`data` wrapper removed.
///
/// Serializes as one flat object: `id`, `documentId` (null when the CMS did
/// not send one), then the entry's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEntry {
    pub id: Option<i64>,
    #[serde(rename = "documentId")]
    pub document_id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NormalizedEntry {
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// The upload stored under `key`, if that field holds a single media object.
    pub fn media(&self, key: &str) -> Option<NormalizedMedia> {
        self.fields
            .get(key)
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Deserializes the flattened entry into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::from(self.clone()))?)
    }
}

impl From<NormalizedEntry> for Value {
    fn from(entry: NormalizedEntry) -> Self {
        let mut out = Map::new();
        out.insert("id".to_string(), entry.id.map_or(Value::Null, Value::from));
        out.insert(
            "documentId".to_string(),
            entry.document_id.map_or(Value::Null, Value::from),
        );
        out.extend(entry.fields);
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> NormalizedEntry {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!("Ada Lovelace"));
        fields.insert(
            "portrait".to_string(),
            json!({
                "id": 2,
                "url": "https://cms.example/uploads/ada.png",
                "alternativeText": "",
                "caption": null,
                "width": null,
                "height": null,
                "formats": null
            }),
        );
        NormalizedEntry {
            id: Some(7),
            document_id: None,
            fields,
        }
    }

    #[test]
    fn value_form_is_flat_with_null_document_id() {
        let value = Value::from(sample());
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["documentId"], Value::Null);
        assert_eq!(value["name"], json!("Ada Lovelace"));
        assert_eq!(value, serde_json::to_value(sample()).unwrap());
    }

    #[test]
    fn accessors_read_fields() {
        let entry = sample();
        assert_eq!(entry.str_field("name"), Some("Ada Lovelace"));
        assert_eq!(entry.str_field("portrait"), None);
        let media = entry.media("portrait").unwrap();
        assert_eq!(media.id, Some(2));
        assert!(entry.media("name").is_none());
    }

    #[test]
    fn deserializes_from_flat_json() {
        let entry: NormalizedEntry =
            serde_json::from_value(json!({ "id": 3, "documentId": "x1", "name": "B" })).unwrap();
        assert_eq!(entry.document_id(), Some("x1"));
        assert_eq!(entry.fields.len(), 1);
    }
}
