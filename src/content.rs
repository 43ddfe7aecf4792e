use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::normalize::NormalizedMedia;

/// REST path of the biographies collection.
pub const BIOGRAPHIES: &str = "biographies";

/// Reference to a related entry, as left on a relation field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRef {
    pub id: Option<i64>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// A biography as the site renders it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Biography {
    pub id: Option<i64>,
    #[serde(default)]
    pub document_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub era: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub image: Option<NormalizedMedia>,
    #[serde(default)]
    pub category: Option<EntryRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<EntryRef>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
