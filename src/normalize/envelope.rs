use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entry::NormalizedEntry;
use crate::error::{CmsError, Result};

pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";
pub const FALLBACK_ERROR_STATUS: u16 = 500;

/// The CMS answered with an `error` envelope. Serializes as
/// `{ "error": true, "message": …, "status": … }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub message: String,
    pub status: u16,
}

impl UpstreamError {
    /// Reads `error.message` / `error.status`, falling back for whatever is
    /// missing or mistyped.
    pub fn from_error_value(error: &Value) -> Self {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(FALLBACK_ERROR_MESSAGE)
            .to_string();
        let status = error
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(FALLBACK_ERROR_STATUS);
        Self { message, status }
    }

    /// `Some` when `body` carries a non-null `error` key.
    pub fn from_envelope(body: &Value) -> Option<Self> {
        body.get("error")
            .filter(|e| !e.is_null())
            .map(Self::from_error_value)
    }
}

impl Serialize for UpstreamError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UpstreamError", 3)?;
        state.serialize_field("error", &true)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("status", &self.status)?;
        state.end()
    }
}

impl From<UpstreamError> for CmsError {
    fn from(err: UpstreamError) -> Self {
        CmsError::Upstream {
            status: err.status,
            message: err.message,
        }
    }
}

/// One page of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPage {
    pub entries: Vec<NormalizedEntry>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl EntryPage {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// `meta.pagination` as the CMS sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPagination {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub page_count: Option<u32>,
    pub total: Option<u64>,
}

impl RawPagination {
    /// Missing or undecodable pagination is treated as absent.
    pub fn from_envelope(body: &Value) -> Self {
        body.get("meta")
            .and_then(|m| m.get("pagination"))
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedResult {
    Upstream(UpstreamError),
    Single(NormalizedEntry),
    List(EntryPage),
    /// An envelope whose `data` was neither an object nor an array, returned
    /// as received.
    Passthrough(Value),
}

impl NormalizedResult {
    pub fn into_page(self) -> Result<EntryPage> {
        match self {
            NormalizedResult::List(page) => Ok(page),
            NormalizedResult::Upstream(err) => Err(err.into()),
            NormalizedResult::Single(_) => Err(CmsError::UnrecognizedShape(
                "expected a collection, got a single entry".to_string(),
            )),
            NormalizedResult::Passthrough(raw) => Err(unexpected(&raw, "a collection")),
        }
    }

    pub fn into_entry(self) -> Result<NormalizedEntry> {
        match self {
            NormalizedResult::Single(entry) => Ok(entry),
            NormalizedResult::Upstream(err) => Err(err.into()),
            NormalizedResult::List(_) => Err(CmsError::UnrecognizedShape(
                "expected a single entry, got a collection".to_string(),
            )),
            NormalizedResult::Passthrough(raw) if raw.get("data").map_or(false, Value::is_null) => {
                Err(CmsError::NotFound("entry".to_string()))
            }
            NormalizedResult::Passthrough(raw) => Err(unexpected(&raw, "a single entry")),
        }
    }
}

fn unexpected(raw: &Value, wanted: &str) -> CmsError {
    let data = raw.get("data").map_or("missing", crate::error::json_kind);
    CmsError::UnrecognizedShape(format!("expected {}, envelope data was {}", wanted, data))
}
