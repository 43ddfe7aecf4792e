//! Turns CMS response envelopes into flat, wrapper-free entries regardless of
//! which response convention produced them.
//!
//! Everything here is pure and synchronous; one `Normalizer` can be shared
//! across any number of in-flight requests.

pub mod entry;
pub mod envelope;
pub mod media;
pub mod shape;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{CmsConfig, ShapePolicy, DEFAULT_PAGE_SIZE};
use crate::error::{json_kind, CmsError, Result};
use crate::metrics;

pub use entry::NormalizedEntry;
pub use envelope::{EntryPage, NormalizedResult, UpstreamError};
pub use media::{MediaFormats, MediaResolver, NormalizedMedia, RawMedia};

use envelope::RawPagination;
use shape::{FieldShape, RawItem, Target};

/// How many levels of relations are expanded into full entries.
///
/// Content types reference each other (a biography's category lists
/// biographies), so expansion stops here. Entries found below this depth
/// are passed through: their fields are copied rather than split into
/// attributes and relations, with only uploads resolved and `{ data: … }`
/// wrappers lifted.
pub const RELATION_FLATTEN_DEPTH: usize = 1;

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub base_url: String,
    pub default_page_size: u32,
    pub shape_policy: ShapePolicy,
}

impl NormalizerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_page_size: DEFAULT_PAGE_SIZE,
            shape_policy: ShapePolicy::Lenient,
        }
    }
}

impl From<&CmsConfig> for NormalizerConfig {
    fn from(config: &CmsConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            default_page_size: config.default_page_size,
            shape_policy: config.shape_policy,
        }
    }
}

/// Which fields of an entry a flattening pass emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Select {
    Attributes,
    Relations,
    All,
}

impl Select {
    fn admits(self, shape: &FieldShape) -> bool {
        match self {
            Select::All => true,
            Select::Attributes => !shape.is_relation(),
            Select::Relations => shape.is_relation(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    media: MediaResolver,
    default_page_size: u32,
    shape_policy: ShapePolicy,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            media: MediaResolver::from_base_url(&config.base_url),
            default_page_size: config.default_page_size,
            shape_policy: config.shape_policy,
        }
    }

    /// Normalizes a parsed response body.
    ///
    /// An `error` envelope wins over any `data` alongside it. Envelopes whose
    /// `data` is neither an object nor an array are handed back unchanged
    /// under `ShapePolicy::Lenient` and rejected under `ShapePolicy::Strict`.
    pub fn normalize_envelope(&self, raw: Value) -> Result<NormalizedResult> {
        if !raw.is_object() {
            metrics::normalize::malformed();
            return Err(CmsError::MalformedEnvelope(json_kind(&raw).to_string()));
        }

        if let Some(err) = UpstreamError::from_envelope(&raw) {
            metrics::requests::upstream_error(err.status);
            debug!(status = err.status, message = %err.message, "CMS returned an error envelope");
            return Ok(NormalizedResult::Upstream(err));
        }

        match raw.get("data") {
            Some(item @ Value::Object(_)) => {
                let entry = self.normalize_item(item).ok_or_else(|| {
                    CmsError::UnrecognizedShape("data object did not normalize".to_string())
                })?;
                metrics::normalize::entries(1);
                Ok(NormalizedResult::Single(entry))
            }
            Some(Value::Array(items)) => Ok(NormalizedResult::List(self.normalize_list(items, &raw))),
            other => {
                let kind = other.map_or("missing", json_kind);
                match self.shape_policy {
                    ShapePolicy::Lenient => {
                        warn!(data = kind, "Envelope data is neither object nor array, passing through");
                        metrics::normalize::passthrough();
                        Ok(NormalizedResult::Passthrough(raw))
                    }
                    ShapePolicy::Strict => Err(CmsError::UnrecognizedShape(format!(
                        "envelope data was {}",
                        kind
                    ))),
                }
            }
        }
    }

    fn normalize_list(&self, items: &[Value], raw: &Value) -> EntryPage {
        let entries: Vec<NormalizedEntry> = items.iter().filter_map(|item| self.normalize_item(item)).collect();
        if entries.len() != items.len() {
            debug!(
                skipped = items.len() - entries.len(),
                "Skipped non-object elements in collection envelope"
            );
        }
        metrics::normalize::entries(entries.len());

        let pagination = RawPagination::from_envelope(raw);
        EntryPage {
            entries,
            page: pagination.page.unwrap_or(1),
            page_size: pagination.page_size.unwrap_or(self.default_page_size),
            total_pages: pagination.page_count.unwrap_or(1),
            total: pagination.total.unwrap_or(items.len() as u64),
        }
    }

    /// Flattens one entry. `None` for `null` or any other non-object input.
    pub fn normalize_item(&self, item: &Value) -> Option<NormalizedEntry> {
        let obj = item.as_object()?;
        let raw = RawItem::from_object(obj);

        let mut fields = self.flatten_attributes(&raw.attrs);
        fields.extend(self.extract_relations(item));

        Some(NormalizedEntry {
            id: raw.id,
            document_id: raw.document_id,
            fields,
        })
    }

    /// Every non-relation field of `attrs`: scalars and plain data as-is,
    /// uploads as `NormalizedMedia`, `{ data: null }` as `null`, timestamps
    /// verbatim, `localizations` dropped.
    pub fn flatten_attributes(&self, attrs: &Map<String, Value>) -> Map<String, Value> {
        self.flatten(attrs, 0, Select::Attributes)
    }

    /// The relation fields of `item`, each expanded to
    /// `{ id, documentId?, …fields }`. Relations of those related entries are
    /// not expanded further (see `RELATION_FLATTEN_DEPTH`).
    pub fn extract_relations(&self, item: &Value) -> Map<String, Value> {
        match item.as_object() {
            Some(obj) => self.flatten(&RawItem::from_object(obj).attrs, 0, Select::Relations),
            None => Map::new(),
        }
    }

    fn flatten(&self, attrs: &Map<String, Value>, depth: usize, select: Select) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in attrs {
            let shape = shape::classify(key, value);
            if !select.admits(&shape) {
                continue;
            }
            let flattened = match shape {
                FieldShape::Dropped => continue,
                FieldShape::Verbatim(v) => v,
                FieldShape::Null => Value::Null,
                FieldShape::One(target) => self.resolve_target(target, depth),
                FieldShape::Many(targets) => Value::Array(
                    targets
                        .into_iter()
                        .map(|t| self.resolve_target(t, depth))
                        .collect(),
                ),
            };
            out.insert(key.clone(), flattened);
        }
        out
    }

    fn resolve_target(&self, target: Target, depth: usize) -> Value {
        match target {
            Target::Media(media) => self.media.transform_media(media).into(),
            Target::Entry(item) => self.relation(item, depth),
            Target::Plain(value) => value,
        }
    }

    fn relation(&self, item: RawItem, depth: usize) -> Value {
        let mut out = Self::reference(&item);
        if depth < RELATION_FLATTEN_DEPTH {
            out.extend(self.flatten(&item.attrs, depth + 1, Select::All));
        } else {
            out.extend(self.pass_through(&item.attrs));
        }
        Value::Object(out)
    }

    fn reference(item: &RawItem) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("id".to_string(), item.id.map_or(Value::Null, Value::from));
        if let Some(document_id) = &item.document_id {
            out.insert("documentId".to_string(), Value::String(document_id.clone()));
        }
        out
    }

    /// Fields of an entry below the depth bound. Uploads are resolved and
    /// `{ data: … }` wrappers lifted to `{ id, documentId?, …fields }`; the
    /// fields of those entries are copied as they arrived.
    fn pass_through(&self, attrs: &Map<String, Value>) -> Map<String, Value> {
        let lift = |target: Target| -> Value {
            match target {
                Target::Media(media) => self.media.transform_media(media).into(),
                Target::Entry(item) => {
                    let mut out = Self::reference(&item);
                    out.extend(item.attrs);
                    Value::Object(out)
                }
                Target::Plain(value) => value,
            }
        };

        let mut out = Map::new();
        for (key, value) in attrs {
            let passed = match shape::classify(key, value) {
                FieldShape::Dropped => continue,
                FieldShape::Verbatim(v) => v,
                FieldShape::Null => Value::Null,
                FieldShape::One(target) => lift(target),
                FieldShape::Many(targets) => Value::Array(targets.into_iter().map(&lift).collect()),
            };
            out.insert(key.clone(), passed);
        }
        out
    }
}
