use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Upload as the CMS sends it. Only `url` is required; an optional field of
/// the wrong type reads as absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMedia {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    pub url: String,
    #[serde(default, deserialize_with = "lenient")]
    pub alternative_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "dimension")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "dimension")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub formats: Option<RawFormats>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Pixel sizes sometimes arrive as floats (`800.0`).
fn dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let size = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    });
    Ok(size.and_then(|s| u32::try_from(s).ok()))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFormats {
    pub thumbnail: Option<FormatRef>,
    pub small: Option<FormatRef>,
    pub medium: Option<FormatRef>,
    pub large: Option<FormatRef>,
}

/// A responsive variant: an asset object from the CMS, or a bare URL once
/// it has been through normalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormatRef {
    Url(String),
    Asset { url: String },
}

impl FormatRef {
    fn url(&self) -> &str {
        match self {
            FormatRef::Url(url) => url,
            FormatRef::Asset { url } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMedia {
    pub id: Option<i64>,
    pub url: String,
    pub alternative_text: String,
    pub caption: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub formats: Option<MediaFormats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFormats {
    pub thumbnail: Option<String>,
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

impl From<NormalizedMedia> for Value {
    fn from(media: NormalizedMedia) -> Self {
        let formats = match media.formats {
            Some(f) => json!({
                "thumbnail": f.thumbnail,
                "small": f.small,
                "medium": f.medium,
                "large": f.large,
            }),
            None => Value::Null,
        };
        json!({
            "id": media.id,
            "url": media.url,
            "alternativeText": media.alternative_text,
            "caption": media.caption,
            "width": media.width,
            "height": media.height,
            "formats": formats,
        })
    }
}

/// Rewrites upload URLs against the CMS origin.
///
/// Uploads are served from the CMS root rather than the `/api` namespace, so
/// the configured API base is stripped of a trailing `/api` segment once, up
/// front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResolver {
    media_base: String,
}

impl MediaResolver {
    pub fn from_base_url(base_url: &str) -> Self {
        let trimmed = base_url.trim_end_matches('/');
        let root = trimmed.strip_suffix("/api").unwrap_or(trimmed);
        Self {
            media_base: root.trim_end_matches('/').to_string(),
        }
    }

    pub fn media_base(&self) -> &str {
        &self.media_base
    }

    pub fn is_absolute(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
    }

    pub fn resolve_media_url(&self, url: &str) -> String {
        if Self::is_absolute(url) {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.media_base, url)
        } else {
            format!("{}/{}", self.media_base, url)
        }
    }

    pub fn transform_media(&self, media: RawMedia) -> NormalizedMedia {
        let formats = media.formats.map(|f| MediaFormats {
            thumbnail: f.thumbnail.map(|r| self.resolve_media_url(r.url())),
            small: f.small.map(|r| self.resolve_media_url(r.url())),
            medium: f.medium.map(|r| self.resolve_media_url(r.url())),
            large: f.large.map(|r| self.resolve_media_url(r.url())),
        });

        NormalizedMedia {
            id: media.id,
            url: self.resolve_media_url(&media.url),
            alternative_text: media.alternative_text.or(media.name).unwrap_or_default(),
            caption: media.caption,
            width: media.width,
            height: media.height,
            formats,
        }
    }
}
