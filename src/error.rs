use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("{url} answered with '{content_type}' instead of JSON: {body}")]
    NotJson { url: String, content_type: String, body: String },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Malformed envelope: expected a JSON object, got {0}")]
    MalformedEnvelope(String),

    #[error("Unrecognized envelope shape: {0}")]
    UnrecognizedShape(String),

    #[error("CMS error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Authenticated request attempted without a token")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, CmsError>;

/// Short label for a JSON value's kind, used in error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
