pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod query;
pub mod transport;

pub use client::{AuthSession, CmsClient};
pub use config::{CmsConfig, ShapePolicy};
pub use error::{CmsError, Result};
pub use normalize::{
    EntryPage, NormalizedEntry, NormalizedMedia, NormalizedResult, Normalizer, NormalizerConfig,
    UpstreamError, RELATION_FLATTEN_DEPTH,
};
pub use query::ContentQuery;
