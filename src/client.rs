use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::CmsConfig;
use crate::content::{Biography, BIOGRAPHIES};
use crate::error::{CmsError, Result};
use crate::metrics;
use crate::normalize::{EntryPage, NormalizedEntry, NormalizedResult, Normalizer, NormalizerConfig, UpstreamError};
use crate::query::{ContentQuery, FilterOp};
use crate::transport::{CmsTransport, Method, ReqwestTransport, TransportRequest, TransportResponse};

/// Result of `POST /auth/local`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub jwt: String,
    #[serde(default)]
    pub user: Value,
}

/// Reads content from the CMS and hands back normalized entries.
pub struct CmsClient<T: CmsTransport = ReqwestTransport> {
    transport: T,
    config: CmsConfig,
    normalizer: Normalizer,
    token: Option<String>,
}

impl CmsClient<ReqwestTransport> {
    pub fn from_config(config: CmsConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: CmsTransport> CmsClient<T> {
    pub fn with_transport(config: CmsConfig, transport: T) -> Self {
        let normalizer = Normalizer::new(NormalizerConfig::from(&config));
        let token = config.api_token.clone();
        Self {
            transport,
            config,
            normalizer,
            token,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn config(&self) -> &CmsConfig {
        &self.config
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_root(), path.trim_start_matches('/'))
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let method = request.method.as_str();
        let started = Instant::now();
        let result = self.transport.send(request).await;
        metrics::requests::duration(started.elapsed().as_secs_f64());
        match &result {
            Ok(resp) if resp.is_success() => metrics::requests::success(method),
            _ => metrics::requests::error(method),
        }
        result
    }

    /// Parses the body as JSON. A body that fails to parse is reported by
    /// status first, then by content type (a proxy page served with 200),
    /// and only then as a JSON error.
    fn parse_body(url: &str, resp: TransportResponse) -> Result<Value> {
        let excerpt = || -> String { String::from_utf8_lossy(&resp.bytes).chars().take(200).collect() };
        match serde_json::from_slice::<Value>(&resp.bytes) {
            Ok(value) => Ok(value),
            Err(_) if !resp.is_success() => Err(CmsError::Status {
                status: resp.status,
                url: url.to_string(),
                body: excerpt(),
            }),
            Err(_) if !resp.content_type.contains("json") => Err(CmsError::NotJson {
                url: url.to_string(),
                content_type: resp.content_type.clone(),
                body: excerpt(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// GETs `path` and normalizes whatever envelope comes back.
    #[instrument(skip(self, query))]
    pub async fn fetch(&self, path: &str, query: &ContentQuery) -> Result<NormalizedResult> {
        let url = self.endpoint(path);
        let request = TransportRequest::get(url.clone(), query.to_pairs()).bearer(self.token());
        let resp = self.send(request).await?;
        let status = resp.status;
        let body = Self::parse_body(&url, resp)?;
        let result = self.normalizer.normalize_envelope(body)?;
        if let NormalizedResult::Upstream(err) = &result {
            warn!(status, upstream_status = err.status, message = %err.message, "CMS request failed");
        }
        Ok(result)
    }

    pub async fn list(&self, content_type: &str, query: &ContentQuery) -> Result<EntryPage> {
        let page = self.fetch(content_type, query).await?.into_page()?;
        info!(
            "Fetched {} {} (page {}/{}, total {})",
            page.entries.len(),
            content_type,
            page.page,
            page.total_pages,
            page.total
        );
        Ok(page)
    }

    /// One entry by numeric id or `documentId`.
    pub async fn get(&self, content_type: &str, id: &str) -> Result<NormalizedEntry> {
        let path = format!("{}/{}", content_type.trim_end_matches('/'), id);
        self.fetch(&path, &ContentQuery::new()).await?.into_entry()
    }

    /// A single type such as `homepage`.
    pub async fn single_type(&self, name: &str, query: &ContentQuery) -> Result<NormalizedEntry> {
        self.fetch(name, query).await?.into_entry()
    }

    pub async fn find_by_slug(&self, content_type: &str, slug: &str) -> Result<Option<NormalizedEntry>> {
        let query = ContentQuery::new().where_eq("slug", slug).page_size(1);
        let page = self.list(content_type, &query).await?;
        Ok(page.entries.into_iter().next())
    }

    /// Case-insensitive substring search on one field, on top of `query`.
    pub async fn search(
        &self,
        content_type: &str,
        field: &str,
        term: &str,
        query: &ContentQuery,
    ) -> Result<EntryPage> {
        let query = query.clone().filter(field, FilterOp::ContainsI, term);
        self.list(content_type, &query).await
    }

    pub async fn biographies(&self, query: &ContentQuery) -> Result<Vec<Biography>> {
        self.list(BIOGRAPHIES, query)
            .await?
            .entries
            .iter()
            .map(NormalizedEntry::decode::<Biography>)
            .collect()
    }

    /// Exchanges credentials for a JWT, which subsequent requests then carry.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<AuthSession> {
        let url = self.endpoint("auth/local");
        let body = json!({ "identifier": identifier, "password": password });
        let resp = self
            .send(TransportRequest::with_body(Method::Post, url.clone(), body))
            .await?;
        let body = Self::parse_body(&url, resp)?;
        if let Some(err) = UpstreamError::from_envelope(&body) {
            return Err(err.into());
        }
        let session: AuthSession = serde_json::from_value(body)?;
        self.token = Some(session.jwt.clone());
        info!("Authenticated against CMS");
        Ok(session)
    }

    async fn write(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let token = self.token().ok_or(CmsError::Unauthenticated)?;
        let url = self.endpoint(path);
        let request = match body {
            Some(data) => TransportRequest::with_body(method, url.clone(), json!({ "data": data })),
            None => TransportRequest {
                method,
                url: url.clone(),
                query: Vec::new(),
                bearer: None,
                body: None,
            },
        }
        .bearer(Some(token));

        let resp = self.send(request).await?;
        if resp.is_success() && (resp.status == 204 || resp.bytes.is_empty()) {
            debug!("{} {} returned no body", method.as_str(), path);
            return Ok(Value::Null);
        }
        let body = Self::parse_body(&url, resp)?;
        if let Some(err) = UpstreamError::from_envelope(&body) {
            return Err(err.into());
        }
        Ok(body)
    }

    /// Creates an entry; `data` is wrapped as `{ "data": … }`. The response
    /// body is returned as received.
    pub async fn create(&self, content_type: &str, data: Value) -> Result<Value> {
        self.write(Method::Post, content_type, Some(data)).await
    }

    pub async fn update(&self, content_type: &str, id: &str, data: Value) -> Result<Value> {
        let path = format!("{}/{}", content_type.trim_end_matches('/'), id);
        self.write(Method::Put, &path, Some(data)).await
    }

    pub async fn delete(&self, content_type: &str, id: &str) -> Result<Value> {
        let path = format!("{}/{}", content_type.trim_end_matches('/'), id);
        self.write(Method::Delete, &path, None).await
    }
}
