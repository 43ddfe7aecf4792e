use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use womencypedia_cms::query::{ContentQuery, SortOrder};
use womencypedia_cms::transport::{CmsTransport, Method, TransportRequest, TransportResponse};
use womencypedia_cms::{CmsClient, CmsConfig, CmsError, Result};

/// Replays canned responses and records every request it sees.
#[derive(Clone, Default)]
struct CannedTransport {
    responses: Arc<Mutex<VecDeque<TransportResponse>>>,
    seen: Arc<Mutex<Vec<TransportRequest>>>,
}

impl CannedTransport {
    fn respond(self, status: u16, body: Value) -> Self {
        self.respond_raw(status, body.to_string().into_bytes())
    }

    fn respond_raw(self, status: u16, bytes: Vec<u8>) -> Self {
        self.respond_typed(status, "application/json", bytes)
    }

    fn respond_typed(self, status: u16, content_type: &str, bytes: Vec<u8>) -> Self {
        self.responses.lock().unwrap().push_back(TransportResponse {
            status,
            content_type: content_type.to_string(),
            bytes,
        });
        self
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CmsTransport for CannedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.seen.lock().unwrap().push(request);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no canned response left"))
    }
}

fn client(transport: CannedTransport) -> CmsClient<CannedTransport> {
    CmsClient::with_transport(CmsConfig::with_base_url("https://cms.example/api/"), transport)
}

fn query_value<'a>(request: &'a TransportRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn list_builds_request_and_normalizes_page() {
    let transport = CannedTransport::default().respond(
        200,
        json!({
            "data": [
                { "id": 1, "attributes": { "name": "Ada", "portrait": { "data": { "id": 9, "attributes": { "url": "/uploads/ada.png" } } } } },
                { "id": 2, "attributes": { "name": "Hypatia", "portrait": { "data": null } } }
            ],
            "meta": { "pagination": { "page": 1, "pageSize": 2, "pageCount": 5, "total": 10 } }
        }),
    );
    let client = client(transport.clone());

    let query = ContentQuery::new().page(1).page_size(2).sort("name", SortOrder::Asc);
    let page = client.list("biographies", &query).await.unwrap();

    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.total_pages, 5);
    assert!(page.has_next());
    assert_eq!(
        page.entries[0].media("portrait").unwrap().url,
        "https://cms.example/uploads/ada.png"
    );
    assert_eq!(page.entries[1].get("portrait"), Some(&Value::Null));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Get);
    assert_eq!(requests[0].url, "https://cms.example/api/biographies");
    assert_eq!(query_value(&requests[0], "populate"), Some("*"));
    assert_eq!(query_value(&requests[0], "pagination[pageSize]"), Some("2"));
    assert_eq!(query_value(&requests[0], "sort[0]"), Some("name:asc"));
    assert_eq!(requests[0].bearer, None);
}

#[tokio::test]
async fn upstream_error_becomes_typed_error() {
    let transport = CannedTransport::default().respond(
        404,
        json!({ "data": null, "error": { "status": 404, "name": "NotFoundError", "message": "Not Found" } }),
    );
    let err = client(transport).get("biographies", "999").await.unwrap_err();
    match err {
        CmsError::Upstream { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn non_json_failure_is_a_status_error() {
    let transport = CannedTransport::default().respond_raw(502, b"<html>Bad Gateway</html>".to_vec());
    let err = client(transport)
        .list("biographies", &ContentQuery::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Status { status: 502, .. }));
}

#[tokio::test]
async fn html_served_with_success_status_is_reported_as_not_json() {
    let transport = CannedTransport::default().respond_typed(
        200,
        "text/html; charset=utf-8",
        b"<html>Maintenance</html>".to_vec(),
    );
    let err = client(transport)
        .list("biographies", &ContentQuery::new())
        .await
        .unwrap_err();
    match err {
        CmsError::NotJson { content_type, body, .. } => {
            assert_eq!(content_type, "text/html; charset=utf-8");
            assert!(body.contains("Maintenance"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn truncated_json_body_is_a_json_error() {
    let transport = CannedTransport::default().respond_raw(200, b"{\"data\": [".to_vec());
    let err = client(transport)
        .list("biographies", &ContentQuery::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Json(_)));
}

#[tokio::test]
async fn single_type_returns_entry() {
    let transport = CannedTransport::default().respond(
        200,
        json!({ "data": { "id": 1, "documentId": "home", "heroTitle": "Women who shaped history" } }),
    );
    let client = client(transport.clone());
    let homepage = client.single_type("homepage", &ContentQuery::new().locale("fr")).await.unwrap();

    assert_eq!(homepage.document_id(), Some("home"));
    assert_eq!(homepage.str_field("heroTitle"), Some("Women who shaped history"));
    assert_eq!(query_value(&transport.requests()[0], "locale"), Some("fr"));
}

#[tokio::test]
async fn find_by_slug_filters_and_handles_miss() {
    let transport = CannedTransport::default()
        .respond(200, json!({ "data": [{ "id": 4, "slug": "wangari-maathai", "name": "Wangari Maathai" }] }))
        .respond(200, json!({ "data": [] }));
    let client = client(transport.clone());

    let hit = client.find_by_slug("biographies", "wangari-maathai").await.unwrap();
    assert_eq!(hit.and_then(|e| e.id()), Some(4));

    let miss = client.find_by_slug("biographies", "nobody").await.unwrap();
    assert!(miss.is_none());

    let requests = transport.requests();
    assert_eq!(
        query_value(&requests[0], "filters[slug][$eq]"),
        Some("wangari-maathai")
    );
    assert_eq!(query_value(&requests[0], "pagination[pageSize]"), Some("1"));
}

#[tokio::test]
async fn search_uses_case_insensitive_contains() {
    let transport = CannedTransport::default().respond(200, json!({ "data": [] }));
    let client = client(transport.clone());
    client
        .search("biographies", "name", "curie", &ContentQuery::new())
        .await
        .unwrap();
    assert_eq!(
        query_value(&transport.requests()[0], "filters[name][$containsi]"),
        Some("curie")
    );
}

#[tokio::test]
async fn biographies_decode_into_typed_records() {
    let transport = CannedTransport::default().respond(
        200,
        json!({ "data": [{ "id": 3, "name": "Marie Curie", "slug": "marie-curie", "tags": [] }] }),
    );
    let bios = client(transport).biographies(&ContentQuery::new()).await.unwrap();
    assert_eq!(bios.len(), 1);
    assert_eq!(bios[0].name, "Marie Curie");
    assert_eq!(bios[0].slug.as_deref(), Some("marie-curie"));
}

#[tokio::test]
async fn writes_require_a_token() {
    let transport = CannedTransport::default();
    let err = client(transport.clone())
        .create("comments", json!({ "body": "Inspiring." }))
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Unauthenticated));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn login_token_is_used_for_writes() {
    let transport = CannedTransport::default()
        .respond(200, json!({ "jwt": "token-123", "user": { "id": 1, "username": "reader" } }))
        .respond(200, json!({ "data": { "id": 50, "attributes": { "body": "Inspiring." } }, "meta": {} }))
        .respond_raw(204, Vec::new());
    let mut client = client(transport.clone());

    let session = client.login("reader@example.org", "hunter2").await.unwrap();
    assert_eq!(session.jwt, "token-123");
    assert_eq!(client.token(), Some("token-123"));

    let created = client
        .create("comments", json!({ "body": "Inspiring." }))
        .await
        .unwrap();
    assert_eq!(created["data"]["id"], json!(50));

    let deleted = client.delete("comments", "50").await.unwrap();
    assert_eq!(deleted, Value::Null);

    let requests = transport.requests();
    assert_eq!(requests[0].url, "https://cms.example/api/auth/local");
    assert_eq!(requests[0].bearer, None);
    assert_eq!(requests[1].method, Method::Post);
    assert_eq!(requests[1].bearer.as_deref(), Some("token-123"));
    assert_eq!(requests[1].body, Some(json!({ "data": { "body": "Inspiring." } })));
    assert_eq!(requests[2].method, Method::Delete);
    assert_eq!(requests[2].url, "https://cms.example/api/comments/50");
}

#[tokio::test]
async fn failed_login_surfaces_cms_message() {
    let transport = CannedTransport::default().respond(
        400,
        json!({ "data": null, "error": { "status": 400, "message": "Invalid identifier or password" } }),
    );
    let mut client = client(transport);
    let err = client.login("reader", "wrong").await.unwrap_err();
    assert!(matches!(err, CmsError::Upstream { status: 400, .. }));
    assert!(client.token().is_none());
}

#[tokio::test]
async fn configured_api_token_is_sent_on_reads() {
    let transport = CannedTransport::default().respond(200, json!({ "data": [] }));
    let config = CmsConfig {
        api_token: Some("read-only".to_string()),
        ..CmsConfig::with_base_url("https://cms.example/api")
    };
    let client = CmsClient::with_transport(config, transport.clone());
    client.list("biographies", &ContentQuery::new()).await.unwrap();
    assert_eq!(transport.requests()[0].bearer.as_deref(), Some("read-only"));
}
