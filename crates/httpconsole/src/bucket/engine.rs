//! Bucket create / view / replay / log.

use super::schema::ResponseSchema;
use super::store::BucketStore;
use crate::archive::{ArchivedCookie, Entry, Har, ResponseArchive};
use crate::error::{ConsoleError, StoreError};
use crate::metrics;
use bytes::Bytes;
use http_body_util::Full;
use hyper::ext::ReasonPhrase;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use hyper::{Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Number of interactions kept per bucket.
pub const LOG_CAPACITY: isize = 101;

pub struct BucketEngine {
    store: Arc<dyn BucketStore>,
    schema: ResponseSchema,
}

impl BucketEngine {
    pub fn new(store: Arc<dyn BucketStore>) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            schema: ResponseSchema::new()?,
        })
    }

    /// Validate and persist a response archive under a fresh id.
    pub async fn create(&self, document: Option<&Value>) -> Result<String, ConsoleError> {
        if let Err(failure) = self.schema.validate(document) {
            metrics::record_bucket_op("create", "invalid");
            return Err(ConsoleError::Validation(failure));
        }

        let serialized = document
            .map(Value::to_string)
            .unwrap_or_else(|| Value::Null.to_string());
        let id = Uuid::new_v4().to_string();

        self.store
            .create(&id, &serialized)
            .await
            .inspect_err(|_| metrics::record_bucket_op("create", "error"))?;

        metrics::record_bucket_op("create", "ok");
        debug!("Created bucket {}", id);
        Ok(id)
    }

    /// Stored document, as submitted.
    pub async fn view(&self, id: &str) -> Result<Value, ConsoleError> {
        let raw = self.read("view", id).await?;
        let document = serde_json::from_str(&raw).map_err(|e| corrupt(id, e))?;
        metrics::record_bucket_op("view", "ok");
        Ok(document)
    }

    /// Build the live response for bucket `id` and record `entry` in its log.
    ///
    /// The log write runs on its own task and is not awaited; it may be
    /// dropped or land out of order relative to other requests.
    pub async fn replay(
        &self,
        id: &str,
        entry: &Entry,
    ) -> Result<Response<Full<Bytes>>, ConsoleError> {
        let raw = self.read("replay", id).await?;
        let archive: ResponseArchive = serde_json::from_str(&raw).map_err(|e| corrupt(id, e))?;

        match serde_json::to_string(entry) {
            Ok(serialized) => record_interaction(Arc::clone(&self.store), id.to_string(), serialized),
            Err(e) => warn!("Failed to serialize interaction for bucket {}: {}", id, e),
        }

        let response = build_response(&archive)?;
        metrics::record_bucket_op("replay", "ok");
        Ok(response)
    }

    /// Interaction log wrapped in a HAR envelope.
    pub async fn log(&self, id: &str) -> Result<Har, ConsoleError> {
        let history = self
            .store
            .log_range(id)
            .await
            .inspect_err(|_| metrics::record_bucket_op("log", "error"))?;

        let entries = history
            .iter()
            .filter_map(|raw| match serde_json::from_str::<Entry>(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable log entry for bucket {}: {}", id, e);
                    None
                }
            })
            .collect();

        metrics::record_bucket_op("log", "ok");
        Ok(Har::new(entries))
    }

    async fn read(&self, operation: &str, id: &str) -> Result<String, ConsoleError> {
        match self.store.read(id).await {
            Ok(Some(raw)) => Ok(raw),
            Ok(None) => {
                metrics::record_bucket_op(operation, "not_found");
                Err(ConsoleError::NotFound)
            }
            Err(e) => {
                metrics::record_bucket_op(operation, "error");
                Err(e.into())
            }
        }
    }
}

fn corrupt(id: &str, err: serde_json::Error) -> ConsoleError {
    ConsoleError::CorruptBucket {
        id: id.to_string(),
        reason: err.to_string(),
    }
}

/// Append then trim, off the response path.
fn record_interaction(store: Arc<dyn BucketStore>, id: String, entry: String) {
    tokio::spawn(async move {
        let result: Result<(), StoreError> = async {
            store.log_append(&id, &entry).await?;
            store.log_trim(&id, -LOG_CAPACITY, -1).await
        }
        .await;

        match result {
            Ok(()) => metrics::record_log_write(true),
            Err(e) => {
                metrics::record_log_write(false);
                warn!("Dropped interaction log entry for bucket {}: {}", id, e);
            }
        }
    });
}

/// Apply a stored response archive to a fresh response.
fn build_response(archive: &ResponseArchive) -> Result<Response<Full<Bytes>>, ConsoleError> {
    let status = match archive.status {
        0 => StatusCode::OK,
        code => StatusCode::from_u16(code)
            .map_err(|_| ConsoleError::InvalidStatusCode(code.to_string()))?,
    };
    let reason = if archive.status_text.is_empty() {
        "OK"
    } else {
        archive.status_text.as_str()
    };

    let body = archive.content.text.clone().unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;

    match ReasonPhrase::try_from(reason.as_bytes().to_vec()) {
        Ok(phrase) => {
            response.extensions_mut().insert(phrase);
        }
        Err(_) => debug!("Ignoring unusable status text {:?}", reason),
    }

    let headers = response.headers_mut();

    for header in &archive.headers {
        let name = HeaderName::from_bytes(header.name.as_bytes());
        let value = HeaderValue::from_str(&header.value);
        match (name, value) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!("Skipping unusable header {:?}", header.name),
        }
    }

    for cookie in &archive.cookies {
        match HeaderValue::from_str(&set_cookie_value(cookie)) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(_) => debug!("Skipping unusable cookie {:?}", cookie.name),
        }
    }

    if !archive.redirect_url.is_empty() {
        if let Ok(location) = HeaderValue::from_str(&archive.redirect_url) {
            headers.insert(LOCATION, location);
        }
    }

    if !headers.contains_key(CONTENT_TYPE) {
        let mime_type = archive.content.mime_type.as_deref().unwrap_or_default();
        if let (false, Ok(value)) = (mime_type.is_empty(), HeaderValue::from_str(mime_type)) {
            headers.insert(CONTENT_TYPE, value);
        }
    }

    Ok(response)
}

/// `Set-Cookie` value with the cookie's stored attributes.
fn set_cookie_value(cookie: &ArchivedCookie) -> String {
    let mut value = format!("{}={}", cookie.name, urlencoding::encode(&cookie.value));

    if let Some(domain) = &cookie.domain {
        value.push_str(&format!("; Domain={domain}"));
    }
    value.push_str(&format!("; Path={}", cookie.path.as_deref().unwrap_or("/")));
    if let Some(expires) = &cookie.expires {
        value.push_str(&format!("; Expires={expires}"));
    }
    if cookie.http_only == Some(true) {
        value.push_str("; HttpOnly");
    }
    if cookie.secure == Some(true) {
        value.push_str("; Secure");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchivedRequest, PostData};
    use crate::backends::InMemoryBucketStore;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::time::Duration;

    fn engine() -> (BucketEngine, Arc<InMemoryBucketStore>) {
        let store = Arc::new(InMemoryBucketStore::new());
        let engine = BucketEngine::new(store.clone()).unwrap();
        (engine, store)
    }

    fn document() -> Value {
        json!({
            "status": 418,
            "statusText": "I'm a teapot",
            "httpVersion": "HTTP/1.1",
            "headers": [
                {"name": "X-One", "value": "first"},
                {"name": "X-One", "value": "second"},
                {"name": "Content-Type", "value": "text/plain"}
            ],
            "cookies": [
                {"name": "session", "value": "a b", "httpOnly": true},
                {"name": "theme", "value": "dark", "path": "/app", "secure": true}
            ],
            "content": {"mimeType": "application/json", "text": "short and stout"},
            "redirectURL": ""
        })
    }

    fn entry(method: &str) -> Entry {
        Entry {
            started_date_time: "2024-01-01T00:00:00.000Z".to_string(),
            client_ip_address: "127.0.0.1".to_string(),
            request: ArchivedRequest {
                method: method.to_string(),
                url: "http://localhost/bucket/x".to_string(),
                http_version: "HTTP/1.1".to_string(),
                cookies: vec![],
                headers: vec![],
                query_string: vec![],
                post_data: PostData {
                    mime_type: "application/octet-stream".to_string(),
                    text: String::new(),
                    params: vec![],
                },
                headers_size: 14,
                body_size: 0,
            },
        }
    }

    async fn wait_for_log(store: &InMemoryBucketStore, id: &str, len: usize) -> Vec<String> {
        for _ in 0..100 {
            let log = store.log_range(id).await.unwrap();
            if log.len() >= len {
                return log;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.log_range(id).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_document() {
        let (engine, store) = engine();
        let mut doc = document();
        doc.as_object_mut().unwrap().remove("status");

        let err = engine.create(Some(&doc)).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(ref f) if f.code == "required"));

        let err = engine.create(None).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));

        assert_eq!(store.bucket_count(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_unreplayable_document() {
        let (engine, store) = engine();

        let mut doc = document();
        doc["status"] = json!(201.0);
        let err = engine.create(Some(&doc)).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(ref f) if f.code == "type"));

        let mut doc = document();
        doc["content"]["size"] = json!(u64::MAX);
        assert!(matches!(
            engine.create(Some(&doc)).await,
            Err(ConsoleError::Validation(_))
        ));

        let mut doc = document();
        doc["status"] = json!(99);
        assert!(matches!(
            engine.create(Some(&doc)).await,
            Err(ConsoleError::Validation(_))
        ));

        assert_eq!(store.bucket_count(), 0);
    }

    #[tokio::test]
    async fn test_accepted_document_always_replays() {
        let (engine, _store) = engine();
        let mut doc = document();
        doc["status"] = json!(201);
        doc["headersSize"] = json!(-1);
        doc["bodySize"] = json!(i64::MAX);

        let id = engine.create(Some(&doc)).await.unwrap();
        let response = engine.replay(&id, &entry("GET")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_create_then_view() {
        let (engine, _store) = engine();
        let id = engine.create(Some(&document())).await.unwrap();

        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(engine.view(&id).await.unwrap(), document());
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_not_found() {
        let (engine, _store) = engine();

        assert!(matches!(engine.view("nope").await, Err(ConsoleError::NotFound)));
        assert!(matches!(
            engine.replay("nope", &entry("GET")).await,
            Err(ConsoleError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_replay_applies_archive() {
        let (engine, store) = engine();
        let id = engine.create(Some(&document())).await.unwrap();

        let response = engine.replay(&id, &entry("GET")).await.unwrap();
        assert_eq!(response.status().as_u16(), 418);
        assert_eq!(
            response.extensions().get::<ReasonPhrase>().unwrap().as_bytes(),
            b"I'm a teapot"
        );
        assert_eq!(response.headers()["x-one"], "second");
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert!(response.headers().get(LOCATION).is_none());

        let cookies: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            cookies,
            vec!["session=a%20b; Path=/; HttpOnly", "theme=dark; Path=/app; Secure"]
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"short and stout");

        let log = wait_for_log(&store, &id, 1).await;
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_replay_defaults_and_redirect() {
        let (engine, _store) = engine();
        let doc = json!({
            "status": 0,
            "statusText": "",
            "httpVersion": "HTTP/1.1",
            "headers": [],
            "cookies": [],
            "content": {"mimeType": "text/html"},
            "redirectURL": "http://example.com/next"
        });
        let id = engine.create(Some(&doc)).await.unwrap();

        let response = engine.replay(&id, &entry("GET")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[LOCATION], "http://example.com/next");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_view_does_not_log() {
        let (engine, store) = engine();
        let id = engine.create(Some(&document())).await.unwrap();

        engine.view(&id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.log_range(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_is_bounded() {
        let (engine, store) = engine();
        let id = engine.create(Some(&document())).await.unwrap();

        for _ in 0..120 {
            engine.replay(&id, &entry("POST")).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let har = engine.log(&id).await.unwrap();
        assert!(har.log.entries.len() <= LOG_CAPACITY as usize);
        assert!(store.log_range(&id).await.unwrap().len() <= LOG_CAPACITY as usize);
    }

    #[tokio::test]
    async fn test_log_skips_unreadable_entries() {
        let (engine, store) = engine();
        let good = serde_json::to_string(&entry("PUT")).unwrap();
        store.log_append("b1", &good).await.unwrap();
        store.log_append("b1", "not json").await.unwrap();

        let har = engine.log("b1").await.unwrap();
        assert_eq!(har.log.entries.len(), 1);
        assert_eq!(har.log.entries[0].request.method, "PUT");

        let empty = engine.log("never-created").await.unwrap();
        assert!(empty.log.entries.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_bucket() {
        let (engine, store) = engine();
        store.create("bad", "{not json").await.unwrap();

        assert!(matches!(
            engine.view("bad").await,
            Err(ConsoleError::CorruptBucket { .. })
        ));
    }
}
