//! HTTP client wrapper for the billing service REST API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::CredentialProvider;
use crate::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

use super::error::{ApiError, ApiResult};

/// Connection settings for an `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
}

impl ApiConfig {
    /// The base URL always ends with `/` so relative paths land under it.
    pub fn new(base_url: &str) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Per-call additions: query parameters and extra headers.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// API client for the billing service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: ApiConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let base_url = Url::parse(config.base_url())
            .with_context(|| format!("Invalid API base URL: {}", config.base_url()))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.get_with(path, RequestOptions::default()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        self.send(Method::GET, path, None::<&()>, options).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post_with(path, body, RequestOptions::default()).await
    }

    pub async fn post_with<T, B>(&self, path: &str, body: &B, options: RequestOptions) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, Some(body), options).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.put_with(path, body, RequestOptions::default()).await
    }

    pub async fn put_with<T, B>(&self, path: &str, body: &B, options: RequestOptions) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, Some(body), options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.delete_with(path, RequestOptions::default()).await
    }

    pub async fn delete_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        self.send(Method::DELETE, path, None::<&()>, options).await
    }

    /// Run one request and log its failure, if any, before returning it.
    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let result = self.execute(method.clone(), path, body, options).await;
        if let Err(ref e) = result {
            e.log(&method, path);
        }
        result
    }

    async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.client.request(method, url).headers(options.headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request = self.authorize(request);

        let response = request.send().await.map_err(ApiError::from_send)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let bytes = response.bytes().await.map_err(ApiError::NoResponse)?;
        Self::decode(path, &bytes)
    }

    /// Attach the bearer token when one is stored.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.get() {
            Ok(Some(token)) if !token.is_empty() => request.bearer_auth(token),
            Ok(_) => request,
            Err(e) => {
                warn!(error = %e, "Could not read session token, sending unauthenticated");
                request
            }
        }
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Request(format!("Invalid path {:?}: {}", path, e)))
    }

    /// An empty body reads as JSON `null`. A body that is not JSON at all
    /// is handed over as a JSON string of its text.
    fn decode<T: DeserializeOwned>(path: &str, bytes: &[u8]) -> ApiResult<T> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(Value::Null).map_err(|source| ApiError::Decode {
                path: path.to_string(),
                source,
            });
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Ok(value),
            Err(source) if source.is_syntax() || source.is_eof() => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                serde_json::from_value(Value::String(text)).map_err(|_| ApiError::Decode {
                    path: path.to_string(),
                    source,
                })
            }
            Err(source) => Err(ApiError::Decode {
                path: path.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::time::Instant;

    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;
    use crate::api::FailureKind;
    use crate::auth::MemoryStore;

    fn client_for(server: &MockServer, credentials: Arc<dyn CredentialProvider>) -> ApiClient {
        let config = ApiConfig::new(&format!("{}/api", server.uri()));
        ApiClient::new(config, credentials).expect("Failed to build client")
    }

    fn authorization(request: &Request) -> Option<String> {
        request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        assert_eq!(ApiConfig::new("http://localhost:3001/api").base_url(), "http://localhost:3001/api/");
        assert_eq!(ApiConfig::new("http://localhost:3001/api/").base_url(), "http://localhost:3001/api/");
        assert_eq!(ApiConfig::default().timeout(), Duration::from_secs(100));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = ApiClient::new(ApiConfig::new("not a url"), Arc::new(MemoryStore::new()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_bearer_token_attached_when_stored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(header("authorization", "Bearer abc.def"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::with_token("abc.def")));
        let products: Value = client.get("products").await.unwrap();
        assert_eq!(products, json!([]));
    }

    #[tokio::test]
    async fn test_no_authorization_header_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let _: Value = client.get("cart").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(authorization(&requests[0]), None);
    }

    #[tokio::test]
    async fn test_token_read_on_every_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let client = client_for(&server, store.clone());

        let _: Value = client.get("invoice").await.unwrap();
        store.set("late-login").unwrap();
        let _: Value = client.get("invoice").await.unwrap();
        store.clear().unwrap();
        let _: Value = client.get("invoice").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let headers: Vec<Option<String>> = requests.iter().map(authorization).collect();
        assert_eq!(
            headers,
            vec![None, Some("Bearer late-login".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_default_headers_and_json_body() {
        let server = MockServer::start().await;
        let payload = json!({"name": "Acme", "items": []});
        Mock::given(method("POST"))
            .and(path("/api/products"))
            .and(header("content-type", "application/json"))
            .and(header("accept", "application/json"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "1", "name": "Acme", "items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let created: Value = client.post("products", &payload).await.unwrap();
        assert_eq!(created["_id"], "1");
    }

    #[tokio::test]
    async fn test_body_returned_unwrapped() {
        let server = MockServer::start().await;
        let body = json!({"_id": "9", "billTo": "Ann", "items": [{"price": "2.50", "quantity": 2}], "extra": null});
        Mock::given(method("GET"))
            .and(path("/api/invoice/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let first: Value = client.get("invoice/9").await.unwrap();
        let second: Value = client.get("/invoice/9").await.unwrap();
        assert_eq!(first, body);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_query_params_and_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(query_param("page", "2"))
            .and(query_param("search", "tea"))
            .and(header("x-request-source", "cli"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let options = RequestOptions::new()
            .query("page", 2)
            .query("search", "tea")
            .header(
                HeaderName::from_static("x-request-source"),
                HeaderValue::from_static("cli"),
            );
        let _: Value = client.get_with("products", options).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/products/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "7"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/products/7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let updated: Value = client.put("products/7", &json!({"name": "B"})).await.unwrap();
        assert_eq!(updated["_id"], "7");

        // Empty body reads as null
        let deleted: Value = client.delete("products/7").await.unwrap();
        assert_eq!(deleted, Value::Null);
    }

    #[tokio::test]
    async fn test_status_failure_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/invoice/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/invoice/1"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Not yours"})))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));

        let err = client.get::<Value>("invoice/404").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::HttpStatus);
        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
        assert_eq!(err.log_message(), "The resource was not found.");

        let err = client.delete::<Value>("invoice/1").await.unwrap_err();
        assert_eq!(err.log_message(), "Not yours");
        assert_eq!(err.to_string(), "Forbidden: Not yours");
    }

    #[tokio::test]
    async fn test_no_response_failure() {
        // Grab a free port and release it so connections are refused
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ApiConfig::new(&format!("http://127.0.0.1:{}/api", port));
        let client = ApiClient::new(config, Arc::new(MemoryStore::new())).unwrap();
        let err = client.get::<Value>("cart").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::NoResponse);
    }

    #[tokio::test]
    async fn test_invalid_token_is_a_local_failure() {
        let server = MockServer::start().await;
        let client = client_for(&server, Arc::new(MemoryStore::with_token("bad\ntoken")));
        let err = client.get::<Value>("cart").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Request);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_a_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"not": "a list"})))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let err = client.get::<Vec<Value>>("cart").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { ref path, .. } if path == "cart"));
    }

    #[tokio::test]
    async fn test_plain_text_body_is_returned_as_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let body: Value = client.get("health").await.unwrap();
        assert_eq!(body, Value::String("OK".to_string()));

        let text: String = client.get("health").await.unwrap();
        assert_eq!(text, "OK");

        // Text cannot fill a structured type
        let err = client.get::<Vec<Value>>("health").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { ref path, .. } if path == "health"));
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (buffer, guard)
    }

    #[tokio::test]
    async fn test_status_failures_are_logged_at_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/invoice/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/invoice/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "X"})))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let (logs, _guard) = capture_logs();

        client.get::<Value>("invoice/missing").await.unwrap_err();
        let output = logs.contents();
        let line = output
            .lines()
            .find(|l| l.contains("Not Found: "))
            .expect("status failure was logged");
        assert!(line.contains("ERROR"), "{}", line);
        assert!(line.contains("Not Found: The resource was not found."), "{}", line);
        assert!(line.contains("status=404"), "{}", line);

        client.get::<Value>("invoice/gone").await.unwrap_err();
        let output = logs.contents();
        let line = output
            .lines()
            .find(|l| l.contains("Not Found: X"))
            .expect("server message was logged");
        assert!(line.contains("ERROR"), "{}", line);
    }

    #[tokio::test]
    async fn test_successful_requests_log_no_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let (logs, _guard) = capture_logs();
        client.get::<Vec<Value>>("cart").await.unwrap();
        assert!(!logs.contents().contains("ERROR"));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_no_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = ApiConfig::new(&server.uri()).with_timeout(Duration::from_millis(200));
        let client = ApiClient::new(config, Arc::new(MemoryStore::new())).unwrap();

        let started = Instant::now();
        let err = client.get::<Value>("cart").await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(err.kind(), FailureKind::NoResponse);
        assert!(err.is_timeout());
    }
}
