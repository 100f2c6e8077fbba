//! HTTP transport seam
//!
//! [`ReqwestTransport`] is the only place network I/O happens. Tests swap
//! in their own [`Transport`] to record requests and script responses.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::ClientError;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request relative to the FHIR base URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path below the base URL; empty for the base URL itself
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// First header with `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// `Location` header, set by servers on create
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// Transport over a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let method = request.method;
        let path = normalize_path(&request.path);

        let mut builder = self
            .http
            .request(method.into(), self.url(&request.path))
            .query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let result = builder.send().await;
        let duration = start.elapsed().as_secs_f64();

        let status = match &result {
            Ok(response) => response.status().as_u16().to_string(),
            Err(_) => "error".to_string(),
        };

        metrics::counter!(
            "fhir_client_requests_total",
            "method" => method.as_str(),
            "path" => path.clone(),
            "status" => status
        )
        .increment(1);

        metrics::histogram!(
            "fhir_client_request_duration_seconds",
            "method" => method.as_str(),
            "path" => path
        )
        .record(duration);

        let response = result.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ClientError::Network(e.to_string())
            } else {
                ClientError::Http(e)
            }
        })?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .or_else(|| response.headers().get(reqwest::header::CONTENT_LOCATION))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

/// Normalize request paths to avoid high-cardinality labels.
/// Keeps the resource type and `_`/`$` operations, replaces ids with `:id`.
fn normalize_path(path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return "/".to_string();
    }

    path.split('/')
        .enumerate()
        .map(|(i, seg)| {
            if i == 0 || seg.starts_with('_') || seg.starts_with('$') {
                seg
            } else {
                ":id"
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_replaces_ids() {
        assert_eq!(normalize_path("Patient/123"), "Patient/:id");
        assert_eq!(normalize_path("Patient/_search"), "Patient/_search");
        assert_eq!(normalize_path("Patient/123/_history/2"), "Patient/:id/_history/:id");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn url_joins_base_and_path() {
        let transport = ReqwestTransport::new("http://fhir.test/r5/");
        assert_eq!(transport.url("Patient/1"), "http://fhir.test/r5/Patient/1");
        assert_eq!(transport.url(""), "http://fhir.test/r5");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let transport = ReqwestTransport::new("http://127.0.0.1:1/fhir");
        let err = transport
            .execute(HttpRequest::new(Method::Get, "metadata"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Network(_)), "{err:?}");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut request = HttpRequest::new(Method::Get, "Patient/1");
        request.headers.push(("Accept".into(), "application/fhir+json".into()));
        assert_eq!(request.header("accept"), Some("application/fhir+json"));
        assert_eq!(request.header("x-api-key"), None);
    }
}
