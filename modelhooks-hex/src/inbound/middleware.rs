//! Request/response middleware of the pipeline.

use std::collections::HashMap;
use std::time::Instant;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderName, HeaderValue, Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use cookie::Cookie;
use modelhooks_types::RouteError;

use super::errors::HttpError;

/// Header consulted by the method override.
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

// ─────────────────────────────────────────────────────────────────────────────
// Cookies
// ─────────────────────────────────────────────────────────────────────────────

/// Cookies sent with the request, decoded from the `Cookie` header.
///
/// Available to handlers as `Extension<Cookies>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies(HashMap<String, String>);

impl Cookies {
    /// Parses a `Cookie` header. Values are percent-decoded and unquoted;
    /// the first occurrence of a name wins and malformed pairs are skipped.
    pub fn parse(header: &str) -> Self {
        let mut cookies = HashMap::new();
        for cookie in Cookie::split_parse_encoded(header).filter_map(Result::ok) {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value_trimmed().to_string());
        }
        Self(cookies)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub async fn decode_cookies(mut request: Request<Body>, next: Next) -> Response {
    let cookies = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    request.extensions_mut().insert(Cookies::parse(&cookies));
    next.run(request).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Method override
// ─────────────────────────────────────────────────────────────────────────────

/// Lets `POST` requests stand in for other verbs via `X-HTTP-Method-Override`.
///
/// Must wrap the router as a whole: the method is rewritten before routing.
pub async fn method_override(mut request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::POST {
        let overridden = request
            .headers()
            .get(METHOD_OVERRIDE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Method::from_bytes(v.trim().to_ascii_uppercase().as_bytes()).ok());

        if let Some(method) = overridden {
            tracing::trace!(%method, "method overridden");
            *request.method_mut() = method;
        }
    }

    next.run(request).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Security headers
// ─────────────────────────────────────────────────────────────────────────────

/// Hardening headers set on every response that does not set them itself.
pub fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            HeaderName::from_static("x-dns-prefetch-control"),
            HeaderValue::from_static("off"),
        ),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ),
        (
            HeaderName::from_static("x-download-options"),
            HeaderValue::from_static("noopen"),
        ),
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Verbose request/response logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logs method, URL, status, latency and both bodies of every exchange.
///
/// Meant for development only. A request body is buffered only when its
/// declared length fits within `limit`; anything else is forwarded
/// untouched so the body extractors reject it in the error chain.
pub async fn log_exchange(
    State(limit): State<usize>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let uri = parts.uri.clone();

    let (body, logged_request) = match declared {
        Some(len) if len <= limit => match to_bytes(body, limit).await {
            Ok(bytes) => {
                let logged = String::from_utf8_lossy(&bytes).into_owned();
                (Body::from(bytes), logged)
            }
            Err(e) => {
                return HttpError(RouteError::Other {
                    message: e.to_string(),
                    status: Some(400),
                    is_public: None,
                })
                .into_response();
            }
        },
        Some(len) => (body, format!("<{} bytes not logged>", len)),
        None => (body, "<unsized body not logged>".to_string()),
    };

    let response = next.run(Request::from_parts(parts, body)).await;

    let (parts, body) = response.into_parts();
    let response_body = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(%method, %uri, "could not buffer response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    tracing::info!(
        request.body = %logged_request,
        response.body = %String::from_utf8_lossy(&response_body),
        "HTTP {} {} {} {}ms",
        method,
        uri,
        parts.status.as_u16(),
        started.elapsed().as_millis()
    );

    Response::from_parts(parts, Body::from(response_body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookies() {
        let cookies = Cookies::parse("session=abc123; theme=\"dark\"; session=ignored; junk");

        assert_eq!(cookies.get("session"), Some("abc123"));
        assert_eq!(cookies.get("theme"), Some("dark"));
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_cookie_values_are_percent_decoded() {
        let cookies = Cookies::parse("greeting=hello%20world; path=%2Fhome%2Fada");

        assert_eq!(cookies.get("greeting"), Some("hello world"));
        assert_eq!(cookies.get("path"), Some("/home/ada"));
    }

    #[test]
    fn test_parse_empty_cookie_header() {
        assert!(Cookies::parse("").is_empty());
    }

    #[test]
    fn test_security_headers_are_distinct() {
        let headers = security_headers();
        let mut names: Vec<_> = headers.iter().map(|(n, _)| n.as_str()).collect();
        names.sort();
        names.dedup();

        assert_eq!(names.len(), headers.len());
    }
}
