//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: classifies each request by
//! method and exact request target, accumulates POST bodies, and emits
//! exactly one response per request.

use crate::config::AppState;
use crate::http::ResponseParts;
use crate::logger;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Route classification for an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// GET on the exact root target
    Greeting,
    /// POST on the exact root target
    Echo,
    /// Everything else
    NotFound,
}

/// Final disposition of a request. Exactly one is produced per request.
#[derive(Debug, PartialEq)]
pub enum ResponseOutcome {
    Greeting,
    EchoJson(Value),
    InvalidJson,
    NotFound,
    PayloadTooLarge,
}

/// Classify a request by method and exact request target.
///
/// The target is matched as received on the request line (path plus
/// query), so `/?q=1` does not match `/`. Fragments are client-side only
/// and never appear here.
pub fn classify(method: &Method, target: &str) -> Route {
    match (method, target) {
        (&Method::GET, "/") => Route::Greeting,
        (&Method::POST, "/") => Route::Echo,
        _ => Route::NotFound,
    }
}

/// Main entry point for HTTP request handling.
///
/// Transport errors while reading the body propagate to hyper and
/// terminate the connection without a response.
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let started = Instant::now();
    let access_log = state
        .cached_access_log
        .load(std::sync::atomic::Ordering::Relaxed);

    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    // Defaults precede the routing decision; outcome branches override
    // only status and content type.
    let parts = ResponseParts::default();

    let target = uri
        .path_and_query()
        .map_or(uri.path(), |pq| pq.as_str());

    let outcome = match classify(&method, target) {
        Route::Greeting => ResponseOutcome::Greeting,
        Route::Echo => echo_outcome(req, state.config.http.max_body_size).await?,
        Route::NotFound => ResponseOutcome::NotFound,
    };

    let response = finish(parts, outcome);

    if access_log {
        let mut entry = logger::AccessLogEntry::new(
            peer_addr.to_string(),
            method.to_string(),
            uri.path().to_string(),
        );
        entry.query = uri.query().map(ToString::to_string);
        entry.http_version = logger::version_label(version).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response_body_len(&response);
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.format);
    }

    Ok(response)
}

/// Produce the echo outcome for a POST body: buffer the stream, then
/// attempt a JSON parse.
async fn echo_outcome(
    req: Request<Incoming>,
    max_body_size: u64,
) -> Result<ResponseOutcome, hyper::Error> {
    if declared_length_exceeds(&req, max_body_size) {
        return Ok(ResponseOutcome::PayloadTooLarge);
    }

    match accumulate_body(req.into_body(), max_body_size).await? {
        BodyRead::TooLarge => Ok(ResponseOutcome::PayloadTooLarge),
        BodyRead::Complete(buf) => Ok(parse_payload(&buf)),
    }
}

/// Check the declared Content-Length against the configured cap without
/// reading the body.
fn declared_length_exceeds(req: &Request<Incoming>, max_body_size: u64) -> bool {
    let Some(value) = req.headers().get("content-length") else {
        return false;
    };
    let Ok(text) = value.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return false;
    };
    match text.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            true
        }
        Ok(_) => false,
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{text}', skipping size check"
            ));
            false
        }
    }
}

enum BodyRead {
    Complete(Vec<u8>),
    TooLarge,
}

/// Collect the request body frame by frame into a single growing buffer.
async fn accumulate_body(
    mut body: Incoming,
    max_body_size: u64,
) -> Result<BodyRead, hyper::Error> {
    let mut buf = Vec::new();
    while let Some(frame) = body.frame().await {
        let frame = frame?;
        if let Ok(data) = frame.into_data() {
            if (buf.len() + data.len()) as u64 > max_body_size {
                logger::log_error(&format!(
                    "Request body exceeded {max_body_size} bytes mid-stream"
                ));
                return Ok(BodyRead::TooLarge);
            }
            buf.extend_from_slice(&data);
        }
    }
    Ok(BodyRead::Complete(buf))
}

/// Parse the accumulated body. An empty buffer is not valid JSON and lands
/// in the invalid branch together with everything else that fails to
/// parse.
fn parse_payload(buf: &[u8]) -> ResponseOutcome {
    match serde_json::from_slice::<Value>(buf) {
        Ok(value) => {
            logger::log_parsed_payload(&value);
            ResponseOutcome::EchoJson(value)
        }
        Err(_) => ResponseOutcome::InvalidJson,
    }
}

/// Apply the outcome's overrides to the pre-routing defaults and build
/// the response.
fn finish(mut parts: ResponseParts, outcome: ResponseOutcome) -> Response<Full<Bytes>> {
    match outcome {
        ResponseOutcome::Greeting => {
            parts.into_response(Bytes::from_static(b"Got your response"))
        }
        ResponseOutcome::EchoJson(value) => {
            parts.status = StatusCode::OK;
            parts.content_type = "application/json";
            parts.into_response(Bytes::from(value.to_string()))
        }
        ResponseOutcome::InvalidJson => {
            parts.status = StatusCode::OK;
            parts.content_type = "text/plain";
            parts.into_response(Bytes::from_static(b"Invalid JSON"))
        }
        ResponseOutcome::NotFound => {
            // Status is the only override; the pre-routing content type
            // stays in effect.
            parts.status = StatusCode::NOT_FOUND;
            parts.into_response(Bytes::from_static(b"Not Found"))
        }
        ResponseOutcome::PayloadTooLarge => {
            parts.status = StatusCode::PAYLOAD_TOO_LARGE;
            parts.into_response(Bytes::from_static(b"Payload Too Large"))
        }
    }
}

fn response_body_len(response: &Response<Full<Bytes>>) -> usize {
    use hyper::body::Body;
    usize::try_from(Body::size_hint(response.body()).exact().unwrap_or(0))
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    #[test]
    fn test_classify_root_routes() {
        assert_eq!(classify(&Method::GET, "/"), Route::Greeting);
        assert_eq!(classify(&Method::POST, "/"), Route::Echo);
    }

    #[test]
    fn test_classify_misses() {
        assert_eq!(classify(&Method::GET, "/unknown"), Route::NotFound);
        assert_eq!(classify(&Method::POST, "/echo"), Route::NotFound);
        assert_eq!(classify(&Method::DELETE, "/"), Route::NotFound);
        assert_eq!(classify(&Method::HEAD, "/"), Route::NotFound);
        assert_eq!(classify(&Method::PUT, "/"), Route::NotFound);
    }

    #[test]
    fn test_classify_query_string_misses_root() {
        assert_eq!(classify(&Method::GET, "/?q=1"), Route::NotFound);
        assert_eq!(classify(&Method::POST, "/?format=json"), Route::NotFound);
    }

    #[test]
    fn test_parse_payload_valid_values() {
        let cases = [
            json!({"message": "Hello World", "id": 123}),
            json!([1, 2, 3]),
            json!("text"),
            json!(42),
            json!(true),
            json!(null),
            json!({}),
        ];
        for expected in cases {
            let buf = expected.to_string().into_bytes();
            assert_eq!(
                parse_payload(&buf),
                ResponseOutcome::EchoJson(expected),
            );
        }
    }

    #[test]
    fn test_parse_payload_invalid() {
        assert_eq!(parse_payload(b""), ResponseOutcome::InvalidJson);
        assert_eq!(parse_payload(b"invalid json"), ResponseOutcome::InvalidJson);
        assert_eq!(parse_payload(b"{\"broken\":"), ResponseOutcome::InvalidJson);
        assert_eq!(parse_payload(&[0xff, 0xfe]), ResponseOutcome::InvalidJson);
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_finish_greeting_keeps_defaults() {
        let response = finish(ResponseParts::default(), ResponseOutcome::Greeting);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "text/plain"
        );
        assert_eq!(body_string(response).await, "Got your response");
    }

    #[tokio::test]
    async fn test_finish_echo_overrides_status_and_type() {
        let value = json!({"id": 7});
        let response = finish(
            ResponseParts::default(),
            ResponseOutcome::EchoJson(value.clone()),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
        let echoed: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(echoed, value);
    }

    #[tokio::test]
    async fn test_finish_invalid_json() {
        let response = finish(ResponseParts::default(), ResponseOutcome::InvalidJson);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "text/plain"
        );
        assert_eq!(body_string(response).await, "Invalid JSON");
    }

    #[tokio::test]
    async fn test_finish_not_found_keeps_default_content_type() {
        let response = finish(ResponseParts::default(), ResponseOutcome::NotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "text/plain"
        );
        assert_eq!(body_string(response).await, "Not Found");
    }

    #[tokio::test]
    async fn test_finish_payload_too_large() {
        let response = finish(ResponseParts::default(), ResponseOutcome::PayloadTooLarge);
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_string(response).await, "Payload Too Large");
    }
}
