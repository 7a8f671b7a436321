//! HTTP response building module
//!
//! Provides the response-parts state shared by all outcome branches,
//! decoupled from routing decisions.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

/// Response status and content type, initialized to the pre-routing
/// defaults of 202 + `text/plain`.
///
/// Each outcome branch overrides only the fields that differ, so a branch
/// that sets nothing answers with the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub content_type: &'static str,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            content_type: "text/plain",
        }
    }
}

impl ResponseParts {
    /// Finalize into a hyper response with the given body.
    pub fn into_response(self, body: Bytes) -> Response<Full<Bytes>> {
        Response::builder()
            .status(self.status)
            .header("Content-Type", self.content_type)
            .body(Full::new(body.clone()))
            .unwrap_or_else(|e| {
                crate::logger::log_error(&format!(
                    "Failed to build {} response: {e}",
                    self.status
                ));
                Response::new(Full::new(body))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_defaults() {
        let parts = ResponseParts::default();
        assert_eq!(parts.status, StatusCode::ACCEPTED);
        assert_eq!(parts.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_defaults_survive_into_response() {
        let response = ResponseParts::default().into_response(Bytes::from_static(b"hello"));
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "text/plain"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn test_overrides_apply() {
        let mut parts = ResponseParts::default();
        parts.status = StatusCode::OK;
        parts.content_type = "application/json";

        let response = parts.into_response(Bytes::from_static(b"{}"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }
}
