//! HTTP response building module
//!
//! Provides builders for error status responses and the [`Reply`] buffer
//! that handlers write into.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};

/// Response under construction
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: String,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

impl Reply {
    /// Set a header, replacing any previous value of the same name
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.retain(|(n, _)| *n != name);
        self.headers.push((name, value));
    }

    /// Append a header, keeping previous values (e.g. `Set-Cookie`)
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.push((name, value));
    }

    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Convert into a hyper response; HEAD keeps headers but drops the body
    ///
    /// `Content-Length` always reflects the buffered body, any value set by
    /// a handler is dropped.
    pub fn into_response(self, is_head: bool) -> Response<Full<Bytes>> {
        let content_length = self.body.len();
        let has_content_type = self.header(&CONTENT_TYPE).is_some();

        let mut builder = Response::builder().status(self.status);
        if !has_content_type && !self.body.is_empty() {
            builder = builder.header(CONTENT_TYPE, "text/html; charset=utf-8");
        }
        for (name, value) in self.headers {
            if name != CONTENT_LENGTH {
                builder = builder.header(name, value);
            }
        }
        let body = if is_head {
            Bytes::new()
        } else {
            Bytes::from(self.body)
        };

        builder
            .header(CONTENT_LENGTH, content_length)
            .body(Full::new(body))
            .unwrap_or_else(|e| {
                log_build_error(self.status.as_str(), &e);
                Response::new(Full::new(Bytes::new()))
            })
    }
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::BAD_REQUEST, "400 Bad Request")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
}

fn build_text_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(text)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::from(text)))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
