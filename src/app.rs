//! Application entry point for HTTP requests
//!
//! Bridges hyper and the router: validates and collects the request body,
//! decodes it into [`RequestData`], runs the router on the blocking pool and
//! converts the exchange's reply back into a hyper response.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, REFERER, SERVER, USER_AGENT,
};
use hyper::{Method, Request, Response, Version};

use crate::config::Config;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{Exchange, RequestData, Router};
use crate::session::SessionStore;

/// Router, sessions and configuration shared by all connections
#[derive(Debug)]
pub struct App {
    router: Router,
    sessions: SessionStore,
    config: Config,
}

impl App {
    pub fn new(config: Config, router: Router) -> Self {
        Self {
            router,
            sessions: SessionStore::new(config.app.session_cookie.clone())
                .with_ttl(Duration::from_secs(config.app.session_ttl)),
            config,
        }
    }

    pub const fn router(&self) -> &Router {
        &self.router
    }

    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Run the router for one decoded request
    ///
    /// Returns the response together with the dispatched action name. HEAD
    /// is routed under its own method; only the body is dropped.
    pub fn dispatch(&self, request: RequestData) -> (Response<Full<Bytes>>, Option<String>) {
        let is_head = *request.method() == Method::HEAD;
        let mut ex = Exchange::new(&self.router, &self.sessions, request);
        let result = self.router.run(&mut ex);
        let action = ex.action().map(ToString::to_string);

        let response = match result {
            Ok(()) => ex.finish().into_response(is_head),
            Err(e) if e.is_not_found() => {
                logger::log_info(&e.to_string());
                http::build_404_response()
            }
            Err(e) => {
                logger::log_error(&format!("Action failed: {e}"));
                http::build_500_response()
            }
        };
        (response, action)
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    app: Arc<App>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let mut entry = access_entry(
        &parts.method,
        &parts.uri,
        parts.version,
        &parts.headers,
        peer_addr,
    );

    let body = read_body(body, &parts.headers, app.config.http.max_body_size).await;
    let (mut response, action) = match body {
        Err(response) => (response, None),
        Ok(bytes) => {
            let worker = Arc::clone(&app);
            let task = move || {
                let request = RequestData::new(parts.method, &parts.uri, parts.headers, &bytes);
                worker.dispatch(request)
            };
            match tokio::task::spawn_blocking(task).await {
                Ok(result) => result,
                Err(e) => {
                    logger::log_error(&format!("Action task failed: {e}"));
                    (http::build_500_response(), None)
                }
            }
        }
    };

    match HeaderValue::from_str(&app.config.http.server_name) {
        Ok(value) => {
            response.headers_mut().insert(SERVER, value);
        }
        Err(e) => logger::log_warning(&format!("Invalid server name: {e}")),
    }

    if app.config.logging.access_log {
        entry.action = action;
        entry.status = response.status().as_u16();
        let body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.body_bytes = usize::try_from(body_bytes).unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &app.config.logging.access_log_format);
    }

    Ok(response)
}

fn access_entry(
    method: &Method,
    uri: &hyper::Uri,
    version: Version,
    headers: &HeaderMap,
    peer_addr: SocketAddr,
) -> AccessLogEntry {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        method.to_string(),
        uri.path().to_string(),
    );
    entry.query = uri.query().map(ToString::to_string);
    entry.http_version = match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

/// Collect the body, enforcing the configured size limit
async fn read_body<B>(
    body: B,
    headers: &HeaderMap,
    max_body_size: u64,
) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(resp) = check_body_size(headers, max_body_size) {
        return Err(resp);
    }
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_error(&format!("Request body too large (max: {max_body_size})"));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(http::build_400_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}
