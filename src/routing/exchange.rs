//! Request/response exchange
//!
//! An [`Exchange`] is one request being handled: the decoded request, the
//! response buffer handlers write into, and the session. Once a redirect or
//! a forward completes, the exchange is finished and further writes are
//! discarded.

use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use hyper::{Method, StatusCode};
use serde::Serialize;

use super::{Params, RequestData, Router};
use crate::error::{Error, Result};
use crate::http::{self, Reply};
use crate::logger;
use crate::session::{Session, SessionStore};

/// Marker returned by a handler once its response is complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Done;

/// Handler return type
pub type ActionResult = Result<Done>;

/// One request being handled
pub struct Exchange<'r> {
    router: &'r Router,
    sessions: &'r SessionStore,
    request: RequestData,
    reply: Reply,
    finished: bool,
    depth: usize,
    action: Option<String>,
    session: Option<Session>,
    session_destroyed: bool,
}

impl<'r> Exchange<'r> {
    pub fn new(router: &'r Router, sessions: &'r SessionStore, request: RequestData) -> Self {
        Self {
            router,
            sessions,
            request,
            reply: Reply::default(),
            finished: false,
            depth: 0,
            action: None,
            session: None,
            session_destroyed: false,
        }
    }

    /// The request data wrapper, for values outside the bound arguments
    pub const fn request(&self) -> &RequestData {
        &self.request
    }

    /// The most recently dispatched action name
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub(crate) fn set_action(&mut self, action: String) {
        self.action = Some(action);
    }

    /// Whether a redirect or forward has terminated the handling
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    pub const fn reply(&self) -> &Reply {
        &self.reply
    }

    /// Append to the response body
    pub fn write(&mut self, text: &str) {
        if self.finished {
            logger::log_debug("Discarding output written after the response finished");
            return;
        }
        self.reply.body.push_str(text);
    }

    pub fn set_status(&mut self, status: StatusCode) {
        if !self.finished {
            self.reply.status = status;
        }
    }

    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let value =
            HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(value.to_string()))?;
        self.reply.set_header(name, value);
        Ok(())
    }

    /// Replace the body with a JSON document
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) -> ActionResult {
        let body = serde_json::to_string(value)?;
        if !self.finished {
            self.reply.status = status;
            self.reply
                .set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            self.reply.body = body;
        }
        Ok(Done)
    }

    /// Send the client to another action via `Location` and stop handling
    ///
    /// The query string carries `params` plus the action field; it is only
    /// appended when non-empty.
    pub fn redirect(&mut self, action: Option<&str>, params: Params) -> ActionResult {
        let mut params = params;
        if let Some(action) = action {
            params.insert(self.router.action_field(), Some(action.to_string()));
        }

        let host = self.request.host().unwrap_or("localhost");
        let mut location = format!(
            "http://{host}{}/{}",
            parent_dir(self.request.path()),
            self.router.entry_script()
        );
        if !params.is_empty() {
            location.push('?');
            location.push_str(&http::build_query(&params));
        }
        logger::log_redirect(&location);

        let value = HeaderValue::from_str(&location)
            .map_err(|_| Error::InvalidHeader(location.clone()))?;
        if !self.finished {
            self.reply.status = StatusCode::FOUND;
            self.reply.set_header(LOCATION, value);
            self.reply.body.clear();
            self.finished = true;
        }
        Ok(Done)
    }

    /// Re-dispatch `action` as GET on this request, then stop handling
    pub fn forward(&mut self, action: &str, params: Params) -> ActionResult {
        self.forward_inline(action, Method::GET, &params)?;
        self.finished = true;
        Ok(Done)
    }

    /// Re-dispatch `action` under `method` and return to the caller
    ///
    /// Only the routing key changes; bound request data stays that of the
    /// real request.
    pub fn forward_inline(&mut self, action: &str, method: Method, params: &Params) -> Result<()> {
        let router = self.router;
        if self.depth >= router.max_forward_depth() {
            return Err(Error::ForwardLimit(router.max_forward_depth()));
        }
        self.depth += 1;
        logger::log_forward(action, method.as_str(), self.depth);
        let result = router.dispatch(self, Some(action), Some(method), params);
        self.depth -= 1;
        result
    }

    /// Start or resume the session
    pub fn session(&mut self) -> &mut Session {
        let sessions = self.sessions;
        let request = &self.request;
        self.session
            .get_or_insert_with(|| sessions.start(request.cookie(sessions.cookie_name())))
    }

    /// Write the session back to the store now, if it was modified
    pub fn commit_session(&mut self) {
        if let Some(session) = &self.session {
            self.sessions.save(session);
        }
    }

    /// Discard the session; a later `session()` call starts a new one
    pub fn destroy_session(&mut self) {
        let id = match self.session.take() {
            Some(session) => Some(session.id()),
            None => self
                .request
                .cookie(self.sessions.cookie_name())
                .map(ToString::to_string),
        };
        if let Some(id) = id {
            self.sessions.remove(&id);
        }
        self.session_destroyed = true;
    }

    /// Close the exchange: persist the session and hand out the response
    ///
    /// A new session only gets a cookie once it holds data.
    pub fn finish(mut self) -> Reply {
        let cookie_name = self.sessions.cookie_name();
        let cookie = match self.session.take() {
            Some(session) => {
                self.sessions.save(&session);
                let id = session.id();
                (session.is_new() && self.sessions.contains(&id))
                    .then(|| format!("{cookie_name}={id}; Path=/; HttpOnly"))
            }
            None if self.session_destroyed => {
                Some(format!("{cookie_name}=; Path=/; Max-Age=0; HttpOnly"))
            }
            None => None,
        };
        if let Some(cookie) = cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => self.reply.append_header(SET_COOKIE, value),
                Err(e) => logger::log_error(&format!("Invalid session cookie: {e}")),
            }
        }
        self.reply
    }
}

/// Directory part of a request path without trailing separators
fn parent_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    let dir = trimmed.rfind('/').map_or("", |i| &trimmed[..i]);
    dir.trim_end_matches(['/', '\\'])
}
