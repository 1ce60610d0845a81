//! Request data wrapper
//!
//! Holds the decoded query and body fields of one request and exposes the
//! merged view a handler's arguments are bound from.

use hyper::header::{HeaderMap, CONTENT_TYPE, COOKIE, HOST};
use hyper::{Method, Uri};

use super::Params;
use crate::http::form;

/// Decoded request
#[derive(Debug, Clone)]
pub struct RequestData {
    method: Method,
    path: String,
    query_string: Option<String>,
    headers: HeaderMap,
    query: Params,
    body: Params,
    data: Params,
}

impl RequestData {
    pub fn new(method: Method, uri: &Uri, headers: HeaderMap, body: &[u8]) -> Self {
        let query_string = uri.query().map(ToString::to_string);
        let query = query_string
            .as_deref()
            .map(|q| form::parse_urlencoded(q.as_bytes()))
            .unwrap_or_default();

        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let body = match method {
            Method::POST if form::is_form_content_type(content_type) => {
                form::parse_urlencoded(body)
            }
            Method::PUT | Method::DELETE => form::parse_urlencoded(body),
            _ => Params::new(),
        };

        let mut request = Self {
            method,
            path: uri.path().to_string(),
            query_string,
            headers,
            query,
            body,
            data: Params::new(),
        };
        request.data = request.data_for(&request.method);
        request
    }

    /// The HTTP method of the request
    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Host` header value
    pub fn host(&self) -> Option<&str> {
        self.headers.get(HOST).and_then(|v| v.to_str().ok())
    }

    /// Query-string fields
    pub const fn query(&self) -> &Params {
        &self.query
    }

    /// Decoded body fields
    pub const fn body(&self) -> &Params {
        &self.body
    }

    /// Request data for the request's own method
    pub const fn data(&self) -> &Params {
        &self.data
    }

    /// Request data as seen by `method`
    ///
    /// Query fields are always included and overridden by body fields on
    /// conflict. Methods other than GET/POST/PUT/DELETE carry no data.
    pub fn data_for(&self, method: &Method) -> Params {
        match *method {
            Method::GET => self.query.clone(),
            Method::POST | Method::PUT | Method::DELETE => {
                let mut data = self.query.clone();
                data.merge(&self.body);
                data
            }
            _ => Params::new(),
        }
    }

    /// Value of a cookie from the `Cookie` header(s)
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn request(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> RequestData {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        RequestData::new(method, &uri.parse().unwrap(), headers, body.as_bytes())
    }

    #[test]
    fn test_get_uses_query_only() {
        let req = request(Method::GET, "/index?action=show&id=3", None, "id=9");
        assert_eq!(req.data().get("id"), Some("3"));
        assert!(req.body().is_empty());
        assert_eq!(req.path(), "/index");
        assert_eq!(req.query_string(), Some("action=show&id=3"));
    }

    #[test]
    fn test_post_body_overrides_query() {
        let req = request(
            Method::POST,
            "/?action=save&id=3&page=2",
            Some("application/x-www-form-urlencoded"),
            "id=9&title=Hello",
        );
        let data = req.data();
        assert_eq!(data.get("id"), Some("9"));
        assert_eq!(data.get("page"), Some("2"));
        assert_eq!(data.get("title"), Some("Hello"));
    }

    #[test]
    fn test_post_requires_form_content_type() {
        let req = request(Method::POST, "/?id=3", Some("application/json"), "id=9");
        assert_eq!(req.data().get("id"), Some("3"));
    }

    #[test]
    fn test_put_and_delete_always_decode_body() {
        let req = request(Method::PUT, "/?id=1", None, "id=2&name=x");
        assert_eq!(req.data().get("id"), Some("2"));
        let req = request(Method::DELETE, "/", None, "id=5");
        assert_eq!(req.data().get("id"), Some("5"));
    }

    #[test]
    fn test_other_methods_have_no_data() {
        let req = request(Method::PATCH, "/?id=1", None, "id=2");
        assert!(req.data().is_empty());
        // Query fields are still reachable directly
        assert_eq!(req.query().get("id"), Some("1"));
    }

    #[test]
    fn test_data_for_other_method() {
        let req = request(Method::GET, "/?id=1", None, "");
        assert_eq!(req.data_for(&Method::POST).get("id"), Some("1"));
        assert!(req.data_for(&Method::OPTIONS).is_empty());
    }

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; NANOSESSID=abc"));
        headers.append(COOKIE, HeaderValue::from_static("lang=en"));
        let req = RequestData::new(Method::GET, &"/".parse().unwrap(), headers, b"");
        assert_eq!(req.cookie("NANOSESSID"), Some("abc"));
        assert_eq!(req.cookie("lang"), Some("en"));
        assert_eq!(req.cookie("missing"), None);
    }
}
