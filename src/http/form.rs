//! Form codec module
//!
//! Decodes query strings and `application/x-www-form-urlencoded` bodies into
//! [`Params`], and encodes redirect query strings.

use url::form_urlencoded;

use crate::routing::Params;

/// Decode a query string or urlencoded body; later duplicates win
pub fn parse_urlencoded(input: &[u8]) -> Params {
    form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Encode parameters as a query string; null values encode as empty
pub fn build_query(params: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter() {
        serializer.append_pair(key, value.unwrap_or_default());
    }
    serializer.finish()
}

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Whether a `Content-Type` value denotes a urlencoded form
pub fn is_form_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        ct.split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
    })
}
