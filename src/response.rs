//! The slice of an HTTP response that decompression needs to touch.

use crate::body::Body;

/// Name of the header declaring the content-coding of the body
pub const CONTENT_ENCODING: &str = "Content-Encoding";

/// Name of the header declaring the length of the body, in bytes
pub const CONTENT_LENGTH: &str = "Content-Length";

/// What a response must expose so its body can be decompressed in place.
///
/// Implement this for your HTTP layer's response type to get
/// [DecompressBody](crate::DecompressBody) on it.
pub trait ResponseParts {
    /// Returns the first value of the named header, if any.
    fn header(&self, name: &str) -> Option<&str>;

    /// Removes every value of the named header.
    fn remove_header(&mut self, name: &str);

    /// The body handle, which may be swapped out for a decoding one.
    fn body_mut(&mut self) -> &mut Body;

    /// Marks the body as known to be uncompressed.
    fn set_uncompressed(&mut self, uncompressed: bool);

    /// Sets the declared content length, `-1` meaning unknown.
    fn set_content_length(&mut self, content_length: i64);
}

/// An ordered list of header fields.
///
/// Names are compared ASCII case-insensitively, values are kept as-is.
/// Repeated names are allowed, lookups return the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// An empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping any existing ones with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes every field named `name`.
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Whether at least one field named `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over all fields, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields, counting repeated names separately.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

/// A response as produced by the transport: headers plus a streaming body.
#[derive(Debug)]
pub struct Response {
    /// Header fields, in the order they were received
    pub headers: Headers,

    /// The body stream, possibly still compressed
    pub body: Body,

    /// Set once the body is known to be served uncompressed
    pub uncompressed: bool,

    /// Declared body length, `-1` when unknown
    pub content_length: i64,
}

impl Response {
    /// Builds a response, taking the content length from the
    /// `Content-Length` header when it parses.
    pub fn new(headers: Headers, body: Body) -> Self {
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|len| *len >= 0)
            .unwrap_or(-1);

        Self {
            headers,
            body,
            uncompressed: false,
            content_length,
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(Headers::new(), Body::empty())
    }
}

impl ResponseParts for Response {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    fn remove_header(&mut self, name: &str) {
        self.headers.remove(name)
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn set_uncompressed(&mut self, uncompressed: bool) {
        self.uncompressed = uncompressed
    }

    fn set_content_length(&mut self, content_length: i64) {
        self.content_length = content_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins_and_remove_takes_all() {
        let mut headers: Headers = [
            ("content-encoding", "gzip"),
            ("Server", "test"),
            ("Content-Encoding", "br"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.get(CONTENT_ENCODING), Some("gzip"));
        assert_eq!(headers.get("SERVER"), Some("test"));

        headers.remove(CONTENT_ENCODING);
        assert!(!headers.contains(CONTENT_ENCODING));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn content_length_from_headers() {
        let res = Response::new([(CONTENT_LENGTH, "42")].into_iter().collect(), Body::empty());
        assert_eq!(res.content_length, 42);

        let res = Response::new([(CONTENT_LENGTH, "nope")].into_iter().collect(), Body::empty());
        assert_eq!(res.content_length, -1);

        let res = Response::new(Headers::new(), Body::empty());
        assert_eq!(res.content_length, -1);
        assert!(!res.uncompressed);
    }

    #[test]
    fn append_keeps_repeated_fields_in_order() {
        let mut headers = Headers::new();
        headers.append("Vary", "Accept-Encoding");
        headers.append(CONTENT_ENCODING, "gzip");
        headers.append("vary", "Origin");

        assert_eq!(headers.get("VARY"), Some("Accept-Encoding"));
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            [
                ("Vary", "Accept-Encoding"),
                (CONTENT_ENCODING, "gzip"),
                ("vary", "Origin"),
            ]
        );

        headers.remove("Vary");
        assert_eq!(headers.iter().collect::<Vec<_>>(), [(CONTENT_ENCODING, "gzip")]);
    }
}
