//! Incoming HTTP request type.

use http::Method;

/// The request view handed to a handler: the method and the path.
///
/// Query, headers, and body are not carried: no route in this service reads
/// them.
pub struct Request {
    method: Method,
    path: String,
}

impl Request {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into() }
    }

    /// Builds a request from hyper's parsed head.
    pub(crate) fn from_parts(parts: http::request::Parts) -> Self {
        Self::new(parts.method, parts.uri.path())
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_keeps_path_without_query() {
        let (parts, ()) = http::Request::builder()
            .method(Method::GET)
            .uri("/health?verbose=1")
            .body(())
            .unwrap()
            .into_parts();
        let req = Request::from_parts(parts);

        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.path(), "/health");
    }
}
