//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. A miss is split into
//! "no such path" and "path exists under another method" so the server can
//! answer 404 and 405 correctly.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};

/// Result of resolving a request against the route table.
pub(crate) enum Lookup {
    Found(BoxedHandler),
    /// The path is registered, but not for this method. Carries the methods
    /// that are, sorted for a stable `Allow` header.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// The route table.
///
/// Built once at startup and handed to [`Server::new`](crate::Server::new).
/// Registration methods return `self` so calls chain.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Paths are matched exactly: `/health` does not match `/health/`.
    ///
    /// # Panics
    ///
    /// Panics if `path` is malformed or conflicts with a route already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Shorthand for `on(Method::GET, path, handler)`.
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Lookup {
        if let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) {
            return Lookup::Found(Arc::clone(matched.value));
        }

        let mut allowed: Vec<Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Lookup::MethodNotAllowed(allowed)
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
