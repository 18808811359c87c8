//! # heartbeat
//!
//! A liveness endpoint for services behind a reverse proxy.
//!
//! One route, `GET /health`, answering `{"message":"Hello World","status":200}`.
//! TLS, rate limiting, and process supervision belong to the proxy and the
//! orchestrator, not here.
//!
//! The pieces underneath are small and reusable:
//!
//! - Radix-tree routing via [`matchit`], with proper 404 / 405 answers
//! - hyper for HTTP/1.1 and HTTP/2 on tokio
//! - An explicit lifecycle: [`Server::new`] → [`Server::bind`] → serve or
//!   [`spawn`](Listening::spawn) → [`stop`](RunningServer::stop), draining
//!   open connections on the way out
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use heartbeat::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), heartbeat::Error> {
//!     Server::new(ServerConfig::default(), heartbeat::app::router())
//!         .bind()
//!         .await?
//!         .serve()
//!         .await
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod config;
pub mod health;

pub use config::ServerConfig;
pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Listening, RunningServer, Server};
