//! The service's route table.

use crate::health::{self, HEALTH_PATH};
use crate::router::Router;

/// Builds the router served by the `heartbeat` binary: `GET /health` only.
pub fn router() -> Router {
    Router::new().get(HEALTH_PATH, health::health)
}
