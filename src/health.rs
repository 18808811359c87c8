//! Liveness endpoint.
//!
//! `GET /health` answers one question: can the process serve HTTP? It has
//! no dependencies and touches no shared state.
//!
//! ```text
//! GET /health HTTP/1.1
//!
//! HTTP/1.1 200 OK
//! content-type: application/json
//!
//! {"message":"Hello World","status":200}
//! ```
//!
//! Building the payload is a `Result`. If encoding the success report fails,
//! the failure report is sent instead with a matching `500` status.

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::{Request, Response};

/// Path the liveness handler is mounted on.
pub const HEALTH_PATH: &str = "/health";

/// Body of a `/health` response.
///
/// Serialized untagged: each variant's fields are the whole JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HealthReport {
    Healthy {
        message: &'static str,
        status: u16,
    },
    Failed {
        message: &'static str,
        error: String,
        status: u16,
    },
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self::Healthy { message: "Hello World", status: StatusCode::OK.as_u16() }
    }

    /// The failure report, carrying `err`'s description.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed {
            message: "Internal Server Error",
            error: err.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }

    /// Transport status for this report. Always equal to the body's `status`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Healthy { .. } => StatusCode::OK,
            Self::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn encode(&self) -> Result<Response, serde_json::Error> {
        let body = serde_json::to_vec(self)?;
        Ok(Response::builder().status(self.status_code()).json(body))
    }
}

/// `GET /health` handler.
pub async fn health(_req: Request) -> Response {
    respond(HealthReport::healthy())
}

/// Encodes `report`, falling back to the failure report and finally to a
/// bodiless `500` if encoding keeps failing.
pub(crate) fn respond(report: HealthReport) -> Response {
    report.encode().unwrap_or_else(|e| {
        error!(error = %e, "failed to encode health report");
        HealthReport::failed(&e)
            .encode()
            .unwrap_or_else(|_| Response::status(StatusCode::INTERNAL_SERVER_ERROR))
    })
}

#[cfg(test)]
mod tests {
    use http::Method;
    use http::header::CONTENT_TYPE;

    use super::*;

    fn get_health() -> Request {
        Request::new(Method::GET, HEALTH_PATH)
    }

    #[tokio::test]
    async fn health_returns_hello_world() {
        let res = health(get_health()).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(res.body().as_ref(), br#"{"message":"Hello World","status":200}"#);
    }

    #[tokio::test]
    async fn health_is_idempotent() {
        let first = health(get_health()).await;
        for _ in 0..10 {
            let next = health(get_health()).await;
            assert_eq!(next.status_code(), first.status_code());
            assert_eq!(next.body(), first.body());
        }
    }

    #[test]
    fn failed_report_uses_500_on_the_wire_and_in_the_body() {
        let res = respond(HealthReport::failed("boom"));

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "message": "Internal Server Error",
                "error": "boom",
                "status": 500,
            })
        );
    }

    #[test]
    fn body_status_matches_transport_status() {
        for report in [HealthReport::healthy(), HealthReport::failed("x")] {
            let value = serde_json::to_value(&report).unwrap();
            assert_eq!(value["status"], report.status_code().as_u16());
        }
    }
}
