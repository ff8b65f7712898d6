//! Step execution over HTTP

use colored::Colorize;
use serde_json::Value;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::matcher::subset_match;
use crate::scenario::Step;

/// Status and decoded body of one step's response
#[derive(Debug, Clone)]
pub struct StepResponse {
    pub status: u16,
    pub body: Value,
}

impl StepResponse {
    /// Compare against the step's expected status, then its expected body
    pub fn verify(&self, step: &Step) -> E2eResult<()> {
        if self.status != step.expect_status {
            return Err(E2eError::StatusMismatch {
                expected: step.expect_status,
                actual: self.status,
                body: self.body.clone(),
            });
        }

        if let Some(expected) = &step.expect_body {
            if !subset_match(expected, &self.body) {
                return Err(E2eError::BodyMismatch {
                    expected: expected.clone(),
                    actual: self.body.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Issues scenario steps against one server instance
pub struct StepExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl StepExecutor {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Send the step's request and capture the response.
    ///
    /// Any HTTP status is returned as data. Only a transport failure is an
    /// error here. A body that is not JSON decodes as an empty object.
    pub async fn execute(&self, step: &Step) -> E2eResult<StepResponse> {
        println!(
            "  {} {} ({})",
            "Step:".cyan(),
            step.name,
            step.action.to_string().dimmed()
        );

        let url = format!("{}{}", self.base_url, step.action.path);
        let mut request = self.client.request(step.action.method.clone(), &url);
        if let Some(body) = &step.body {
            // .json() sets Content-Type: application/json
            request = request.json(body);
        }

        let response = request.send().await.map_err(E2eError::Transport)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(E2eError::Transport)?;

        let body = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            debug!("Response body is not JSON ({}), using {{}}", e);
            Value::Object(Default::default())
        });

        debug!("{} -> {} {}", step.action, status, body);
        Ok(StepResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::find_free_port;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    fn step(json: Value) -> Step {
        serde_json::from_value(json).unwrap()
    }

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route("/status", get(|| async { Json(json!({"status": "ok", "orders": 0})) }))
            .route(
                "/echo",
                post(|Json(body): Json<Value>| async move { Json(json!({"received": body})) }),
            )
            .route("/plain", get(|| async { "not json" }))
            .fallback(|| async { (StatusCode::NOT_FOUND, Json(json!({"error": "Not Found"}))) });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn success_response_is_decoded() {
        let executor = StepExecutor::new(reqwest::Client::new(), spawn_stub().await);
        let s = step(json!({"action": "GET /status", "expect_body": {"status": "ok"}}));

        let response = executor.execute(&s).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"status": "ok", "orders": 0}));
        assert!(response.verify(&s).is_ok());
    }

    #[tokio::test]
    async fn body_is_sent_as_json() {
        let executor = StepExecutor::new(reqwest::Client::new(), spawn_stub().await);
        let s = step(json!({"action": "POST /echo", "body": {"id": 7}}));

        let response = executor.execute(&s).await.unwrap();
        assert_eq!(response.body, json!({"received": {"id": 7}}));
    }

    #[tokio::test]
    async fn error_status_is_data() {
        let executor = StepExecutor::new(reqwest::Client::new(), spawn_stub().await);
        let s = step(json!({"action": "GET /missing", "expect_status": 404,
                            "expect_body": {"error": "Not Found"}}));

        let response = executor.execute(&s).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(response.verify(&s).is_ok());
    }

    #[tokio::test]
    async fn non_json_body_becomes_empty_object() {
        let executor = StepExecutor::new(reqwest::Client::new(), spawn_stub().await);
        let response = executor.execute(&step(json!({"action": "GET /plain"}))).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({}));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let port = find_free_port().unwrap();
        let executor =
            StepExecutor::new(reqwest::Client::new(), format!("http://127.0.0.1:{}", port));

        let err = executor.execute(&step(json!({"action": "GET /status"}))).await.unwrap_err();
        assert!(matches!(err, E2eError::Transport(_)));
        assert!(!err.is_assertion());
    }

    #[test]
    fn verify_reports_status_before_body() {
        let s = step(json!({"action": "GET /status", "expect_body": {"status": "ok"}}));
        let response = StepResponse {
            status: 404,
            body: json!({"error": "Not Found"}),
        };
        assert!(matches!(
            response.verify(&s),
            Err(E2eError::StatusMismatch { expected: 200, actual: 404, .. })
        ));
    }

    #[test]
    fn empty_expected_object_is_still_checked() {
        let s = step(json!({"action": "GET /trades", "expect_body": {}}));

        let object = StepResponse {
            status: 200,
            body: json!({"trades": []}),
        };
        assert!(object.verify(&s).is_ok());

        let array = StepResponse {
            status: 200,
            body: json!([]),
        };
        assert!(matches!(array.verify(&s), Err(E2eError::BodyMismatch { .. })));
    }

    #[test]
    fn null_expected_body_skips_the_check() {
        let s = step(json!({"action": "GET /trades", "expect_body": null}));
        assert!(s.expect_body.is_none());

        let response = StepResponse {
            status: 200,
            body: json!([1, 2, 3]),
        };
        assert!(response.verify(&s).is_ok());
    }

    #[test]
    fn verify_reports_body_mismatch() {
        let s = step(json!({"action": "GET /status", "expect_body": {"orders": 1}}));
        let response = StepResponse {
            status: 200,
            body: json!({"status": "ok", "orders": 0}),
        };
        assert!(matches!(response.verify(&s), Err(E2eError::BodyMismatch { .. })));
    }
}
