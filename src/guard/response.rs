use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Shape of the response sent for a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default = "default_message")]
    pub message: String,
    /// `{"message": ...}` as JSON when true, the bare message as text otherwise.
    #[serde(default = "default_json")]
    pub json: bool,
}

fn default_status() -> u16 { 403 }
fn default_message() -> String { "Access denied from your IP address.".to_string() }
fn default_json() -> bool { true }

impl Default for DenyResponse {
    fn default() -> Self {
        Self {
            status: default_status(),
            message: default_message(),
            json: default_json(),
        }
    }
}

impl DenyResponse {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::FORBIDDEN)
    }
}

impl IntoResponse for &DenyResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.json {
            (status, Json(json!({ "message": self.message }))).into_response()
        } else {
            (
                status,
                [(header::CONTENT_TYPE, "text/plain")],
                self.message.clone(),
            )
                .into_response()
        }
    }
}
