use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use gabinete_infra::ServiceResult;

use crate::app::errors;

/// Render a service outcome: `ok` builds the success body, failures go
/// through the shared error mapping.
pub fn respond<T>(
    result: ServiceResult<T>,
    status: StatusCode,
    ok: impl FnOnce(T) -> serde_json::Value,
) -> axum::response::Response {
    match result {
        Ok(value) => (status, Json(ok(value))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// `{ "ok": true }` for operations without a payload.
pub fn ok_body(_: ()) -> serde_json::Value {
    json!({ "ok": true })
}
