use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gabinete_core::DomainError;
use gabinete_infra::ServiceError;

/// Map a service failure onto the HTTP error contract.
///
/// Every domain rejection is a 400 carrying its reason, except a missing
/// resource (404) and a failed password login (401). Internal details are
/// logged, never returned.
pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Internal(detail) => {
            tracing::error!(error = %detail, "internal error while handling request");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "internal server error",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_REQUEST,
    };
    json_error(status, err.reason(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
