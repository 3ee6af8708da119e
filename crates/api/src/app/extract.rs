//! Request extractors that answer in the shared error format.

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::Response;
use serde::de::DeserializeOwned;

use crate::app::errors;

/// `Json<T>` whose rejections (bad syntax, wrong content type, unknown enum
/// values, missing fields) are a 400 `validation` body instead of axum's
/// plain-text 415/422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation",
                rejection.body_text(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;

    use super::*;
    use crate::app::dto::SetRoleRequest;

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_bodies_are_validation_errors() {
        for body in [r#"{"role":"owner"}"#, r#"{}"#, "not json"] {
            let rejection = ApiJson::<SetRoleRequest>::from_request(json_request(body), &())
                .await
                .unwrap_err();
            assert_eq!(rejection.status(), StatusCode::BAD_REQUEST, "{body}");
        }

        let ApiJson(ok) = ApiJson::<SetRoleRequest>::from_request(json_request(r#"{"role":"admin"}"#), &())
            .await
            .unwrap();
        assert_eq!(ok.role, gabinete_auth::Role::Admin);
    }
}
