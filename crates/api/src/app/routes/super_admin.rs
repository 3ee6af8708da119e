//! Cross-organization operations, nested under `/super`.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde_json::json;

use gabinete_core::{OrgId, UserId};
use gabinete_infra::Services;

use crate::app::dto;
use crate::app::extract::ApiJson;
use crate::app::routes::common::{ok_body, respond};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orgs", get(list_organizations))
        .route("/orgs/:org_id", delete(delete_organization))
        .route("/stats", get(stats))
        .route("/users/:user_id/password", post(reset_password))
}

pub async fn list_organizations(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let result = services.list_organizations(principal.identity()).await;
    respond(result, StatusCode::OK, |items| json!({ "items": items }))
}

pub async fn stats(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let result = services.stats(principal.identity()).await;
    respond(result, StatusCode::OK, |stats| json!(stats))
}

pub async fn delete_organization(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .delete_organization(org_id, principal.identity())
        .await;
    respond(result, StatusCode::OK, ok_body)
}

pub async fn reset_password(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<dto::ResetPasswordRequest>,
) -> axum::response::Response {
    let user_id: UserId = match dto::parse_id(&user_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .reset_user_password(user_id, &body.password, principal.identity())
        .await;
    respond(result, StatusCode::OK, ok_body)
}
