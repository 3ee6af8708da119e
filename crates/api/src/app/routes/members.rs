use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::json;

use gabinete_core::{OrgId, UserId};
use gabinete_infra::Services;
use gabinete_infra::services::NewMember;

use crate::app::dto;
use crate::app::extract::ApiJson;
use crate::app::routes::common::{ok_body, respond};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orgs/:org_id/members", get(list_members).post(create_member))
        .route("/orgs/:org_id/members/:user_id/role", post(set_role))
        .route("/orgs/:org_id/members/:user_id/remove", post(remove_member))
}

fn parse_member_path(org_id: &str, user_id: &str) -> Result<(OrgId, UserId), axum::response::Response> {
    Ok((dto::parse_id(org_id)?, dto::parse_id(user_id)?))
}

pub async fn list_members(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.list_members(org_id, principal.identity()).await;
    respond(result, StatusCode::OK, |users| json!({ "users": users }))
}

pub async fn create_member(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
    ApiJson(body): ApiJson<NewMember>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .create_member(org_id, body, principal.identity())
        .await;
    respond(result, StatusCode::OK, |user_id| json!({ "user_id": user_id }))
}

pub async fn set_role(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, user_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<dto::SetRoleRequest>,
) -> axum::response::Response {
    let (org_id, user_id) = match parse_member_path(&org_id, &user_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .set_role(org_id, user_id, body.role, principal.identity())
        .await;
    respond(result, StatusCode::OK, ok_body)
}

pub async fn remove_member(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, user_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (org_id, user_id) = match parse_member_path(&org_id, &user_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .remove_member(org_id, user_id, principal.identity())
        .await;
    respond(result, StatusCode::OK, ok_body)
}
