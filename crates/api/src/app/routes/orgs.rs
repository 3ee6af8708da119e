use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::post,
};
use serde_json::json;

use gabinete_core::OrgId;
use gabinete_infra::Services;
use gabinete_orgs::NewOrganization;

use crate::app::dto;
use crate::app::extract::ApiJson;
use crate::app::routes::common::respond;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orgs", post(create_org))
        .route("/orgs/:org_id/join-code/rotate", post(rotate_join_code))
}

pub async fn create_org(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewOrganization>,
) -> axum::response::Response {
    let result = services
        .create_org_and_become_admin(body, principal.identity())
        .await;
    respond(result, StatusCode::OK, |org| json!({ "org": org }))
}

pub async fn rotate_join_code(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.rotate_join_code(org_id, principal.identity()).await;
    respond(result, StatusCode::OK, |code| json!({ "join_code": code }))
}
