use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, patch},
};
use serde_json::json;

use gabinete_core::{OrgId, TagId};
use gabinete_infra::Services;
use gabinete_orgs::{NewTag, TagPatch};

use crate::app::dto;
use crate::app::extract::ApiJson;
use crate::app::routes::common::{ok_body, respond};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orgs/:org_id/tags", get(list_tags).post(create_tag))
        .route("/orgs/:org_id/tags/:tag_id", patch(update_tag).delete(delete_tag))
}

fn parse_tag_path(org_id: &str, tag_id: &str) -> Result<(OrgId, TagId), axum::response::Response> {
    Ok((dto::parse_id(org_id)?, dto::parse_id(tag_id)?))
}

pub async fn list_tags(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.list_tags(org_id, principal.identity()).await;
    respond(result, StatusCode::OK, |items| json!({ "items": items }))
}

pub async fn create_tag(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
    ApiJson(body): ApiJson<NewTag>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.create_tag(org_id, body, principal.identity()).await;
    respond(result, StatusCode::OK, |tag| json!({ "item": tag }))
}

pub async fn update_tag(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, tag_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<TagPatch>,
) -> axum::response::Response {
    let (org_id, tag_id) = match parse_tag_path(&org_id, &tag_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .update_tag(org_id, tag_id, body, principal.identity())
        .await;
    respond(result, StatusCode::OK, |tag| json!({ "item": tag }))
}

pub async fn delete_tag(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, tag_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (org_id, tag_id) = match parse_tag_path(&org_id, &tag_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.delete_tag(org_id, tag_id, principal.identity()).await;
    respond(result, StatusCode::OK, ok_body)
}
