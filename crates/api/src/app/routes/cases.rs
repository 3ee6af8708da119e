use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};
use serde_json::json;

use gabinete_core::OrgId;
use gabinete_infra::Services;
use gabinete_orgs::NewCase;

use crate::app::dto;
use crate::app::extract::ApiJson;
use crate::app::routes::common::respond;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/orgs/:org_id/cases", get(list_cases).post(create_case))
}

pub async fn create_case(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
    ApiJson(body): ApiJson<NewCase>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.create_case(org_id, body, principal.identity()).await;
    respond(result, StatusCode::OK, |case| json!({ "case": case }))
}

pub async fn list_cases(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.list_cases(org_id, principal.identity()).await;
    respond(result, StatusCode::OK, |items| json!({ "items": items }))
}
