use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::json;

use gabinete_core::{JoinRequestId, OrgId};
use gabinete_infra::Services;

use crate::app::extract::ApiJson;
use crate::app::{dto, errors};
use crate::app::routes::common::{ok_body, respond};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/join-requests", post(submit_join_request))
        .route("/join-requests/:id/decide", post(decide_join_request))
        .route("/orgs/:org_id/join-requests", get(list_join_requests))
}

pub async fn submit_join_request(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::SubmitJoinRequest>,
) -> axum::response::Response {
    let result = services
        .submit_join_request(&body.code, body.note, principal.identity())
        .await;
    respond(result, StatusCode::OK, |request_id| json!({ "request_id": request_id }))
}

pub async fn decide_join_request(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::DecideJoinRequest>,
) -> axum::response::Response {
    let request_id: JoinRequestId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .decide_join_request(request_id, body.decision, principal.identity())
        .await;
    respond(result.map(|_| ()), StatusCode::OK, ok_body)
}

pub async fn list_join_requests(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
    Query(params): Query<dto::JoinRequestListParams>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match params.status() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .list_join_requests(org_id, status, principal.identity())
        .await;
    respond(result, StatusCode::OK, |items| json!({ "items": items }))
}
