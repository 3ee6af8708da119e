use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::json;

use gabinete_core::{OrgId, TagId, VoterId};
use gabinete_infra::Services;
use gabinete_orgs::{NewVoter, VoterPatch};

use crate::app::extract::ApiJson;
use crate::app::routes::common::{ok_body, respond};
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orgs/:org_id/voters", get(list_voters).post(create_voter))
        .route(
            "/orgs/:org_id/voters/:voter_id",
            get(get_voter).patch(update_voter).delete(delete_voter),
        )
        .route("/orgs/:org_id/voters/:voter_id/tags", get(voter_tags))
        .route(
            "/orgs/:org_id/voters/:voter_id/tags/:tag_id",
            post(tag_voter).delete(untag_voter),
        )
}

fn parse_voter_path(org_id: &str, voter_id: &str) -> Result<(OrgId, VoterId), axum::response::Response> {
    Ok((dto::parse_id(org_id)?, dto::parse_id(voter_id)?))
}

fn parse_link_path(
    org_id: &str,
    voter_id: &str,
    tag_id: &str,
) -> Result<(OrgId, VoterId, TagId), axum::response::Response> {
    Ok((dto::parse_id(org_id)?, dto::parse_id(voter_id)?, dto::parse_id(tag_id)?))
}

/// `?q=&tag_id=&page=&limit=`; answers `{items, total, page, limit}`.
pub async fn list_voters(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
    Query(params): Query<dto::VoterParams>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let params = match params.into_params() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services.list_voters(org_id, params, principal.identity()).await;
    respond(result, StatusCode::OK, |page| {
        json!({
            "items": page.items,
            "total": page.total,
            "page": page.page,
            "limit": page.page_size,
        })
    })
}

pub async fn create_voter(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
    ApiJson(body): ApiJson<NewVoter>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.create_voter(org_id, body, principal.identity()).await;
    respond(result, StatusCode::OK, |voter| json!({ "item": voter }))
}

pub async fn get_voter(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, voter_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (org_id, voter_id) = match parse_voter_path(&org_id, &voter_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.get_voter(org_id, voter_id, principal.identity()).await;
    respond(result, StatusCode::OK, |voter| json!({ "item": voter }))
}

pub async fn update_voter(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, voter_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<VoterPatch>,
) -> axum::response::Response {
    let (org_id, voter_id) = match parse_voter_path(&org_id, &voter_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .update_voter(org_id, voter_id, body, principal.identity())
        .await;
    respond(result, StatusCode::OK, |voter| json!({ "item": voter }))
}

pub async fn delete_voter(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, voter_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (org_id, voter_id) = match parse_voter_path(&org_id, &voter_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.delete_voter(org_id, voter_id, principal.identity()).await;
    respond(result, StatusCode::OK, ok_body)
}

pub async fn voter_tags(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, voter_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (org_id, voter_id) = match parse_voter_path(&org_id, &voter_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.voter_tags(org_id, voter_id, principal.identity()).await;
    respond(result, StatusCode::OK, |items| json!({ "items": items }))
}

pub async fn tag_voter(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, voter_id, tag_id)): Path<(String, String, String)>,
) -> axum::response::Response {
    let (org_id, voter_id, tag_id) = match parse_link_path(&org_id, &voter_id, &tag_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .tag_voter(org_id, voter_id, tag_id, principal.identity())
        .await;
    respond(result, StatusCode::OK, ok_body)
}

pub async fn untag_voter(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((org_id, voter_id, tag_id)): Path<(String, String, String)>,
) -> axum::response::Response {
    let (org_id, voter_id, tag_id) = match parse_link_path(&org_id, &voter_id, &tag_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .untag_voter(org_id, voter_id, tag_id, principal.identity())
        .await;
    respond(result, StatusCode::OK, ok_body)
}
