use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::json;

use gabinete_core::OrgId;
use gabinete_infra::Services;
use gabinete_orgs::InviteToken;

use crate::app::dto;
use crate::app::extract::ApiJson;
use crate::app::routes::common::{ok_body, respond};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orgs/:org_id/invitations", get(list_invitations).post(create_invitation))
        .route("/orgs/:org_id/invitations/cancel", post(cancel_invitation))
        .route("/invitations/accept", post(accept_invitation))
}

pub async fn create_invitation(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
    ApiJson(body): ApiJson<dto::CreateInvitationRequest>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services
        .create_invitation(org_id, &body.email, body.role, principal.identity())
        .await;
    respond(result, StatusCode::OK, |issued| {
        json!({
            "token": issued.token,
            "link": issued.link,
            "expires_at": issued.expires_at,
        })
    })
}

pub async fn list_invitations(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = services.list_invitations(org_id, principal.identity()).await;
    respond(result, StatusCode::OK, |items| json!({ "items": items }))
}

pub async fn cancel_invitation(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(org_id): Path<String>,
    ApiJson(body): ApiJson<dto::CancelInvitationRequest>,
) -> axum::response::Response {
    let org_id: OrgId = match dto::parse_id(&org_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let token = InviteToken::from_string(body.token);
    let result = services
        .cancel_invitation(&token, org_id, principal.identity())
        .await;
    respond(result, StatusCode::OK, ok_body)
}

pub async fn accept_invitation(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::AcceptInvitationRequest>,
) -> axum::response::Response {
    let token = InviteToken::from_string(body.token);
    let result = services
        .accept_invitation(&token, principal.identity(), body.org_id)
        .await;
    respond(result, StatusCode::OK, |accepted| json!(accepted))
}
