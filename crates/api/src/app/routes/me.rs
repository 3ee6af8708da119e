use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::json;

use gabinete_infra::Services;

use crate::app::routes::common::{ok_body, respond};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/me", get(whoami))
        .route("/me/orgs", get(my_orgs))
        .route("/me/join-requests", get(my_join_requests))
        .route("/me/delete", post(delete_account))
}

pub async fn whoami(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let result = services.whoami(principal.identity()).await;
    respond(result, StatusCode::OK, |profile| json!({ "profile": profile }))
}

pub async fn my_orgs(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let result = services.my_memberships(principal.identity()).await;
    respond(result, StatusCode::OK, |items| json!({ "items": items }))
}

pub async fn my_join_requests(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let result = services.my_join_requests(principal.identity()).await;
    respond(result, StatusCode::OK, |items| json!({ "items": items }))
}

pub async fn delete_account(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let result = services.delete_own_account(principal.identity()).await;
    respond(result, StatusCode::OK, ok_body)
}
