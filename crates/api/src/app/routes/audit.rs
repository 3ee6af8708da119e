use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
};
use serde_json::json;

use gabinete_infra::Services;

use crate::app::{dto, errors};
use crate::app::routes::common::respond;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/audit", get(list_audit))
}

pub async fn list_audit(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::AuditParams>,
) -> axum::response::Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services.list_audit(query, principal.identity()).await;
    respond(result, StatusCode::OK, |page| json!(page))
}
