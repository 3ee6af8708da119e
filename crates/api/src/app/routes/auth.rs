//! Password login. Public: it is how a bearer token is obtained.

use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    http::StatusCode,
    routing::post,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use gabinete_auth::Hs256JwtSigner;
use gabinete_infra::{ServiceError, Services};

use crate::app::dto;
use crate::app::extract::ApiJson;
use crate::app::routes::common::respond;

/// Signs login tokens with the same secret the auth middleware verifies.
#[derive(Debug)]
pub struct TokenIssuer {
    signer: Hs256JwtSigner,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            signer: Hs256JwtSigner::new(secret),
            ttl,
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/auth/login", post(login))
}

pub async fn login(
    Extension(services): Extension<Arc<Services>>,
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    ApiJson(body): ApiJson<dto::LoginRequest>,
) -> axum::response::Response {
    let result = services
        .login(&body.email, &body.password)
        .await
        .and_then(|identity| {
            issuer
                .signer
                .issue(identity.user_id, identity.email, Utc::now(), issuer.ttl)
                .map_err(|e| ServiceError::Internal(e.to_string()))
        });
    respond(result, StatusCode::OK, |(token, claims)| {
        json!({
            "token": token,
            "token_type": "Bearer",
            "user_id": claims.sub,
            "expires_at": DateTime::<Utc>::from_timestamp(claims.exp, 0),
        })
    })
}
