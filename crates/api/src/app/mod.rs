//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request bodies and query parsing
//! - `extract.rs`: JSON body extractor with the shared error format
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use thiserror::Error;
use tokio::runtime::Handle;
use tower::ServiceBuilder;

use gabinete_auth::Hs256JwtValidator;
use gabinete_events::{AuditEvent, InMemoryEventBus};
use gabinete_infra::store::ProfileStore;
use gabinete_infra::{
    AuditSink, AuditWorker, InMemoryStore, PostgresStore, ServiceConfig, Services, Store, StoreError, WorkerHandle,
};

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("could not start the audit worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Router plus the background audit worker feeding the audit log.
#[derive(Debug)]
pub struct App {
    pub router: Router,
    pub audit_worker: WorkerHandle,
}

/// Build the full HTTP application (public entrypoint used by `main.rs`).
///
/// Must be called from within a Tokio runtime; the audit worker drives store
/// writes on it.
pub async fn build_app(config: &AppConfig) -> Result<App, StartupError> {
    let store = build_store(config).await?;
    for user_id in &config.super_admins {
        store.set_super_admin(*user_id, true).await?;
        tracing::info!(%user_id, "super-admin flag granted from configuration");
    }

    let bus = Arc::new(InMemoryEventBus::<AuditEvent>::new());
    let audit_worker = AuditWorker::spawn(bus.clone(), store.clone(), Handle::current(), None)?;

    let services = Arc::new(Services::new(
        store,
        AuditSink::new(bus),
        ServiceConfig {
            site_url: config.site_url.clone(),
            invite_ttl: config.invite_ttl,
        },
    ));

    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes()));
    let auth_state = middleware::AuthState { jwt };
    let issuer = Arc::new(routes::auth::TokenIssuer::new(&config.jwt_secret, config.token_ttl));

    // Login is how a token is obtained, so it sits outside the auth layer.
    let public = routes::auth::router()
        .layer(Extension(services.clone()))
        .layer(Extension(issuer));

    // Everything but the health check and login requires a bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    let router = Router::new()
        .route("/health", get(routes::system::health))
        .merge(public)
        .merge(protected)
        .layer(ServiceBuilder::new());

    Ok(App { router, audit_worker })
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn Store>, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("using PostgreSQL store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
