use axum::Router;

pub mod audit;
pub mod auth;
pub mod cases;
pub mod common;
pub mod invitations;
pub mod join_requests;
pub mod me;
pub mod members;
pub mod orgs;
pub mod super_admin;
pub mod system;
pub mod tags;
pub mod voters;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .merge(me::router())
        .merge(orgs::router())
        .merge(members::router())
        .merge(invitations::router())
        .merge(join_requests::router())
        .merge(cases::router())
        .merge(voters::router())
        .merge(tags::router())
        .merge(audit::router())
        .nest("/super", super_admin::router())
}
