use axum::Router;

pub mod battles;
pub mod participants;
pub mod system;

/// Router for every resource endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/participants", participants::router())
        .nest("/battles", battles::router())
}
