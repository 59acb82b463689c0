//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{groups, invitations, users};
use crate::AppState;

fn invitation_routes() -> Router<AppState> {
    Router::new().route("/v1/invitations", post(invitations::create_invitation))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/users",
            get(users::list_users).post(users::create_user),
        )
        .route("/v1/users/lookup", get(users::lookup_user))
        .route("/v1/users/{id}/disable", post(users::disable_user))
}

fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/groups", get(groups::list_groups))
        .route("/v1/groups/{id}/members", post(groups::add_member))
}

/// All API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(invitation_routes())
        .merge(user_routes())
        .merge(group_routes())
}
