//! Directory user API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use idbridge_common::{Error, Result};
use idbridge_directory::{DirectoryIdentity, MembershipRole};
use serde::{Deserialize, Serialize};

use crate::api::directory_error;
use crate::{flows, AppState};

/// Query parameters for identity lookup
#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    /// Issuer-assigned id, e.g. an email address
    pub value: String,
    /// Defaults to the configured local identity issuer
    pub issuer: Option<String>,
}

/// Optional group assignment when creating a user
#[derive(Debug, Deserialize, Default)]
pub struct CreateUserQuery {
    pub group_id: Option<String>,
    #[serde(default)]
    pub as_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_to_group: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DisableUserRequest {
    #[serde(default = "default_blocked")]
    pub blocked: bool,
}

fn default_blocked() -> bool {
    true
}

/// List local accounts
///
/// **GET /v1/users**
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<DirectoryIdentity>>> {
    let users = state.directory.get_users().await.map_err(directory_error)?;
    Ok(Json(users))
}

/// Create a user from a JSON template
///
/// **POST /v1/users**
///
/// The body is forwarded as the user template after placeholder
/// substitution. `?group_id=` adds the new user to a group; a failed add is
/// reported as `added_to_group: false` and does not undo the creation.
pub async fn create_user(
    State(state): State<AppState>,
    Query(query): Query<CreateUserQuery>,
    template: String,
) -> Result<(StatusCode, Json<CreateUserResponse>)> {
    if template.trim().is_empty() {
        return Err(Error::Validation("User template is required".to_string()));
    }

    let user = flows::provision_user(
        &state,
        &template,
        query.group_id.as_deref(),
        MembershipRole::from_owner_flag(query.as_owner),
    )
    .await
    .map_err(directory_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id: user.id,
            added_to_group: user.added_to_group,
        }),
    ))
}

/// Find a user by federated identity
///
/// **GET /v1/users/lookup?value=&issuer=**
pub async fn lookup_user(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<DirectoryIdentity>> {
    if query.value.is_empty() {
        return Err(Error::Validation("value must not be empty".to_string()));
    }

    state
        .directory
        .find_user(&query.value, query.issuer.as_deref())
        .await
        .map_err(directory_error)?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("No user with identity {}", query.value)))
}

/// Block or unblock sign-in
///
/// **POST /v1/users/{id}/disable**
///
/// Best-effort: the directory's answer is logged, not returned.
pub async fn disable_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DisableUserRequest>,
) -> StatusCode {
    state.directory.disable_user(&id, request.blocked).await;
    StatusCode::NO_CONTENT
}
