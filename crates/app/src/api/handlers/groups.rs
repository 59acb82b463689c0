//! Directory group API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use idbridge_common::{Error, Result};
use idbridge_directory::{Group, MembershipRole};
use serde::Deserialize;

use crate::api::directory_error;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    /// Directory object to add
    pub member_id: String,
    /// Add as owner instead of member
    #[serde(default)]
    pub as_owner: bool,
}

/// List groups
///
/// **GET /v1/groups**
pub async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<Group>>> {
    let groups = state.directory.get_groups().await.map_err(directory_error)?;
    Ok(Json(groups))
}

/// Add a member or owner to a group
///
/// **POST /v1/groups/{id}/members**
pub async fn add_member(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> Result<StatusCode> {
    if request.member_id.is_empty() {
        return Err(Error::Validation("member_id must not be empty".to_string()));
    }

    let role = MembershipRole::from_owner_flag(request.as_owner);
    let added = state
        .directory
        .add_to_group(&group_id, &request.member_id, role)
        .await;

    if !added {
        return Err(Error::Upstream(format!(
            "Failed to add {} to {} of group {}",
            request.member_id,
            role.relation(),
            group_id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}
