//! Invitation API handlers

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, Json};
use idbridge_common::{Error, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::invitation_error;
use crate::{flows, AppState};

/// Extra query parameter for the authorize URL, appended verbatim
#[derive(Debug, Clone, Deserialize)]
pub struct UrlParam {
    pub name: String,
    pub value: String,
}

/// Request for inviting a user
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    /// Email address of the invitee; also the `login_hint`
    #[validate(email)]
    pub email: String,

    /// Name used in the invitation mail greeting
    #[serde(default)]
    pub display_name: Option<String>,

    /// Claims added to the signed assertion
    #[serde(default)]
    pub claims: Option<HashMap<String, String>>,

    /// Caller-encoded parameters appended to the URL in order
    #[serde(default)]
    pub params: Vec<UrlParam>,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub url: String,
    pub sent: bool,
}

/// Issue and mail an invitation
///
/// **POST /v1/invitations**
///
/// Returns the URL even when the mail could not be delivered; `sent` tells
/// the caller whether to hand the link over some other way.
pub async fn create_invitation(
    State(state): State<AppState>,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>)> {
    request
        .validate()
        .map_err(|e| Error::Validation(format!("Validation failed: {}", e)))?;

    let params: Vec<(String, String)> = request
        .params
        .into_iter()
        .map(|p| (p.name, p.value))
        .collect();

    let outcome = flows::send_invitation(
        &state,
        &request.email,
        request.display_name.as_deref().unwrap_or(""),
        request.claims.as_ref(),
        (!params.is_empty()).then_some(params.as_slice()),
    )
    .await
    .map_err(invitation_error)?;

    Ok((
        StatusCode::CREATED,
        Json(InvitationResponse {
            url: outcome.url,
            sent: outcome.sent,
        }),
    ))
}
