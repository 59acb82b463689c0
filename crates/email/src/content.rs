//! Shared email content templates
//!
//! Canonical content generators for invitation emails, used by every
//! provider. Markup lives under `templates/` and is HTML-escaped by askama.

use askama::Template;

use crate::EmailError;

#[derive(Template)]
#[template(path = "invitation.html")]
struct InvitationTemplate<'a> {
    display_name: &'a str,
    invitation_url: &'a str,
}

/// Render the styled HTML body for an invitation email.
pub fn invitation_html(display_name: &str, invitation_url: &str) -> Result<String, EmailError> {
    InvitationTemplate {
        display_name,
        invitation_url,
    }
    .render()
    .map_err(|e| EmailError::Template(e.to_string()))
}
