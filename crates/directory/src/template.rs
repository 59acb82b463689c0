//! New-user template substitution
//!
//! Templates are raw JSON text. Substitution is literal string replacement,
//! not JSON-aware: every occurrence of a placeholder is replaced wherever it
//! appears in the payload.

/// Placeholder replaced by the local identity issuer.
pub const ISSUER_PLACEHOLDER: &str = "{issuer}";

/// Prefix of unqualified extension attribute names.
pub const EXTENSION_PREFIX: &str = "extension_";

/// Tenant-scoped prefix for extension attributes owned by `app_id`:
/// `extension_<app id without hyphens>_`.
pub fn extension_prefix(app_id: &str) -> String {
    format!("{}{}_", EXTENSION_PREFIX, app_id.replace('-', ""))
}

/// Apply the issuer and extension substitutions. Each one is skipped when its
/// setting is absent or empty.
pub fn apply(template: &str, local_issuer: Option<&str>, extension_app_id: Option<&str>) -> String {
    let mut json = template.to_string();

    if let Some(issuer) = local_issuer.filter(|s| !s.is_empty()) {
        json = json.replace(ISSUER_PLACEHOLDER, issuer);
    }

    if let Some(app_id) = extension_app_id.filter(|s| !s.is_empty()) {
        json = json.replace(EXTENSION_PREFIX, &extension_prefix(app_id));
    }

    json
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_ID: &str = "11112222-aaaa-bbbb-cccc-333344445555";

    #[test]
    fn test_issuer_placeholder_replaced() {
        let template = r#"{"identities":[{"issuer":"{issuer}","issuerAssignedId":"a@b.com"}]}"#;
        let json = apply(template, Some("issuer1"), None);
        assert_eq!(
            json,
            r#"{"identities":[{"issuer":"issuer1","issuerAssignedId":"a@b.com"}]}"#
        );
    }

    #[test]
    fn test_extension_attribute_qualified() {
        let json = apply(r#"{"extension_attr":"x"}"#, None, Some(APP_ID));
        assert_eq!(
            json,
            r#"{"extension_11112222aaaabbbbcccc333344445555_attr":"x"}"#
        );
    }

    #[test]
    fn test_unset_settings_leave_template_untouched() {
        let template = r#"{"issuer":"{issuer}","extension_attr":"x"}"#;
        assert_eq!(apply(template, None, None), template);
        assert_eq!(apply(template, Some(""), Some("")), template);
    }

    #[test]
    fn test_replacement_is_literal_everywhere() {
        // Values are rewritten too, not only keys.
        let json = apply(
            r#"{"displayName":"{issuer} user","note":"extension_x"}"#,
            Some("contoso"),
            Some("ab-cd"),
        );
        assert_eq!(
            json,
            r#"{"displayName":"contoso user","note":"extension_abcd_x"}"#
        );
    }
}
