//! Authorization redirect URL assembly for hosted B2C policies

use std::collections::HashMap;

use crate::InvitationConfig;

pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Form-urlencode a value (spaces become `+`).
pub fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Base authorize URL for `config`'s tenant and policy carrying `assertion`.
///
/// `login_hint` is the raw email; only the redirect URI is encoded.
pub fn authorize_url(config: &InvitationConfig, email: &str, assertion: &str) -> String {
    format!(
        "https://{tenant}.b2clogin.com/{tenant}.onmicrosoft.com/{policy}/oauth2/v2.0/authorize\
         ?client_id={client_id}\
         &login_hint={email}\
         &response_mode=form_post\
         &nonce=defaultNonce\
         &redirect_uri={redirect}\
         &scope=openid\
         &response_type=code\
         &prompt=login\
         &client_assertion_type={assertion_type}\
         &client_assertion={assertion}",
        tenant = config.tenant_name,
        policy = config.policy,
        client_id = config.client_id,
        email = email,
        redirect = encode_component(&config.redirect_uri),
        assertion_type = CLIENT_ASSERTION_TYPE,
        assertion = assertion,
    )
}

/// Append `&key=value` pairs verbatim, in order.
pub fn append_params<K: AsRef<str>, V: AsRef<str>>(url: &mut String, params: &[(K, V)]) {
    for (key, value) in params {
        url.push('&');
        url.push_str(key.as_ref());
        url.push('=');
        url.push_str(value.as_ref());
    }
}

/// Lower-cased domain part of an email: the segment after the first `@`.
pub fn email_domain(email: &str) -> Option<String> {
    email
        .split('@')
        .nth(1)
        .filter(|d| !d.is_empty())
        .map(str::to_lowercase)
}

/// Mapped domain hint for `email`, if its domain has an entry.
pub fn domain_hint<'a>(mappings: &'a HashMap<String, String>, email: &str) -> Option<&'a str> {
    let domain = email_domain(email)?;
    mappings.get(&domain).map(String::as_str)
}
