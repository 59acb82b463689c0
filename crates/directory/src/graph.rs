//! Microsoft Graph Directory Client
//!
//! Each operation acquires a token, attaches it as a bearer header and makes
//! a single HTTP attempt. Non-success responses are logged with their raw
//! body at the point of detection.

use std::collections::HashSet;
use std::sync::Arc;

use idbridge_credentials::TokenProvider;
use reqwest::{header, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::template;
use crate::{
    DirectoryConfig, DirectoryError, DirectoryIdentity, DirectoryService, Group, MembershipRole,
};

const LOCAL_ACCOUNT_FILTER: &str = "creationType eq 'LocalAccount'";
const USER_SELECT: &str = "displayName,id,identities";
const GROUP_SELECT: &str = "id,displayName,description";

/// One page of an OData collection response.
#[derive(Debug, Deserialize)]
struct ODataPage<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

/// Quote a value for use inside an OData string literal.
fn odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Filter selecting users bound to `(issuer, value)`.
pub fn identity_filter(issuer: &str, value: &str) -> String {
    format!(
        "(identities/any(i:i/issuer eq '{}' and i/issuerAssignedId eq '{}'))",
        odata_literal(issuer),
        odata_literal(value)
    )
}

/// Reject ids that the URL parser would drop or resolve as a path step.
fn object_id(id: &str) -> Result<&str, DirectoryError> {
    match id {
        "" | "." | ".." => Err(DirectoryError::Configuration(format!(
            "Invalid directory object id '{id}'"
        ))),
        _ => Ok(id),
    }
}

/// Directory client backed by the Graph REST API.
pub struct GraphDirectoryClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    scope: String,
    local_identity_issuer: Option<String>,
    extension_app_id: Option<String>,
}

impl GraphDirectoryClient {
    pub fn new(config: DirectoryConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_http_client(config, tokens, reqwest::Client::new())
    }

    /// Use a caller-provided HTTP client (timeouts, proxies, TLS settings).
    pub fn with_http_client(
        config: DirectoryConfig,
        tokens: Arc<dyn TokenProvider>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            scope: config.scope,
            local_identity_issuer: config.local_identity_issuer,
            extension_app_id: config.extension_app_id,
        }
    }

    fn base(&self) -> Result<Url, DirectoryError> {
        Url::parse(&self.base_url).map_err(|e| {
            DirectoryError::Configuration(format!("Invalid directory URL {}: {e}", self.base_url))
        })
    }

    /// `{base}/{segments...}?{params}`. Each segment is percent-encoded as a
    /// whole, so ids cannot introduce `/`, `?` or `#` into the request path.
    fn url(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<Url, DirectoryError> {
        let mut url = self.base()?;
        url.path_segments_mut()
            .map_err(|_| {
                DirectoryError::Configuration(format!(
                    "Directory URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Build a request carrying a freshly acquired bearer token.
    async fn authorized(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
    ) -> Result<RequestBuilder, DirectoryError> {
        let token = self
            .tokens
            .acquire_token(&[self.scope.as_str()])
            .await
            .map_err(|e| {
                tracing::error!(operation, error = %e, "Failed to acquire directory token");
                DirectoryError::from(e)
            })?;

        Ok(self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, token.bearer()))
    }

    /// Send a request and return the body of a success response.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<String, DirectoryError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Directory request failed");
            DirectoryError::Request(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());

        if status.is_success() {
            return Ok(body);
        }

        tracing::error!(operation, status = %status, body = %body, "Directory call failed");
        Err(DirectoryError::CallFailed {
            status: status.as_u16(),
            body,
        })
    }

    fn parse<T: DeserializeOwned>(operation: &'static str, body: &str) -> Result<T, DirectoryError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(operation, error = %e, body = %body, "Unparseable directory response");
            DirectoryError::Response(format!("{operation}: {e}"))
        })
    }

    async fn set_account_enabled(
        &self,
        identity_id: &str,
        enabled: bool,
    ) -> Result<String, DirectoryError> {
        let url = self.url(&["users", object_id(identity_id)?], &[])?;
        let request = self
            .authorized("disable_user", Method::PATCH, url)
            .await?
            .json(&json!({ "accountEnabled": enabled }));
        self.execute("disable_user", request).await
    }

    /// Owners are referenced as users, members as any directory object.
    async fn add_reference(
        &self,
        group_id: &str,
        member_id: &str,
        role: MembershipRole,
    ) -> Result<String, DirectoryError> {
        let url = self.url(
            &["groups", object_id(group_id)?, role.relation(), "$ref"],
            &[],
        )?;
        let reference = self.url(&[role.object_type(), object_id(member_id)?], &[])?;
        let request = self
            .authorized("add_to_group", Method::POST, url)
            .await?
            .json(&json!({ "@odata.id": reference.as_str() }));
        self.execute("add_to_group", request).await
    }

    /// GET a collection, following `@odata.nextLink` until exhausted.
    async fn list_all<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        first: Url,
    ) -> Result<Vec<T>, DirectoryError> {
        let origin = self.base()?.origin();
        let mut visited = HashSet::new();
        let mut items = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            if url.origin() != origin || !visited.insert(url.to_string()) {
                tracing::error!(operation, url = %url, "Refusing to follow directory next link");
                return Err(DirectoryError::Response(format!(
                    "{operation}: next link {url} is off-origin or already visited"
                )));
            }

            let request = self.authorized(operation, Method::GET, url).await?;
            let body = self.execute(operation, request).await?;
            let page: ODataPage<T> = Self::parse(operation, &body)?;
            items.extend(page.value);

            next = match page.next_link {
                Some(link) => Some(Url::parse(&link).map_err(|e| {
                    DirectoryError::Response(format!("{operation}: invalid next link {link}: {e}"))
                })?),
                None => None,
            };
        }

        tracing::debug!(operation, count = items.len(), "Directory listing complete");
        Ok(items)
    }
}

#[async_trait::async_trait]
impl DirectoryService for GraphDirectoryClient {
    async fn find_user(
        &self,
        id_value: &str,
        id_issuer: Option<&str>,
    ) -> Result<Option<DirectoryIdentity>, DirectoryError> {
        if id_value.is_empty() {
            return Ok(None);
        }

        let issuer = match id_issuer.filter(|i| !i.is_empty()) {
            Some(issuer) => issuer,
            None => self.local_identity_issuer.as_deref().ok_or_else(|| {
                DirectoryError::Configuration(
                    "No issuer given and LOCAL_IDENTITY_ISSUER is not configured".to_string(),
                )
            })?,
        };

        let filter = identity_filter(issuer, id_value);
        let url = self.url(&["users"], &[("$filter", filter.as_str())])?;

        let request = self.authorized("find_user", Method::GET, url).await?;
        let body = self.execute("find_user", request).await?;
        let page: ODataPage<DirectoryIdentity> = Self::parse("find_user", &body)?;

        let found = page.value.into_iter().next();
        tracing::debug!(issuer = %issuer, found = found.is_some(), "Directory user lookup");
        Ok(found)
    }

    async fn new_user(&self, template_json: &str) -> Result<String, DirectoryError> {
        let json = template::apply(
            template_json,
            self.local_identity_issuer.as_deref(),
            self.extension_app_id.as_deref(),
        );

        let url = self.url(&["users"], &[])?;
        let request = self
            .authorized("new_user", Method::POST, url)
            .await?
            .header(header::CONTENT_TYPE, "application/json")
            .body(json);

        let body = self.execute("new_user", request).await?;
        let created: CreatedObject = Self::parse("new_user", &body)?;

        tracing::info!(user_id = %created.id, "Directory user created");
        Ok(created.id)
    }

    async fn disable_user(&self, identity_id: &str, is_blocked: bool) {
        match self.set_account_enabled(identity_id, !is_blocked).await {
            Ok(_) => tracing::info!(user_id = %identity_id, blocked = is_blocked, "Directory user enabled flag updated"),
            Err(e) => tracing::warn!(user_id = %identity_id, error = %e, "Ignoring failed enable/disable"),
        }
    }

    async fn add_to_group(&self, group_id: &str, member_id: &str, role: MembershipRole) -> bool {
        match self.add_reference(group_id, member_id, role).await {
            Ok(_) => {
                tracing::info!(group_id = %group_id, member_id = %member_id, role = role.relation(), "Added to group");
                true
            }
            Err(_) => false,
        }
    }

    async fn get_users(&self) -> Result<Vec<DirectoryIdentity>, DirectoryError> {
        let url = self.url(
            &["users"],
            &[("$filter", LOCAL_ACCOUNT_FILTER), ("$select", USER_SELECT)],
        )?;
        self.list_all("get_users", url).await
    }

    async fn get_groups(&self) -> Result<Vec<Group>, DirectoryError> {
        let url = self.url(&["groups"], &[("$select", GROUP_SELECT)])?;
        self.list_all("get_groups", url).await
    }
}
