use std::time::Duration;

use async_trait::async_trait;
use rolesync_application::SecurityRoleClient;
use rolesync_core::{AppError, AppResult};
use rolesync_domain::{AssignmentKey, RemoteIdentity, RemoteRole, RemoteRoleAssignment};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// API version sent when none is configured.
pub const DEFAULT_API_VERSION: &str = "5.1-preview.1";

/// Per-request timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`HttpSecurityRoleClient`].
#[derive(Debug, Clone)]
pub struct HttpSecurityRoleClientConfig {
    /// Organization base URL, e.g. `https://dev.azure.com/contoso`.
    pub organization_url: Url,
    /// Personal access token sent with basic authentication.
    pub personal_access_token: String,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,
}

impl HttpSecurityRoleClientConfig {
    /// Creates a configuration with default API version and timeout.
    pub fn new(
        organization_url: &str,
        personal_access_token: impl Into<String>,
    ) -> AppResult<Self> {
        let organization_url = Url::parse(organization_url).map_err(|error| {
            AppError::Validation(format!(
                "invalid organization URL '{organization_url}': {error}"
            ))
        })?;
        if organization_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "organization URL '{organization_url}' cannot be used as a base URL"
            )));
        }

        let personal_access_token = personal_access_token.into();
        if personal_access_token.trim().is_empty() {
            return Err(AppError::Validation(
                "personal access token must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            organization_url,
            personal_access_token,
            api_version: DEFAULT_API_VERSION.to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetRoleAssignmentRequest<'a> {
    role_name: &'a str,
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct RoleAssignmentListResponse {
    #[serde(default)]
    value: Vec<RoleAssignmentResponse>,
}

#[derive(Debug, Deserialize)]
struct RoleAssignmentResponse {
    identity: Option<IdentityResponse>,
    role: Option<RoleResponse>,
    access: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    id: Uuid,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleResponse {
    name: String,
    scope: String,
    display_name: Option<String>,
}

impl From<RoleAssignmentResponse> for RemoteRoleAssignment {
    fn from(value: RoleAssignmentResponse) -> Self {
        Self {
            role: value.role.map(|role| RemoteRole {
                scope: role.scope,
                name: role.name,
                display_name: role.display_name,
            }),
            identity: value.identity.map(|identity| RemoteIdentity {
                id: identity.id,
                display_name: identity.display_name,
            }),
            access: value.access,
        }
    }
}

/// HTTP implementation of the security roles REST API.
///
/// Requests are sent once; retries belong to the caller's transport policy.
pub struct HttpSecurityRoleClient {
    http_client: reqwest::Client,
    config: HttpSecurityRoleClientConfig,
}

impl HttpSecurityRoleClient {
    /// Creates a client with its own connection pool.
    pub fn new(config: HttpSecurityRoleClientConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self::with_http_client(http_client, config))
    }

    /// Creates a client reusing an existing HTTP client.
    #[must_use]
    pub fn with_http_client(
        http_client: reqwest::Client,
        config: HttpSecurityRoleClientConfig,
    ) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn assignments_url(&self, key: &AssignmentKey) -> AppResult<Url> {
        let mut url = self.config.organization_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::Internal(format!(
                    "organization URL '{}' cannot be used as a base URL",
                    self.config.organization_url
                ))
            })?
            .pop_if_empty()
            .extend([
                "_apis",
                "securityroles",
                "scopes",
                key.scope.as_str(),
                "roleassignments",
                "resources",
                key.resource_id.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("api-version", self.config.api_version.as_str());

        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AppResult<reqwest::Response> {
        let response = request
            .basic_auth("", Some(self.config.personal_access_token.as_str()))
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    AppError::DeadlineExceeded(format!("security roles request timed out: {error}"))
                } else {
                    AppError::Remote(format!("security roles transport error: {error}"))
                }
            })?;

        let status = response.status();
        debug!(status = %status, url = %response.url(), "security roles response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<response body unavailable>".to_owned());
        Err(status_error(status, body.as_str()))
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> AppError {
    let message = format!("security roles request failed with status {status}: {body}");
    match status {
        reqwest::StatusCode::NOT_FOUND => AppError::NotFound(message),
        reqwest::StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        reqwest::StatusCode::FORBIDDEN => AppError::Forbidden(message),
        reqwest::StatusCode::CONFLICT => AppError::Conflict(message),
        reqwest::StatusCode::BAD_REQUEST => AppError::Validation(message),
        _ => AppError::Remote(message),
    }
}

#[async_trait]
impl SecurityRoleClient for HttpSecurityRoleClient {
    async fn set_role_assignment(&self, key: &AssignmentKey, role_name: &str) -> AppResult<()> {
        let url = self.assignments_url(key)?;
        let body = [SetRoleAssignmentRequest {
            role_name,
            user_id: key.identity_id,
        }];

        self.send(self.http_client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn get_role_assignment(&self, key: &AssignmentKey) -> AppResult<RemoteRoleAssignment> {
        let url = self.assignments_url(key)?;
        let response = self.send(self.http_client.get(url)).await?;
        let assignments = response
            .json::<RoleAssignmentListResponse>()
            .await
            .map_err(|error| {
                AppError::Remote(format!("invalid security roles response: {error}"))
            })?;

        Ok(assignments
            .value
            .into_iter()
            .find(|assignment| {
                assignment
                    .identity
                    .as_ref()
                    .is_some_and(|identity| identity.id == key.identity_id)
            })
            .map(RemoteRoleAssignment::from)
            .unwrap_or_default())
    }

    async fn delete_role_assignment(&self, key: &AssignmentKey) -> AppResult<()> {
        let url = self.assignments_url(key)?;
        let body = [key.identity_id];

        self.send(self.http_client.patch(url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::put;
    use axum::{Json, Router};
    use rolesync_application::SecurityRoleClient;
    use rolesync_core::{AppError, NonEmptyString};
    use rolesync_domain::AssignmentKey;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::{HttpSecurityRoleClient, HttpSecurityRoleClientConfig};

    const AUTHORIZATION: &str = "Basic OnRlc3QtcGF0";

    type Assignments = HashMap<(String, String), Vec<(Uuid, String)>>;

    #[derive(Clone, Default)]
    struct FakeApi {
        assignments: Arc<Mutex<Assignments>>,
        api_versions: Arc<Mutex<Vec<String>>>,
    }

    impl FakeApi {
        async fn check(
            &self,
            headers: &HeaderMap,
            scope: &str,
            query: &HashMap<String, String>,
        ) -> Result<(), StatusCode> {
            if headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                != Some(AUTHORIZATION)
            {
                return Err(StatusCode::UNAUTHORIZED);
            }
            if let Some(version) = query.get("api-version") {
                self.api_versions.lock().await.push(version.clone());
            }
            match scope {
                "forbidden" => Err(StatusCode::FORBIDDEN),
                "missing" => Err(StatusCode::NOT_FOUND),
                "broken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
                _ => Ok(()),
            }
        }
    }

    async fn set_assignments(
        State(api): State<FakeApi>,
        Path((scope, resource_id)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<Vec<Value>>,
    ) -> StatusCode {
        if let Err(status) = api.check(&headers, &scope, &query).await {
            return status;
        }

        let mut assignments = api.assignments.lock().await;
        let entries = assignments.entry((scope, resource_id)).or_default();
        for item in body {
            let user_id = item
                .get("userId")
                .and_then(Value::as_str)
                .and_then(|value| Uuid::parse_str(value).ok());
            let role_name = item.get("roleName").and_then(Value::as_str);
            let (Some(user_id), Some(role_name)) = (user_id, role_name) else {
                return StatusCode::BAD_REQUEST;
            };
            entries.retain(|(stored, _)| *stored != user_id);
            entries.push((user_id, role_name.to_owned()));
        }

        StatusCode::OK
    }

    async fn list_assignments(
        State(api): State<FakeApi>,
        Path((scope, resource_id)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Result<Json<Value>, StatusCode> {
        api.check(&headers, &scope, &query).await?;

        let assignments = api.assignments.lock().await;
        let value: Vec<Value> = assignments
            .get(&(scope.clone(), resource_id))
            .map(|entries| {
                entries
                    .iter()
                    .map(|(user_id, role_name)| {
                        json!({
                            "identity": { "id": user_id, "displayName": "Build Service" },
                            "role": {
                                "name": role_name,
                                "scope": scope,
                                "displayName": role_name,
                            },
                            "access": "assigned",
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Json(json!({ "count": value.len(), "value": value })))
    }

    async fn remove_assignments(
        State(api): State<FakeApi>,
        Path((scope, resource_id)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<Vec<Uuid>>,
    ) -> StatusCode {
        if let Err(status) = api.check(&headers, &scope, &query).await {
            return status;
        }

        if let Some(entries) = api.assignments.lock().await.get_mut(&(scope, resource_id)) {
            entries.retain(|(stored, _)| !body.contains(stored));
        }

        StatusCode::NO_CONTENT
    }

    async fn spawn_api(api: FakeApi) -> String {
        let router = Router::new()
            .route(
                "/contoso/_apis/securityroles/scopes/{scope}/roleassignments/resources/{resource_id}",
                put(set_assignments)
                    .get(list_assignments)
                    .patch(remove_assignments),
            )
            .with_state(api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await;
        assert!(listener.is_ok());
        let listener = listener.unwrap_or_else(|_| unreachable!());
        let address = listener.local_addr();
        assert!(address.is_ok());
        let address = address.unwrap_or_else(|_| unreachable!());

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        format!("http://{address}/contoso")
    }

    fn client(base_url: &str, token: &str) -> HttpSecurityRoleClient {
        let config = HttpSecurityRoleClientConfig::new(base_url, token);
        assert!(config.is_ok());
        let client = HttpSecurityRoleClient::new(config.unwrap_or_else(|_| unreachable!()));
        assert!(client.is_ok());
        client.unwrap_or_else(|_| unreachable!())
    }

    fn key(scope: &str, resource_id: &str, identity_id: Uuid) -> AssignmentKey {
        AssignmentKey {
            scope: NonEmptyString::new(scope).unwrap_or_else(|_| unreachable!()),
            resource_id: NonEmptyString::new(resource_id).unwrap_or_else(|_| unreachable!()),
            identity_id,
        }
    }

    #[test]
    fn config_rejects_invalid_values() {
        assert!(matches!(
            HttpSecurityRoleClientConfig::new("not a url", "pat"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            HttpSecurityRoleClientConfig::new("mailto:ops@example.com", "pat"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            HttpSecurityRoleClientConfig::new("https://dev.azure.com/contoso", " "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn assignments_url_encodes_segments_and_version() {
        let client = client("https://dev.azure.com/contoso/", "test-pat");
        let url = client.assignments_url(&key(
            "distributedtask.environmentreferencerole",
            "proj1_env 7",
            Uuid::nil(),
        ));

        assert!(url.is_ok());
        assert_eq!(
            url.map(String::from).unwrap_or_default(),
            "https://dev.azure.com/contoso/_apis/securityroles/scopes/distributedtask.environmentreferencerole/roleassignments/resources/proj1_env%207?api-version=5.1-preview.1"
        );
    }

    #[tokio::test]
    async fn set_then_get_returns_matching_assignment() {
        let api = FakeApi::default();
        let base_url = spawn_api(api.clone()).await;
        let client = client(&base_url, "test-pat");
        let identity_id = Uuid::new_v4();
        let other_identity = Uuid::new_v4();

        assert!(
            client
                .set_role_assignment(&key("proj1", "repo42", other_identity), "Administrator")
                .await
                .is_ok()
        );
        assert!(
            client
                .set_role_assignment(&key("proj1", "repo42", identity_id), "Reader")
                .await
                .is_ok()
        );

        let assignment = client
            .get_role_assignment(&key("proj1", "repo42", identity_id))
            .await;
        assert!(assignment.is_ok());
        let assignment = assignment.unwrap_or_default();

        let role = assignment.role.unwrap_or_else(|| unreachable!());
        assert_eq!(role.name, "Reader");
        assert_eq!(role.scope, "proj1");
        assert_eq!(assignment.identity.map(|identity| identity.id), Some(identity_id));
        assert_eq!(assignment.access.as_deref(), Some("assigned"));
        assert!(
            api.api_versions
                .lock()
                .await
                .iter()
                .all(|version| version == "5.1-preview.1")
        );
    }

    #[tokio::test]
    async fn get_without_matching_identity_is_absent() {
        let base_url = spawn_api(FakeApi::default()).await;
        let client = client(&base_url, "test-pat");

        let assignment = client
            .get_role_assignment(&key("proj1", "repo42", Uuid::new_v4()))
            .await;

        assert!(assignment.is_ok());
        assert!(assignment.unwrap_or_default().is_absent());
    }

    #[tokio::test]
    async fn delete_removes_only_the_identity() {
        let base_url = spawn_api(FakeApi::default()).await;
        let client = client(&base_url, "test-pat");
        let removed = Uuid::new_v4();
        let kept = Uuid::new_v4();
        for identity_id in [removed, kept] {
            assert!(
                client
                    .set_role_assignment(&key("proj1", "repo42", identity_id), "Reader")
                    .await
                    .is_ok()
            );
        }

        let deleted = client
            .delete_role_assignment(&key("proj1", "repo42", removed))
            .await;
        assert!(deleted.is_ok());

        let removed_assignment = client
            .get_role_assignment(&key("proj1", "repo42", removed))
            .await;
        let kept_assignment = client
            .get_role_assignment(&key("proj1", "repo42", kept))
            .await;
        assert!(removed_assignment.unwrap_or_default().is_absent());
        assert!(!kept_assignment.unwrap_or_default().is_absent());
    }

    #[tokio::test]
    async fn statuses_map_to_error_categories() {
        let base_url = spawn_api(FakeApi::default()).await;
        let client = client(&base_url, "test-pat");
        let identity_id = Uuid::new_v4();

        let missing = client
            .get_role_assignment(&key("missing", "repo42", identity_id))
            .await;
        let forbidden = client
            .set_role_assignment(&key("forbidden", "repo42", identity_id), "Reader")
            .await;
        let broken = client
            .delete_role_assignment(&key("broken", "repo42", identity_id))
            .await;

        assert!(missing.as_ref().is_err_and(AppError::is_not_found));
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));
        assert!(matches!(broken, Err(AppError::Remote(_))));
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let base_url = spawn_api(FakeApi::default()).await;
        let client = client(&base_url, "other-pat");

        let result = client
            .get_role_assignment(&key("proj1", "repo42", Uuid::new_v4()))
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn unreachable_service_is_remote_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await;
        assert!(listener.is_ok());
        let address = listener
            .unwrap_or_else(|_| unreachable!())
            .local_addr()
            .unwrap_or_else(|_| unreachable!());
        let client = client(&format!("http://{address}/contoso"), "test-pat");

        let result = client
            .delete_role_assignment(&key("proj1", "repo42", Uuid::new_v4()))
            .await;

        assert!(matches!(result, Err(AppError::Remote(_))));
    }
}
