use async_trait::async_trait;

use rolesync_core::AppResult;
use rolesync_domain::{AssignmentKey, RemoteRoleAssignment};

/// Client port for the remote role assignment API.
///
/// Implementations report a missing assignment with
/// [`rolesync_core::AppError::NotFound`] and own any retry policy.
#[async_trait]
pub trait SecurityRoleClient: Send + Sync {
    /// Creates or replaces the role granted to an identity on a resource.
    async fn set_role_assignment(&self, key: &AssignmentKey, role_name: &str) -> AppResult<()>;

    /// Returns the assignment for the lookup triple.
    ///
    /// A record with neither role nor identity also means no assignment exists.
    async fn get_role_assignment(&self, key: &AssignmentKey) -> AppResult<RemoteRoleAssignment>;

    /// Removes the assignment for the lookup triple.
    async fn delete_role_assignment(&self, key: &AssignmentKey) -> AppResult<()>;
}
