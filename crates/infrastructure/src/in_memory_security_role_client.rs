use std::collections::HashMap;

use async_trait::async_trait;
use rolesync_application::SecurityRoleClient;
use rolesync_core::{AppError, AppResult};
use rolesync_domain::{AssignmentKey, RemoteIdentity, RemoteRole, RemoteRoleAssignment};
use tokio::sync::RwLock;

/// In-memory security role client implementation.
///
/// Behaves like the remote API: "set" replaces the role for a triple, reads of
/// unknown triples return an empty record and deletes of unknown triples fail.
#[derive(Debug, Default)]
pub struct InMemorySecurityRoleClient {
    assignments: RwLock<HashMap<AssignmentKey, String>>,
}

impl InMemorySecurityRoleClient {
    /// Creates an empty client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assignments: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of stored assignments.
    pub async fn len(&self) -> usize {
        self.assignments.read().await.len()
    }

    /// Returns whether no assignment is stored.
    pub async fn is_empty(&self) -> bool {
        self.assignments.read().await.is_empty()
    }
}

#[async_trait]
impl SecurityRoleClient for InMemorySecurityRoleClient {
    async fn set_role_assignment(&self, key: &AssignmentKey, role_name: &str) -> AppResult<()> {
        self.assignments
            .write()
            .await
            .insert(key.clone(), role_name.to_owned());
        Ok(())
    }

    async fn get_role_assignment(&self, key: &AssignmentKey) -> AppResult<RemoteRoleAssignment> {
        Ok(self
            .assignments
            .read()
            .await
            .get(key)
            .map(|role_name| RemoteRoleAssignment {
                role: Some(RemoteRole {
                    scope: key.scope.as_str().to_owned(),
                    name: role_name.clone(),
                    display_name: None,
                }),
                identity: Some(RemoteIdentity {
                    id: key.identity_id,
                    display_name: None,
                }),
                access: Some("assigned".to_owned()),
            })
            .unwrap_or_default())
    }

    async fn delete_role_assignment(&self, key: &AssignmentKey) -> AppResult<()> {
        self.assignments
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no role assignment for identity '{}' on '{}/{}'",
                    key.identity_id, key.scope, key.resource_id
                ))
            })
    }
}
