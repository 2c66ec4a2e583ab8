use std::sync::Arc;

use rolesync_core::AppResult;
use rolesync_domain::{AssignmentId, RoleAssignmentDeclaration};
use tracing::{debug, info, warn};

use crate::operation_context::OperationContext;
use crate::resource_data::{ResourceData, read_declaration, write_remote_assignment};
use crate::security_role_ports::SecurityRoleClient;

/// Reconciles declared security role assignments against the remote service.
///
/// The service keeps no state between calls; every operation works on the
/// record it is given and the shared client handle.
#[derive(Clone)]
pub struct SecurityRoleAssignmentService {
    client: Arc<dyn SecurityRoleClient>,
}

impl SecurityRoleAssignmentService {
    /// Creates a new service from the remote client.
    #[must_use]
    pub fn new(client: Arc<dyn SecurityRoleClient>) -> Self {
        Self { client }
    }

    /// Creates the assignment for a new declaration.
    pub async fn create(
        &self,
        data: &mut ResourceData,
        context: &OperationContext,
    ) -> AppResult<()> {
        self.create_or_update(data, context).await
    }

    /// Applies a changed declaration.
    pub async fn update(
        &self,
        data: &mut ResourceData,
        context: &OperationContext,
    ) -> AppResult<()> {
        self.create_or_update(data, context).await
    }

    /// Sets the assignment remotely, then refreshes the record from remote state.
    ///
    /// The remote "set" call is an upsert, so creation and modification share
    /// this path. Each successful call stores a freshly generated identifier.
    /// On failure the record is left as it was.
    pub async fn create_or_update(
        &self,
        data: &mut ResourceData,
        context: &OperationContext,
    ) -> AppResult<()> {
        let declaration = read_declaration(data)?;
        let key = declaration.key();

        debug!(
            operation = %context.operation(),
            scope = %key.scope,
            resource_id = %key.resource_id,
            identity_id = %key.identity_id,
            role_name = %declaration.role_name(),
            "setting security role assignment"
        );
        context
            .run(
                self.client
                    .set_role_assignment(&key, declaration.role_name().as_str()),
            )
            .await?;

        let mut staged = data.clone();
        staged.set_id(&AssignmentId::generate());
        self.refresh(&mut staged, &declaration, context).await?;
        *data = staged;

        info!(
            operation = %context.operation(),
            id = %data.id(),
            scope = %key.scope,
            resource_id = %key.resource_id,
            identity_id = %key.identity_id,
            "security role assignment applied"
        );
        Ok(())
    }

    /// Refreshes the record from remote state.
    ///
    /// A missing assignment clears the identifier and still succeeds.
    pub async fn read(&self, data: &mut ResourceData, context: &OperationContext) -> AppResult<()> {
        let declaration = read_declaration(data)?;
        self.refresh(data, &declaration, context).await
    }

    /// Removes the assignment remotely.
    ///
    /// Errors are returned unchanged, including a missing assignment.
    pub async fn delete(
        &self,
        data: &mut ResourceData,
        context: &OperationContext,
    ) -> AppResult<()> {
        let declaration = read_declaration(data)?;
        let key = declaration.key();

        debug!(
            scope = %key.scope,
            resource_id = %key.resource_id,
            identity_id = %key.identity_id,
            "deleting security role assignment"
        );
        context
            .run(self.client.delete_role_assignment(&key))
            .await?;

        info!(
            id = %data.id(),
            scope = %key.scope,
            resource_id = %key.resource_id,
            identity_id = %key.identity_id,
            "security role assignment deleted"
        );
        Ok(())
    }

    async fn refresh(
        &self,
        data: &mut ResourceData,
        declaration: &RoleAssignmentDeclaration,
        context: &OperationContext,
    ) -> AppResult<()> {
        let key = declaration.key();

        debug!(
            scope = %key.scope,
            resource_id = %key.resource_id,
            identity_id = %key.identity_id,
            "reading security role assignment"
        );
        let remote = match context.run(self.client.get_role_assignment(&key)).await {
            Ok(remote) => remote,
            Err(error) if error.is_not_found() => {
                warn!(
                    id = %data.id(),
                    scope = %key.scope,
                    resource_id = %key.resource_id,
                    identity_id = %key.identity_id,
                    "security role assignment not found, clearing identifier"
                );
                data.clear_id();
                return Ok(());
            }
            Err(error) => return Err(error.with_context("reading security role assignment")),
        };

        if remote.is_absent() {
            warn!(
                id = %data.id(),
                scope = %key.scope,
                resource_id = %key.resource_id,
                identity_id = %key.identity_id,
                "security role assignment reported empty, clearing identifier"
            );
            data.clear_id();
            return Ok(());
        }

        if remote
            .role
            .as_ref()
            .is_some_and(|role| role.scope.trim().is_empty() || role.name.trim().is_empty())
        {
            warn!(
                id = %data.id(),
                scope = %key.scope,
                resource_id = %key.resource_id,
                identity_id = %key.identity_id,
                "security role assignment reported with an empty role field"
            );
        }
        write_remote_assignment(data, &remote);

        Ok(())
    }
}
