//! Security role assignment domain types.
//!
//! A role assignment grants a principal a named role on one resource inside a
//! scope. The remote authorization service addresses an assignment by the
//! `(scope, resource, identity)` triple and exposes no identifier of its own,
//! so the local [`AssignmentId`] is a generated marker only.

use rolesync_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque local identifier for a reconciled role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId(String);

impl AssignmentId {
    /// Prefix carried by every generated identifier.
    pub const PREFIX: &'static str = "sra-";

    /// Generates a fresh identifier of the form `sra-<uuid>`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::new_v4()))
    }

    /// Wraps a previously stored identifier without inspecting it.
    #[must_use]
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<AssignmentId> for String {
    fn from(value: AssignmentId) -> Self {
        value.0
    }
}

/// Parses a principal identifier, failing with [`AppError::InvalidInput`].
pub fn parse_identity_id(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|error| {
        AppError::InvalidInput(format!("identity_id '{value}' is not a valid UUID: {error}"))
    })
}

/// Lookup triple addressing one assignment on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssignmentKey {
    /// Object hierarchy the role applies within.
    pub scope: NonEmptyString,
    /// Object inside the scope.
    pub resource_id: NonEmptyString,
    /// Principal receiving the role.
    pub identity_id: Uuid,
}

/// Declared role assignment with every attribute validated and typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentDeclaration {
    scope: NonEmptyString,
    resource_id: NonEmptyString,
    identity_id: Uuid,
    role_name: NonEmptyString,
}

impl RoleAssignmentDeclaration {
    /// Creates a declaration from already typed attributes.
    #[must_use]
    pub fn new(
        scope: NonEmptyString,
        resource_id: NonEmptyString,
        identity_id: Uuid,
        role_name: NonEmptyString,
    ) -> Self {
        Self {
            scope,
            resource_id,
            identity_id,
            role_name,
        }
    }

    /// Creates a declaration from raw attribute values.
    ///
    /// Empty strings fail with [`AppError::Validation`]; a malformed identity
    /// fails with [`AppError::InvalidInput`].
    pub fn parse(
        scope: &str,
        resource_id: &str,
        identity_id: &str,
        role_name: &str,
    ) -> AppResult<Self> {
        let identity_id = parse_identity_id(identity_id)?;

        Ok(Self {
            scope: NonEmptyString::new(scope)
                .map_err(|error| error.with_context("scope"))?,
            resource_id: NonEmptyString::new(resource_id)
                .map_err(|error| error.with_context("resource_id"))?,
            identity_id,
            role_name: NonEmptyString::new(role_name)
                .map_err(|error| error.with_context("role_name"))?,
        })
    }

    /// Returns the scope.
    #[must_use]
    pub fn scope(&self) -> &NonEmptyString {
        &self.scope
    }

    /// Returns the resource identifier.
    #[must_use]
    pub fn resource_id(&self) -> &NonEmptyString {
        &self.resource_id
    }

    /// Returns the principal identifier.
    #[must_use]
    pub fn identity_id(&self) -> Uuid {
        self.identity_id
    }

    /// Returns the granted role name.
    #[must_use]
    pub fn role_name(&self) -> &NonEmptyString {
        &self.role_name
    }

    /// Returns the triple used to look up or delete the assignment.
    #[must_use]
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            scope: self.scope.clone(),
            resource_id: self.resource_id.clone(),
            identity_id: self.identity_id,
        }
    }
}

/// Role sub-record of a remote assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRole {
    /// Scope the role is defined in.
    pub scope: String,
    /// Role name.
    pub name: String,
    /// Human readable role name.
    pub display_name: Option<String>,
}

/// Identity sub-record of a remote assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    /// Principal identifier.
    pub id: Uuid,
    /// Human readable principal name.
    pub display_name: Option<String>,
}

/// Role assignment as reported by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRoleAssignment {
    /// Assigned role, if reported.
    pub role: Option<RemoteRole>,
    /// Assigned principal, if reported.
    pub identity: Option<RemoteIdentity>,
    /// Whether the assignment is direct or inherited, if reported.
    pub access: Option<String>,
}

impl RemoteRoleAssignment {
    /// Returns whether the record signals that no assignment exists.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.role.is_none() && self.identity.is_none()
    }
}
