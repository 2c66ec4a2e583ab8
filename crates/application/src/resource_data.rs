//! Generic attribute record exchanged with the state engine.
//!
//! The reconciler only works on [`RoleAssignmentDeclaration`]; this module is
//! the single place where the untyped record is read and written.

use rolesync_core::{AppError, AppResult};
use rolesync_domain::{AssignmentId, RemoteRoleAssignment, RoleAssignmentDeclaration};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resource_schema::{
    IDENTITY_ID_ATTRIBUTE, RESOURCE_ID_ATTRIBUTE, ROLE_NAME_ATTRIBUTE, SCOPE_ATTRIBUTE,
};

/// Persisted attributes of one managed resource.
///
/// An empty `id` tells the engine that the record maps to nothing real.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl ResourceData {
    /// Creates an empty record without identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record with a string attribute set.
    #[must_use]
    pub fn with_string(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_string(name, value);
        self
    }

    /// Returns the stored identifier, empty when unset.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns whether the record maps to an existing resource.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Stores the identifier.
    pub fn set_id(&mut self, id: &AssignmentId) {
        self.id = id.as_str().to_owned();
    }

    /// Resets the identifier so the engine schedules recreation.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Returns a raw attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns the names of every stored attribute.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Returns a string attribute, if present and a string.
    #[must_use]
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Sets a string attribute.
    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.attributes
            .insert(name.to_owned(), Value::String(value.into()));
    }
}

/// Reads a typed declaration out of a resource record.
///
/// Missing attributes fail with [`AppError::Validation`]; an identity that is
/// not a UUID fails with [`AppError::InvalidInput`].
pub fn read_declaration(data: &ResourceData) -> AppResult<RoleAssignmentDeclaration> {
    RoleAssignmentDeclaration::parse(
        required_string(data, SCOPE_ATTRIBUTE)?,
        required_string(data, RESOURCE_ID_ATTRIBUTE)?,
        required_string(data, IDENTITY_ID_ATTRIBUTE)?,
        required_string(data, ROLE_NAME_ATTRIBUTE)?,
    )
}

/// Overwrites the attributes the remote record reports.
///
/// `scope` and `role_name` follow the remote role, `identity_id` follows the
/// remote identity. Attributes the remote leaves out keep their stored text,
/// and `resource_id` is never reported remotely.
pub fn write_remote_assignment(data: &mut ResourceData, remote: &RemoteRoleAssignment) {
    if let Some(role) = &remote.role {
        data.set_string(SCOPE_ATTRIBUTE, role.scope.as_str());
        data.set_string(ROLE_NAME_ATTRIBUTE, role.name.as_str());
    }
    if let Some(identity) = &remote.identity {
        data.set_string(IDENTITY_ID_ATTRIBUTE, identity.id.to_string());
    }
}

fn required_string<'a>(data: &'a ResourceData, name: &str) -> AppResult<&'a str> {
    data.get_string(name)
        .ok_or_else(|| AppError::Validation(format!("'{name}' is required and must be a string")))
}
