//! Schema descriptor for the security role assignment resource.

use std::time::Duration;

use rolesync_core::{AppError, AppResult};
use serde_json::Value;
use uuid::Uuid;

use crate::resource_data::ResourceData;

/// Attribute holding the object hierarchy the role applies within.
pub const SCOPE_ATTRIBUTE: &str = "scope";
/// Attribute holding the object inside the scope.
pub const RESOURCE_ID_ATTRIBUTE: &str = "resource_id";
/// Attribute holding the principal UUID.
pub const IDENTITY_ID_ATTRIBUTE: &str = "identity_id";
/// Attribute holding the granted role name.
pub const ROLE_NAME_ATTRIBUTE: &str = "role_name";

/// Lifecycle operation scheduled by the state engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// First reconciliation of a new declaration.
    Create,
    /// Refresh from remote state.
    Read,
    /// Reconciliation of a changed declaration.
    Update,
    /// Removal of the declaration.
    Delete,
}

impl Operation {
    /// Returns a stable lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown operation '{value}', expected create, read, update or delete"
            ))),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Upper time bounds per lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTimeouts {
    /// Budget for create.
    pub create: Duration,
    /// Budget for read.
    pub read: Duration,
    /// Budget for update.
    pub update: Duration,
    /// Budget for delete.
    pub delete: Duration,
}

impl ResourceTimeouts {
    /// Returns the budget for one operation.
    #[must_use]
    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(10 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(10 * 60),
            delete: Duration::from_secs(10 * 60),
        }
    }
}

/// Value type of a schema attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// UTF-8 string value.
    String,
}

/// Syntactic rule applied to an attribute before any remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValidation {
    /// Value must contain a non-whitespace character.
    NonEmpty,
    /// Value must parse as a UUID.
    Uuid,
}

impl AttributeValidation {
    fn check(self, value: &str) -> Result<(), String> {
        match self {
            Self::NonEmpty if value.trim().is_empty() => {
                Err("must not be empty or whitespace".to_owned())
            }
            Self::NonEmpty => Ok(()),
            Self::Uuid => Uuid::parse_str(value)
                .map(|_| ())
                .map_err(|error| format!("must be a valid UUID: {error}")),
        }
    }
}

/// Declaration of one resource attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    /// Attribute key in the resource record.
    pub name: &'static str,
    /// Value type.
    pub kind: AttributeType,
    /// Whether the attribute must be supplied.
    pub required: bool,
    /// Validation rule.
    pub validation: AttributeValidation,
    /// Short human readable description.
    pub description: &'static str,
}

/// Shape, validation rules and timeout budgets of a managed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    /// Resource type name registered with the state engine.
    pub type_name: &'static str,
    /// Declared attributes.
    pub attributes: Vec<AttributeSchema>,
    /// Per-operation timeout budgets.
    pub timeouts: ResourceTimeouts,
}

impl ResourceSchema {
    /// Returns the schema of a security role assignment.
    #[must_use]
    pub fn security_role_assignment() -> Self {
        Self {
            type_name: "securityrole_assignment",
            attributes: vec![
                AttributeSchema {
                    name: SCOPE_ATTRIBUTE,
                    kind: AttributeType::String,
                    required: true,
                    validation: AttributeValidation::NonEmpty,
                    description: "Object hierarchy the role applies within",
                },
                AttributeSchema {
                    name: RESOURCE_ID_ATTRIBUTE,
                    kind: AttributeType::String,
                    required: true,
                    validation: AttributeValidation::NonEmpty,
                    description: "Object inside the scope the role applies to",
                },
                AttributeSchema {
                    name: IDENTITY_ID_ATTRIBUTE,
                    kind: AttributeType::String,
                    required: true,
                    validation: AttributeValidation::Uuid,
                    description: "User or group receiving the role",
                },
                AttributeSchema {
                    name: ROLE_NAME_ATTRIBUTE,
                    kind: AttributeType::String,
                    required: true,
                    validation: AttributeValidation::NonEmpty,
                    description: "Name of the granted role",
                },
            ],
            timeouts: ResourceTimeouts::default(),
        }
    }

    /// Returns an attribute declaration by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
    }

    /// Validates a resource record against the schema.
    ///
    /// Every violation is collected into a single [`AppError::Validation`].
    pub fn validate(&self, data: &ResourceData) -> AppResult<()> {
        let mut violations = Vec::new();

        for attribute in &self.attributes {
            match data.attribute(attribute.name) {
                None | Some(Value::Null) if attribute.required => {
                    violations.push(format!("'{}' is required", attribute.name));
                }
                None | Some(Value::Null) => {}
                Some(Value::String(value)) => {
                    if let Err(reason) = attribute.validation.check(value) {
                        violations.push(format!("'{}' {reason}", attribute.name));
                    }
                }
                Some(_) => violations.push(format!("'{}' must be a string", attribute.name)),
            }
        }

        for name in data.attribute_names() {
            if self.attribute(name).is_none() {
                violations.push(format!("'{name}' is not a supported attribute"));
            }
        }

        if violations.is_empty() {
            return Ok(());
        }

        Err(AppError::Validation(format!(
            "{}: {}",
            self.type_name,
            violations.join("; ")
        )))
    }
}
