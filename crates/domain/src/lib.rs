//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod security_role;

pub use security_role::{
    AssignmentId, AssignmentKey, RemoteIdentity, RemoteRole, RemoteRoleAssignment,
    RoleAssignmentDeclaration, parse_identity_id,
};
