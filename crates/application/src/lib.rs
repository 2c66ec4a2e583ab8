//! Application services and ports.

#![forbid(unsafe_code)]

mod operation_context;
mod resource_data;
mod resource_schema;
mod security_role_assignment_service;
mod security_role_ports;

pub use operation_context::{MAX_OPERATION_TIMEOUT, OperationContext};
pub use resource_data::{ResourceData, read_declaration, write_remote_assignment};
pub use resource_schema::{
    AttributeSchema, AttributeType, AttributeValidation, IDENTITY_ID_ATTRIBUTE, Operation,
    RESOURCE_ID_ATTRIBUTE, ROLE_NAME_ATTRIBUTE, ResourceSchema, ResourceTimeouts, SCOPE_ATTRIBUTE,
};
pub use security_role_assignment_service::SecurityRoleAssignmentService;
pub use security_role_ports::SecurityRoleClient;
