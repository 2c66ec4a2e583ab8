//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_security_role_client;
mod in_memory_security_role_client;

pub use http_security_role_client::{
    DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT, HttpSecurityRoleClient,
    HttpSecurityRoleClientConfig,
};
pub use in_memory_security_role_client::InMemorySecurityRoleClient;
