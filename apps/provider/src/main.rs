//! Rolesync provider runtime.
//!
//! Runs one lifecycle operation of a security role assignment against the
//! remote security roles API and persists the resulting resource record.

#![forbid(unsafe_code)]

mod provider_config;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use rolesync_application::{
    Operation, OperationContext, ResourceData, ResourceSchema, SecurityRoleAssignmentService,
};
use rolesync_core::{AppError, AppResult};
use rolesync_infrastructure::HttpSecurityRoleClient;
use tracing::info;

use crate::provider_config::{Invocation, ProviderConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let invocation = Invocation::parse();
    let config = ProviderConfig::load()?;
    let client = HttpSecurityRoleClient::new(config.client_config()?)?;
    let service = SecurityRoleAssignmentService::new(Arc::new(client));
    let schema = ResourceSchema::security_role_assignment();

    let mut data = load_state(&invocation.state_path)?;
    schema.validate(&data)?;

    let context = OperationContext::for_operation(&schema.timeouts, invocation.operation);
    match invocation.operation {
        Operation::Create => service.create(&mut data, &context).await?,
        Operation::Read => service.read(&mut data, &context).await?,
        Operation::Update => service.update(&mut data, &context).await?,
        Operation::Delete => service.delete(&mut data, &context).await?,
    }

    if invocation.operation == Operation::Delete {
        fs::remove_file(&invocation.state_path).map_err(|error| {
            AppError::Internal(format!(
                "failed to remove state file '{}': {error}",
                invocation.state_path.display()
            ))
        })?;
    } else {
        save_state(&invocation.state_path, &data)?;
    }

    info!(
        operation = %invocation.operation,
        id = %data.id(),
        exists = data.has_id(),
        state_path = %invocation.state_path.display(),
        "rolesync-provider finished"
    );
    Ok(())
}

fn load_state(path: &Path) -> AppResult<ResourceData> {
    let contents = fs::read_to_string(path).map_err(|error| {
        AppError::Validation(format!(
            "failed to read state file '{}': {error}",
            path.display()
        ))
    })?;

    serde_json::from_str(contents.as_str()).map_err(|error| {
        AppError::Validation(format!(
            "state file '{}' is not a valid resource record: {error}",
            path.display()
        ))
    })
}

/// Writes a sibling `.tmp` file, then renames it over the state file.
fn save_state(path: &Path, data: &ResourceData) -> AppResult<()> {
    let contents = serde_json::to_string_pretty(data)
        .map_err(|error| AppError::Internal(format!("failed to encode state: {error}")))?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, contents).map_err(|error| {
        AppError::Internal(format!(
            "failed to write state file '{}': {error}",
            staging.display()
        ))
    })?;
    fs::rename(&staging, path).map_err(|error| {
        AppError::Internal(format!(
            "failed to replace state file '{}': {error}",
            path.display()
        ))
    })
}
