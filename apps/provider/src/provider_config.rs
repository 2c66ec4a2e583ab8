use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rolesync_application::Operation;
use rolesync_core::{AppError, AppResult};
use rolesync_infrastructure::{
    DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT, HttpSecurityRoleClientConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub organization_url: String,
    pub personal_access_token: String,
    pub api_version: String,
    pub http_timeout: Duration,
}

impl ProviderConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let required = |name: &str| -> AppResult<String> {
            let value =
                lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{name} must not be empty")));
            }
            Ok(value)
        };

        let organization_url = required("ROLESYNC_ORG_URL")?;
        let personal_access_token = required("ROLESYNC_PAT")?;
        let api_version = lookup("ROLESYNC_API_VERSION")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_owned());
        let http_timeout = match lookup("ROLESYNC_HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|error| {
                    AppError::Validation(format!(
                        "invalid ROLESYNC_HTTP_TIMEOUT_SECS value '{value}': {error}"
                    ))
                })?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        if http_timeout.is_zero() {
            return Err(AppError::Validation(
                "ROLESYNC_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            organization_url,
            personal_access_token,
            api_version,
            http_timeout,
        })
    }

    pub fn client_config(&self) -> AppResult<HttpSecurityRoleClientConfig> {
        let mut config = HttpSecurityRoleClientConfig::new(
            self.organization_url.as_str(),
            self.personal_access_token.as_str(),
        )
        .map_err(|error| error.with_context("ROLESYNC_ORG_URL"))?;
        config.api_version = self.api_version.clone();
        config.request_timeout = self.http_timeout;

        Ok(config)
    }
}

/// Runs one lifecycle operation of a security role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "rolesync-provider")]
#[command(version, about, long_about = None)]
pub struct Invocation {
    /// Lifecycle operation: create, read, update or delete.
    pub operation: Operation,
    /// JSON resource record read before and written after the operation.
    pub state_path: PathBuf,
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
