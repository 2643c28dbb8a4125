//! Tenant credential records and bearer tokens.
//!
//! Credentials only ever live in memory: they are parsed from the secret
//! payload, used for one token request per tenant, and wiped when dropped.

use crate::error::MigrationError;
use anyhow::{Context, Result};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key of the source tenant record in the secret payload
pub const SOURCE_TENANT_KEY: &str = "tenant_vgm_info";
/// Key of the destination tenant record in the secret payload
pub const DESTINATION_TENANT_KEY: &str = "tenant_ft_info";

#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TenantCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Both tenant records held in the migration secret
#[derive(Debug)]
pub struct TenantSecrets {
    pub source: TenantCredentials,
    pub destination: TenantCredentials,
}

#[derive(Deserialize)]
struct SecretPayload {
    tenant_vgm_info: Option<TenantCredentials>,
    tenant_ft_info: Option<TenantCredentials>,
}

impl TenantSecrets {
    /// Parse the JSON secret payload holding both tenant records.
    pub fn from_json(payload: &str) -> Result<Self> {
        let parsed: SecretPayload =
            serde_json::from_str(payload).context("Failed to parse tenant credentials secret")?;

        let source = parsed
            .tenant_vgm_info
            .ok_or(MigrationError::MissingTenantRecord {
                key: SOURCE_TENANT_KEY,
            })?;
        let destination = parsed
            .tenant_ft_info
            .ok_or(MigrationError::MissingTenantRecord {
                key: DESTINATION_TENANT_KEY,
            })?;

        Ok(Self {
            source,
            destination,
        })
    }
}

/// Bearer token for one tenant, minted once per run
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}
