//! Authentication module for the migrator.
//!
//! Provides tenant credential parsing and the password-grant token request.

mod credentials;
mod password_grant;

pub use credentials::{
    AccessToken, TenantCredentials, TenantSecrets, DESTINATION_TENANT_KEY, SOURCE_TENANT_KEY,
};
pub use password_grant::AuthClient;
