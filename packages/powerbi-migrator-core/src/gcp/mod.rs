//! Google Cloud access: Secret Manager for tenant credentials and Cloud
//! Storage for report backups.

mod secret_manager;
mod storage;
mod token;

pub use secret_manager::SecretManagerClient;
pub use storage::{GcsArchive, archive_object_path};
pub use token::GcpTokenSource;
