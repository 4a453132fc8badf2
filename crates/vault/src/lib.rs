//! Encrypted credential storage with lifecycle, rotation, and password
//! policy enforcement.

pub mod memory;
pub mod password;
pub mod record;
pub mod store;

pub use memory::InMemorySecureVault;
pub use password::{evaluate_password, PasswordEvaluation, PasswordStrength, RotationPolicy};
pub use record::{CredentialKind, VaultRecord};
pub use store::SecureVault;
