use bcrypt::{DEFAULT_COST, hash, verify};
use rand::Rng;

use crate::utils::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to verify password: {}", e)))
}

/// Random initial password for auto-created accounts (managers, parents,
/// teachers). 8 random bytes rendered as 16 hex chars, emailed to the owner.
pub fn generate_random_password() -> String {
    let bytes: [u8; 8] = rand::thread_rng().r#gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_length() {
        let password = generate_random_password();
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate_random_password(), generate_random_password());
    }
}
