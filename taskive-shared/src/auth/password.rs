/// Password hashing using Argon2id
///
/// Passwords are hashed into PHC strings that embed the algorithm, parameters
/// and a random 16-byte salt, so verification needs nothing but the stored
/// string.
///
/// # Parameters
///
/// - **Algorithm**: Argon2id, version 0x13
/// - **Memory**: 19 MiB (19456 KiB)
/// - **Iterations**: 2 passes
/// - **Parallelism**: 1 lane
/// - **Output**: 32-byte hash
///
/// These match the OWASP minimum for Argon2id and keep a login under a few
/// tens of milliseconds on a single core.
///
/// Passwords shorter than [`MIN_PASSWORD_LENGTH`] characters are refused before
/// any hashing happens.
///
/// # Example
///
/// ```
/// use taskive_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("secret1")?;
///
/// assert!(verify_password("secret1", &hash)?);
/// assert!(!verify_password("secret2", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Shortest accepted password, in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Password is shorter than the minimum length
    #[error("Password must be at least 6 characters long")]
    WeakSecret,

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Stored hash could not be parsed or checked
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(19456)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with Argon2id and a fresh random salt
///
/// # Errors
///
/// - `PasswordError::WeakSecret` if the password has fewer than
///   [`MIN_PASSWORD_LENGTH`] characters
/// - `PasswordError::HashError` if hashing fails
///
/// # Example
///
/// ```
/// use taskive_shared::auth::password::{hash_password, PasswordError};
///
/// assert!(hash_password("secret1").unwrap().starts_with("$argon2id$"));
/// assert!(matches!(hash_password("short"), Err(PasswordError::WeakSecret)));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::WeakSecret);
    }

    let salt = SaltString::generate(&mut OsRng);

    let password_hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Comparison is constant-time. A wrong password is `Ok(false)`, never an
/// error; only an unreadable stored hash produces `Err`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters come from the hash itself
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::InvalidHash(format!("Verification failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("secret1").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=19456"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn test_short_password_is_weak() {
        assert!(matches!(hash_password(""), Err(PasswordError::WeakSecret)));
        assert!(matches!(hash_password("12345"), Err(PasswordError::WeakSecret)));
        assert!(hash_password("123456").is_ok());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // five characters, fifteen bytes
        assert!(matches!(hash_password("密码密码密"), Err(PasswordError::WeakSecret)));
        assert!(hash_password("密码密码密码").is_ok());
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").expect("Hash should succeed");

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        // not PHC strings at all
        assert!(verify_password("password", "invalid_hash").is_err());
        assert!(verify_password("password", "not-a-phc-string").is_err());

        // a readable PHC string with no hash in it simply does not match
        assert!(matches!(verify_password("password", "$argon2id$invalid"), Ok(false)));
    }

    #[test]
    fn test_hash_verify_roundtrip() {
        let passwords = [
            "secret1",
            "with spaces",
            "with-special-chars!@#$%",
            "unicode-密码-パスワード",
        ];

        for password in passwords {
            let hash = hash_password(password).expect("Hash should succeed");
            assert!(
                verify_password(password, &hash).expect("Verify should succeed"),
                "Password '{}' should verify",
                password
            );
        }
    }
}
