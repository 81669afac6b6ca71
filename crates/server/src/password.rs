use argon2::{
    Argon2,
    password_hash::{
        Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};

pub const PASSWORD_MIN_CHARS: usize = 8;

/// The symbol set the signup policy accepts.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()-_=+[]{};:'\",.<>/?\\|`~";

/// Minimum 8 characters with at least one lowercase letter, one uppercase
/// letter, one digit, and one symbol from [`PASSWORD_SYMBOLS`].
pub fn meets_policy(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_CHARS
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// `Ok(false)` is a mismatch; `Err` means the stored hash itself is unusable.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_requires_every_character_class() {
        assert!(meets_policy("Abcdef1!"));
        assert!(meets_policy("Str0ng&Longer"));

        assert!(!meets_policy("Ab1!"), "too short");
        assert!(!meets_policy("abcdef1!"), "no uppercase");
        assert!(!meets_policy("ABCDEF1!"), "no lowercase");
        assert!(!meets_policy("Abcdefg!"), "no digit");
        assert!(!meets_policy("Abcdefg1"), "no symbol");
    }

    #[test]
    fn hash_round_trips_and_rejects_wrong_password() {
        let hash = hash_password("Abcdef1!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "Abcdef1!").unwrap());
        assert!(!verify_password(&hash, "Abcdef1?").unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("Abcdef1!").unwrap();
        let second = hash_password("Abcdef1!").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("not-a-hash", "Abcdef1!").is_err());
    }
}
