use crate::validation::{FieldError, max_chars, non_blank};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_MAX_LEN: usize = 128;
pub const PASSWORD_SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct PasswordHashError(argon2::password_hash::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Stored password hash is not a valid PHC string: {0}")]
pub struct InvalidHashedPasswordError(argon2::password_hash::Error);

/// A plaintext password as submitted by a client. Never persisted.
#[derive(Clone, Eq, PartialEq)]
pub struct Password(String);

/// An argon2 hash of a password in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct HashedPassword(String);

impl Password {
    /// Surrounding whitespace is significant and kept.
    pub fn new(password: String) -> Result<Self, FieldError> {
        non_blank(&password)?;
        max_chars(&password, PASSWORD_MAX_LEN)?;

        Ok(Self(password))
    }

    /// A password presented at login. Only presence is checked; anything
    /// else is left to [`HashedPassword::verify`].
    pub fn for_login(password: String) -> Result<Self, FieldError> {
        non_blank(&password)?;

        Ok(Self(password))
    }

    pub fn hash(&self) -> Result<HashedPassword, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let hash = Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(HashedPassword(hash.to_string()))
    }
}

impl HashedPassword {
    pub fn new(phc: String) -> Result<Self, InvalidHashedPasswordError> {
        PasswordHash::new(&phc).map_err(InvalidHashedPasswordError)?;

        Ok(Self(phc))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        PasswordHash::new(&self.0).is_ok_and(|hash| {
            Argon2::default()
                .verify_password(password.0.as_bytes(), &hash)
                .is_ok()
        })
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl Debug for HashedPassword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HashedPassword").field(&"[redacted]").finish()
    }
}
