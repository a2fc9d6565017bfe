//! Argon2id password hashing. Hashes are PHC strings (`$argon2id$v=19$m=...`)
//! and carry their own parameters, so verification works across config changes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::Argon2Config;
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Default)]
pub struct Hasher {
    params: Params,
}

impl Hasher {
    pub fn from_config(cfg: &Argon2Config) -> Result<Self, DomainError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| DomainError::internal(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("failed to hash password: {e}")))
    }

    /// `false` on mismatch and on a malformed stored hash.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Hasher {
        Hasher::from_config(&Argon2Config {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let h = cheap();
        let hash = h.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(h.verify("correct horse", &hash));
        assert!(!h.verify("wrong horse", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let h = cheap();
        assert_ne!(h.hash("same").unwrap(), h.hash("same").unwrap());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!cheap().verify("anything", "not-a-phc-string"));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let res = Hasher::from_config(&Argon2Config {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(res.is_err());
    }
}
