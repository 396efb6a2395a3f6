//! Salted one-way password hashing.
//!
//! Hashes are argon2id PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
//! The random per-call salt and the cost parameters travel inside the string,
//! so a stored hash is self-describing and two hashes of the same password
//! differ. Verification re-derives with the embedded parameters and compares
//! the outputs in constant time.

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Argon2 cost parameters used for new hashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashParams {
    /// The cheapest parameters argon2 accepts. Only suitable for tests.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }
}

/// Argon2id hasher with fixed cost parameters.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    params: HashParams,
}

impl PasswordHasher {
    pub fn new(params: HashParams) -> AuthResult<Self> {
        let argon_params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params),
            params,
        })
    }

    pub fn params(&self) -> HashParams {
        self.params
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::Rng::fill(&mut rand::thread_rng(), &mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC string.
    ///
    /// A malformed stored hash never verifies.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let parsed = match PasswordHash::new(stored) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(HashParams::minimal()).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("wrong horse", &hash));
    }

    #[test]
    fn same_password_hashes_differ() {
        let hasher = hasher();
        let a = hasher.hash("hunter22").unwrap();
        let b = hasher.hash("hunter22").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("hunter22", &a));
        assert!(hasher.verify("hunter22", &b));
    }

    #[test]
    fn verification_uses_embedded_parameters() {
        let strong = PasswordHasher::new(HashParams {
            memory_kib: 64,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        let hash = strong.hash("portfolio").unwrap();
        assert!(hasher().verify("portfolio", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!hasher().verify("anything", "plain-text-password"));
        assert!(!hasher().verify("", ""));
    }

    #[test]
    fn invalid_params_rejected() {
        let err = PasswordHasher::new(HashParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
        assert!(matches!(err, AuthError::Hash(_)));
    }
}
