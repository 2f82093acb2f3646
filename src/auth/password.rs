use std::sync::Arc;

use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::PasswordConfig;

/// Argon2id hashing with a configurable work factor.
///
/// The `*_async` variants move the CPU work onto tokio's blocking pool so a
/// slow hash never stalls the request executor.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
    // Verified against when the account does not exist, so unknown emails
    // cost the same as wrong passwords.
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    pub fn new(cfg: PasswordConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        let mut hasher = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        hasher.dummy_hash = Arc::from(hasher.hash("not-a-real-password")?);
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is malformed.
    /// Parameters are read from the stored hash, not from this hasher.
    pub fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow::anyhow!("argon2 verify error: {e}")),
        }
    }

    pub async fn hash_async(&self, plain: String) -> anyhow::Result<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("password hash task failed")?
    }

    /// Verifies against `hash`, or against the dummy hash when there is no
    /// account (always `Ok(false)` in that case).
    pub async fn verify_async(&self, plain: String, hash: Option<String>) -> anyhow::Result<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&plain, &hash),
            None => hasher.verify(&plain, &hasher.dummy_hash).map(|_| false),
        })
        .await
        .context("password verify task failed")?
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> PasswordConfig {
    PasswordConfig {
        iterations: 1,
        memory_kib: 64,
        parallelism: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(test_config()).expect("hasher")
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = hasher();
        let password = "Secur3P@ssw0rd!";
        let hash = hasher.hash(password).expect("hashing should succeed");
        assert!(hasher.verify(password, &hash).expect("verify should succeed"));
        assert_ne!(hash, password);
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = hasher();
        let hash = hasher.hash("correct-horse-battery-staple").unwrap();
        assert!(!hasher.verify("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn hashing_is_salted() {
        let hasher = hasher();
        let a = hasher.hash("secret1").unwrap();
        let b = hasher.hash("secret1").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("secret1", &a).unwrap());
        assert!(hasher.verify("secret1", &b).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = hasher().verify("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn hashes_made_with_other_params_still_verify() {
        let strong = CredentialHasher::new(PasswordConfig {
            iterations: 2,
            memory_kib: 128,
            parallelism: 1,
        })
        .unwrap();
        let hash = strong.hash("secret1").unwrap();
        assert!(hasher().verify("secret1", &hash).unwrap());
    }

    #[test]
    fn invalid_params_are_rejected() {
        let res = CredentialHasher::new(PasswordConfig {
            iterations: 0,
            memory_kib: 64,
            parallelism: 1,
        });
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn async_verify_without_account_is_false() {
        let hasher = hasher();
        let hash = hasher.hash_async("secret1".into()).await.unwrap();
        assert!(hasher.verify_async("secret1".into(), Some(hash)).await.unwrap());
        assert!(!hasher.verify_async("secret1".into(), None).await.unwrap());
    }
}
