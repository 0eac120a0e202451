//! Admin authentication: argon2id password hashes and server-side sessions.
//!
//! Session tokens are 32 random bytes, hex encoded, stored with an expiry and
//! checked on every admin request.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::{info, warn};

use fomo_store::AdminStore;
use fomo_types::{AdminCredential, AdminSession, Timestamp};

use crate::RegistryError;

/// 24 hours.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Argon2id parameters: 19 MiB memory, 2 iterations, 1 lane.
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;

pub struct AdminAuth<S> {
    store: Arc<S>,
    session_ttl_secs: u64,
    hasher: Argon2<'static>,
}

impl<S: AdminStore> AdminAuth<S> {
    pub fn new(store: Arc<S>, session_ttl_secs: u64) -> Result<Self, RegistryError> {
        let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_PARALLELISM, None)
            .map_err(|e| RegistryError::Hashing(e.to_string()))?;
        Ok(Self {
            store,
            session_ttl_secs,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Create or replace an admin account.
    pub fn add_user(
        &self,
        username: &str,
        password: &str,
        now: Timestamp,
    ) -> Result<AdminCredential, RegistryError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(RegistryError::MissingFields);
        }
        let mut salt = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt).map_err(|e| RegistryError::Random(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt).map_err(|e| RegistryError::Hashing(e.to_string()))?;
        let password_hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| RegistryError::Hashing(e.to_string()))?
            .to_string();

        let credential = AdminCredential {
            username: username.to_string(),
            password_hash,
            created_at: now,
        };
        self.store.put_credential(&credential)?;
        info!(admin = username, "admin credential stored");
        Ok(credential)
    }

    /// Verify the password and open a session.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        now: Timestamp,
    ) -> Result<AdminSession, RegistryError> {
        let Some(credential) = self.store.get_credential(username.trim())? else {
            warn!(admin = username, "login for unknown admin");
            return Err(RegistryError::AuthenticationFailed);
        };
        let parsed = PasswordHash::new(&credential.password_hash)
            .map_err(|e| RegistryError::Hashing(e.to_string()))?;
        if self
            .hasher
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            warn!(admin = %credential.username, "admin login failed");
            return Err(RegistryError::AuthenticationFailed);
        }

        let session = AdminSession {
            token: new_token()?,
            username: credential.username,
            created_at: now,
            expires_at: now.plus_secs(self.session_ttl_secs),
        };
        self.store.put_session(&session)?;
        info!(admin = %session.username, expires_at = %session.expires_at, "admin session opened");
        Ok(session)
    }

    /// Resolve a bearer token to a live session. Expired sessions are deleted.
    pub fn authenticate(&self, token: &str, now: Timestamp) -> Result<AdminSession, RegistryError> {
        let session = self
            .store
            .get_session(token)?
            .ok_or(RegistryError::Unauthorized)?;
        if session.is_expired(now) {
            self.store.delete_session(token)?;
            return Err(RegistryError::Unauthorized);
        }
        Ok(session)
    }

    pub fn logout(&self, token: &str) -> Result<(), RegistryError> {
        self.store.delete_session(token)?;
        Ok(())
    }

    pub fn purge_expired(&self, now: Timestamp) -> Result<usize, RegistryError> {
        let purged = self.store.purge_sessions(now)?;
        if purged > 0 {
            info!(purged, "expired admin sessions removed");
        }
        Ok(purged)
    }
}

fn new_token() -> Result<String, RegistryError> {
    let mut bytes = [0u8; TOKEN_LEN];
    getrandom::getrandom(&mut bytes).map_err(|e| RegistryError::Random(e.to_string()))?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_nullables::{NullClock, NullStore};

    fn auth() -> AdminAuth<NullStore> {
        AdminAuth::new(Arc::new(NullStore::new()), DEFAULT_SESSION_TTL_SECS).unwrap()
    }

    #[test]
    fn stored_hash_is_argon2id_not_the_password() {
        let a = auth();
        let cred = a.add_user("root", "hunter2", Timestamp::new(0)).unwrap();
        assert!(cred.password_hash.starts_with("$argon2id$"));
        assert!(!cred.password_hash.contains("hunter2"));
    }

    #[test]
    fn login_issues_hex_token_with_expiry() {
        let a = auth();
        a.add_user("root", "hunter2", Timestamp::new(0)).unwrap();
        let s = a.login("root", "hunter2", Timestamp::new(100)).unwrap();
        assert_eq!(s.token.len(), TOKEN_LEN * 2);
        assert!(s.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(s.expires_at, Timestamp::new(100 + DEFAULT_SESSION_TTL_SECS));
        assert_eq!(a.authenticate(&s.token, Timestamp::new(200)).unwrap().username, "root");
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let a = auth();
        a.add_user("root", "hunter2", Timestamp::new(0)).unwrap();
        let wrong = a.login("root", "hunter3", Timestamp::new(1)).unwrap_err();
        let unknown = a.login("nobody", "hunter2", Timestamp::new(1)).unwrap_err();
        assert_eq!(wrong.to_string(), "Authentication failed.");
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn expired_session_is_rejected_and_removed() {
        let a = auth();
        let clock = NullClock::new(0);
        a.add_user("root", "hunter2", clock.now()).unwrap();
        let s = a.login("root", "hunter2", clock.now()).unwrap();
        clock.advance(DEFAULT_SESSION_TTL_SECS - 1);
        assert!(a.authenticate(&s.token, clock.now()).is_ok());
        clock.advance(1);
        assert!(matches!(
            a.authenticate(&s.token, clock.now()),
            Err(RegistryError::Unauthorized)
        ));
        assert_eq!(a.purge_expired(clock.now()).unwrap(), 0);
    }

    #[test]
    fn logout_ends_the_session() {
        let a = auth();
        a.add_user("root", "hunter2", Timestamp::new(0)).unwrap();
        let s = a.login("root", "hunter2", Timestamp::new(0)).unwrap();
        a.logout(&s.token).unwrap();
        assert!(a.authenticate(&s.token, Timestamp::new(1)).is_err());
    }

    #[test]
    fn purge_removes_only_expired_sessions() {
        let a = auth();
        a.add_user("root", "hunter2", Timestamp::new(0)).unwrap();
        a.login("root", "hunter2", Timestamp::new(0)).unwrap();
        let fresh = a.login("root", "hunter2", Timestamp::new(50_000)).unwrap();
        assert_eq!(a.purge_expired(Timestamp::new(DEFAULT_SESSION_TTL_SECS + 1)).unwrap(), 1);
        assert!(a.authenticate(&fresh.token, Timestamp::new(DEFAULT_SESSION_TTL_SECS + 1)).is_ok());
    }
}
