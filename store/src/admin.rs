//! Admin credential and session storage trait.

use crate::StoreError;
use fomo_types::{AdminCredential, AdminSession, Timestamp};

pub trait AdminStore {
    fn get_credential(&self, username: &str) -> Result<Option<AdminCredential>, StoreError>;
    fn put_credential(&self, credential: &AdminCredential) -> Result<(), StoreError>;

    fn put_session(&self, session: &AdminSession) -> Result<(), StoreError>;
    fn get_session(&self, token: &str) -> Result<Option<AdminSession>, StoreError>;
    fn delete_session(&self, token: &str) -> Result<(), StoreError>;

    /// Remove sessions expired at `now`; returns how many were removed.
    fn purge_sessions(&self, now: Timestamp) -> Result<usize, StoreError>;
}
