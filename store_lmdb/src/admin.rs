//! LMDB implementation of AdminStore.

use fomo_store::{AdminStore, StoreError};
use fomo_types::{AdminCredential, AdminSession, Timestamp};

use crate::codec::{decode, encode};
use crate::{LmdbEnvironment, LmdbError};

impl AdminStore for LmdbEnvironment {
    fn get_credential(&self, username: &str) -> Result<Option<AdminCredential>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .credentials_db
            .get(&rtxn, username.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn put_credential(&self, credential: &AdminCredential) -> Result<(), StoreError> {
        let bytes = encode(credential)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.credentials_db
            .put(&mut wtxn, credential.username.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_session(&self, session: &AdminSession) -> Result<(), StoreError> {
        let bytes = encode(session)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.sessions_db
            .put(&mut wtxn, session.token.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_session(&self, token: &str) -> Result<Option<AdminSession>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .sessions_db
            .get(&rtxn, token.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.sessions_db
            .delete(&mut wtxn, token.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn purge_sessions(&self, now: Timestamp) -> Result<usize, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut expired = Vec::new();
        for entry in self.sessions_db.iter(&wtxn).map_err(LmdbError::from)? {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let session: AdminSession = decode(val)?;
            if session.is_expired(now) {
                expired.push(key.to_vec());
            }
        }
        for key in &expired {
            self.sessions_db
                .delete(&mut wtxn, key)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(expired.len())
    }
}
