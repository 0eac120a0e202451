//! LMDB implementation of RegistryStore.

use fomo_store::{RegistryStore, StoreError};
use fomo_types::{
    ApplicationStatus, ListedToken, ListingApplication, MintAddress, NewListedToken,
    NewListingApplication, Timestamp,
};
use uuid::Uuid;

use crate::codec::{decode, encode};
use crate::{LmdbEnvironment, LmdbError};

impl RegistryStore for LmdbEnvironment {
    fn list_tokens(&self) -> Result<Vec<ListedToken>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.tokens_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results: Vec<ListedToken> = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            results.push(decode(val)?);
        }
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    fn get_token(&self, mint: &MintAddress) -> Result<Option<ListedToken>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .tokens_db
            .get(&rtxn, mint.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn add_token(&self, token: NewListedToken, now: Timestamp) -> Result<ListedToken, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = token.mint_address.as_str().as_bytes().to_vec();
        if self.tokens_db.get(&wtxn, &key).map_err(LmdbError::from)?.is_some() {
            return Err(StoreError::Duplicate(token.mint_address.to_string()));
        }
        let row = ListedToken {
            id: Uuid::new_v4(),
            mint_address: token.mint_address,
            symbol: token.symbol,
            name: token.name,
            logo_uri: token.logo_uri,
            decimals: token.decimals,
            listed_by: token.listed_by,
            telegram: token.telegram,
            twitter: token.twitter,
            website: token.website,
            description: token.description,
            created_at: now,
        };
        self.tokens_db
            .put(&mut wtxn, &key, &encode(&row)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(row)
    }

    fn remove_token(&self, mint: &MintAddress) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let removed = self
            .tokens_db
            .delete(&mut wtxn, mint.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(removed)
    }

    fn submit_application(
        &self,
        application: NewListingApplication,
        now: Timestamp,
    ) -> Result<ListingApplication, StoreError> {
        let row = ListingApplication {
            id: Uuid::new_v4(),
            mint_address: application.mint_address,
            symbol: application.symbol,
            name: application.name,
            logo_uri: application.logo_uri,
            telegram: application.telegram,
            twitter: application.twitter,
            website: application.website,
            description: application.description,
            contact_email: application.contact_email,
            expedite: application.expedite,
            status: ApplicationStatus::Pending,
            created_at: now,
        };
        let bytes = encode(&row)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.applications_db
            .put(&mut wtxn, row.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(row)
    }

    fn list_applications(&self) -> Result<Vec<ListingApplication>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.applications_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results: Vec<ListingApplication> = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            results.push(decode(val)?);
        }
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    fn get_application(&self, id: &Uuid) -> Result<Option<ListingApplication>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .applications_db
            .get(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn set_application_status(
        &self,
        id: &Uuid,
        status: ApplicationStatus,
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut app: ListingApplication = match self
            .applications_db
            .get(&wtxn, id.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode(bytes)?,
            None => return Ok(false),
        };
        app.status = status;
        self.applications_db
            .put(&mut wtxn, id.as_bytes(), &encode(&app)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }
}
