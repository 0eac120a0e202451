//! Listed-token and listing-application storage trait.

use crate::StoreError;
use fomo_types::{
    ApplicationStatus, ListedToken, ListingApplication, MintAddress, NewListedToken,
    NewListingApplication, Timestamp,
};
use uuid::Uuid;

pub trait RegistryStore {
    /// Listed tokens, newest first.
    fn list_tokens(&self) -> Result<Vec<ListedToken>, StoreError>;

    fn get_token(&self, mint: &MintAddress) -> Result<Option<ListedToken>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] if the mint is already listed.
    fn add_token(&self, token: NewListedToken, now: Timestamp) -> Result<ListedToken, StoreError>;

    /// Returns whether a token was removed.
    fn remove_token(&self, mint: &MintAddress) -> Result<bool, StoreError>;

    /// Insert an application with status `pending`.
    fn submit_application(
        &self,
        application: NewListingApplication,
        now: Timestamp,
    ) -> Result<ListingApplication, StoreError>;

    /// All applications, newest first.
    fn list_applications(&self) -> Result<Vec<ListingApplication>, StoreError>;

    fn get_application(&self, id: &Uuid) -> Result<Option<ListingApplication>, StoreError>;

    /// Returns whether the application exists.
    fn set_application_status(&self, id: &Uuid, status: ApplicationStatus)
        -> Result<bool, StoreError>;
}
