//! Listed tokens and the listing-application review queue.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{info, warn};
use uuid::Uuid;

use fomo_store::{RegistryStore, StoreError};
use fomo_types::{
    ApplicationStatus, ListedToken, ListingApplication, MintAddress, NewListedToken,
    NewListingApplication, Timestamp,
};

use crate::RegistryError;

/// Decimals assumed for tokens listed from the admin panel.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 9;

/// Admin "add token" form, as submitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenForm {
    pub mint_address: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// Public listing-application form, as submitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub mint_address: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub expedite: bool,
}

/// Applications grouped the way the review panel shows them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationsByStatus {
    pub pending: Vec<ListingApplication>,
    pub approved: Vec<ListingApplication>,
    pub rejected: Vec<ListingApplication>,
}

pub struct Registry<S> {
    store: Arc<S>,
    changed: Arc<Notify>,
}

impl<S: RegistryStore> Registry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            changed: Arc::new(Notify::new()),
        }
    }

    /// Signalled whenever the listed set changes.
    pub fn changes(&self) -> Arc<Notify> {
        Arc::clone(&self.changed)
    }

    pub fn list_tokens(&self) -> Result<Vec<ListedToken>, RegistryError> {
        Ok(self.store.list_tokens()?)
    }

    pub fn add_token(
        &self,
        form: TokenForm,
        listed_by: &str,
        now: Timestamp,
    ) -> Result<ListedToken, RegistryError> {
        let mint = required(&form.mint_address)?;
        let symbol = required(&form.symbol)?;
        let name = required(&form.name)?;
        let mint_address = parse_mint(mint)?;

        let token = NewListedToken {
            mint_address,
            symbol: symbol.to_uppercase(),
            name: name.to_string(),
            logo_uri: optional(form.logo_uri),
            decimals: form.decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS),
            listed_by: Some(listed_by.to_string()),
            telegram: None,
            twitter: None,
            website: None,
            description: None,
        };
        let listed = self.insert_token(token, now)?;
        info!(mint = %listed.mint_address, symbol = %listed.symbol, admin = listed_by, "token listed");
        Ok(listed)
    }

    pub fn remove_token(&self, mint: &str) -> Result<(), RegistryError> {
        let mint = parse_mint(mint)?;
        if !self.store.remove_token(&mint)? {
            return Err(RegistryError::TokenNotFound);
        }
        info!(mint = %mint, "token delisted");
        self.changed.notify_one();
        Ok(())
    }

    pub fn submit_application(
        &self,
        form: ApplicationForm,
        now: Timestamp,
    ) -> Result<ListingApplication, RegistryError> {
        let mint = required(&form.mint_address)?;
        let symbol = required(&form.symbol)?;
        let name = required(&form.name)?;
        let contact = form
            .contact_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RegistryError::MissingFields)?
            .to_string();

        let application = NewListingApplication {
            mint_address: parse_mint(mint)?,
            symbol: symbol.to_string(),
            name: name.to_string(),
            logo_uri: optional(form.logo_uri),
            telegram: optional(form.telegram),
            twitter: optional(form.twitter),
            website: optional(form.website),
            description: optional(form.description),
            contact_email: Some(contact),
            expedite: form.expedite,
        };
        let app = self.store.submit_application(application, now)?;
        info!(application = %app.id, mint = %app.mint_address, expedite = app.expedite, "listing application submitted");
        Ok(app)
    }

    pub fn list_applications(&self) -> Result<ApplicationsByStatus, RegistryError> {
        let mut grouped = ApplicationsByStatus::default();
        for app in self.store.list_applications()? {
            match app.status {
                ApplicationStatus::Pending => grouped.pending.push(app),
                ApplicationStatus::Approved => grouped.approved.push(app),
                ApplicationStatus::Rejected => grouped.rejected.push(app),
            }
        }
        Ok(grouped)
    }

    /// Mark the application approved and list its token with the
    /// application's socials. Approving a token that is already listed keeps
    /// the existing listing.
    pub fn approve_application(
        &self,
        id: &Uuid,
        admin: &str,
        now: Timestamp,
    ) -> Result<ListedToken, RegistryError> {
        let app = self
            .store
            .get_application(id)?
            .ok_or(RegistryError::ApplicationNotFound(*id))?;
        self.set_status(id, ApplicationStatus::Approved)?;

        let token = NewListedToken {
            mint_address: app.mint_address.clone(),
            symbol: app.symbol.to_uppercase(),
            name: app.name,
            logo_uri: app.logo_uri,
            decimals: DEFAULT_TOKEN_DECIMALS,
            listed_by: Some(admin.to_string()),
            telegram: app.telegram,
            twitter: app.twitter,
            website: app.website,
            description: app.description,
        };
        match self.insert_token(token, now) {
            Ok(listed) => {
                info!(application = %id, mint = %listed.mint_address, admin, "application approved");
                Ok(listed)
            }
            Err(RegistryError::AlreadyListed) => {
                warn!(application = %id, mint = %app.mint_address, "approved application for an already listed token");
                self.store
                    .get_token(&app.mint_address)?
                    .ok_or(RegistryError::TokenNotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub fn reject_application(&self, id: &Uuid) -> Result<(), RegistryError> {
        self.set_status(id, ApplicationStatus::Rejected)?;
        info!(application = %id, "application rejected");
        Ok(())
    }

    /// Move a rejected (or approved) application back to pending.
    pub fn restore_application(&self, id: &Uuid) -> Result<(), RegistryError> {
        self.set_status(id, ApplicationStatus::Pending)?;
        info!(application = %id, "application restored");
        Ok(())
    }

    fn set_status(&self, id: &Uuid, status: ApplicationStatus) -> Result<(), RegistryError> {
        if !self.store.set_application_status(id, status)? {
            return Err(RegistryError::ApplicationNotFound(*id));
        }
        Ok(())
    }

    fn insert_token(
        &self,
        token: NewListedToken,
        now: Timestamp,
    ) -> Result<ListedToken, RegistryError> {
        match self.store.add_token(token, now) {
            Ok(listed) => {
                self.changed.notify_one();
                Ok(listed)
            }
            Err(StoreError::Duplicate(_)) => Err(RegistryError::AlreadyListed),
            Err(e) => Err(e.into()),
        }
    }
}

fn required(value: &str) -> Result<&str, RegistryError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RegistryError::MissingFields);
    }
    Ok(value)
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_mint(raw: &str) -> Result<MintAddress, RegistryError> {
    MintAddress::new(raw.trim()).map_err(|_| RegistryError::InvalidMint(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_nullables::NullStore;
    use fomo_types::MintAddress;

    const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    fn registry() -> Registry<NullStore> {
        Registry::new(Arc::new(NullStore::new()))
    }

    fn token_form(mint: &str) -> TokenForm {
        TokenForm {
            mint_address: mint.into(),
            symbol: "bonk".into(),
            name: "Bonk".into(),
            ..Default::default()
        }
    }

    fn application_form() -> ApplicationForm {
        ApplicationForm {
            mint_address: BONK.into(),
            symbol: "BONK".into(),
            name: "Bonk".into(),
            telegram: Some("https://t.me/bonk".into()),
            website: Some("  ".into()),
            contact_email: Some("team@bonk.example".into()),
            expedite: true,
            ..Default::default()
        }
    }

    #[test]
    fn add_token_uppercases_symbol_and_defaults_decimals() {
        let r = registry();
        let t = r.add_token(token_form(BONK), "root", Timestamp::new(10)).unwrap();
        assert_eq!(t.symbol, "BONK");
        assert_eq!(t.decimals, DEFAULT_TOKEN_DECIMALS);
        assert_eq!(t.listed_by.as_deref(), Some("root"));
        assert_eq!(r.list_tokens().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_mint_is_already_listed() {
        let r = registry();
        r.add_token(token_form(BONK), "root", Timestamp::new(10)).unwrap();
        let err = r.add_token(token_form(BONK), "root", Timestamp::new(11)).unwrap_err();
        assert_eq!(err.to_string(), "Token already listed.");
    }

    #[test]
    fn short_mint_is_invalid() {
        let err = registry()
            .add_token(token_form("abc"), "root", Timestamp::new(10))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMint(_)));
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let mut form = token_form(BONK);
        form.name = " ".into();
        let err = registry().add_token(form, "root", Timestamp::new(10)).unwrap_err();
        assert!(matches!(err, RegistryError::MissingFields));
    }

    #[test]
    fn remove_unknown_token_is_not_found() {
        let err = registry().remove_token(BONK).unwrap_err();
        assert!(matches!(err, RegistryError::TokenNotFound));
    }

    #[test]
    fn application_requires_contact_email() {
        let mut form = application_form();
        form.contact_email = None;
        let err = registry().submit_application(form, Timestamp::new(1)).unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all required fields.");
    }

    #[test]
    fn application_is_pending_with_blank_socials_dropped() {
        let app = registry()
            .submit_application(application_form(), Timestamp::new(1))
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert!(app.expedite);
        assert_eq!(app.website, None);
        assert_eq!(app.telegram.as_deref(), Some("https://t.me/bonk"));
    }

    #[test]
    fn approve_lists_token_with_socials() {
        let r = registry();
        let app = r.submit_application(application_form(), Timestamp::new(1)).unwrap();
        let listed = r.approve_application(&app.id, "root", Timestamp::new(2)).unwrap();
        assert_eq!(listed.mint_address, MintAddress::new(BONK).unwrap());
        assert_eq!(listed.telegram.as_deref(), Some("https://t.me/bonk"));
        assert_eq!(listed.listed_by.as_deref(), Some("root"));

        let grouped = r.list_applications().unwrap();
        assert!(grouped.pending.is_empty());
        assert_eq!(grouped.approved.len(), 1);
    }

    #[test]
    fn approving_an_already_listed_token_keeps_the_listing() {
        let r = registry();
        let first = r.add_token(token_form(BONK), "root", Timestamp::new(1)).unwrap();
        let app = r.submit_application(application_form(), Timestamp::new(2)).unwrap();
        let listed = r.approve_application(&app.id, "other", Timestamp::new(3)).unwrap();
        assert_eq!(listed.id, first.id);
        assert_eq!(r.list_tokens().unwrap().len(), 1);
    }

    #[test]
    fn reject_then_restore() {
        let r = registry();
        let app = r.submit_application(application_form(), Timestamp::new(1)).unwrap();
        r.reject_application(&app.id).unwrap();
        assert_eq!(r.list_applications().unwrap().rejected.len(), 1);
        r.restore_application(&app.id).unwrap();
        let grouped = r.list_applications().unwrap();
        assert_eq!(grouped.pending.len(), 1);
        assert!(grouped.rejected.is_empty());
    }

    #[test]
    fn unknown_application_is_not_found() {
        let err = registry().reject_application(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, RegistryError::ApplicationNotFound(_)));
    }

    #[tokio::test]
    async fn listing_change_notifies_waiters() {
        let r = registry();
        let changes = r.changes();
        r.add_token(token_form(BONK), "root", Timestamp::new(1)).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), changes.notified())
            .await
            .unwrap();
    }
}
