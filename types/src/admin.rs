//! Admin credentials and server-side sessions.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// A registry administrator. The password is stored only as an argon2 PHC string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredential {
    pub username: String,
    pub password_hash: String,
    pub created_at: Timestamp,
}

/// An authenticated admin session, validated on every request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub token: String,
    pub username: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl AdminSession {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}
