//! Pseudonymous identity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maps a local user onto the identity used with the remote service.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountIdDbModel {
    /// Row id; its decimal form is the stable external id.
    pub id: i64,
    pub user_id: i64,
    /// Remote account id, 0 until the first remote registration.
    pub account_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AccountIdDbModel {
    /// Stable external id sent as `userID` / `partnerAccountID`.
    pub fn external_id(&self) -> String {
        self.id.to_string()
    }

    pub fn is_registered(&self) -> bool {
        self.account_id != 0
    }
}
