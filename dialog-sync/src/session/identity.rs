//! Pseudonymous identities.
//!
//! Each local user is known to the remote service only by the row id of
//! its `account_ids` entry. The remote account id is filled in once, on
//! first registration, and never replaced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::language::{native_language, site_language};
use crate::Result;
use crate::config::HostContext;
use crate::database::models::AccountIdDbModel;
use crate::database::repositories::AccountIdRepository;
use crate::remote::RemoteClient;
use crate::remote::client::AccountForm;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudonymousIdentity {
    pub local_user_id: i64,
    /// Identifier sent to the remote service instead of the real user id.
    pub external_id: String,
    /// Remote account id, `None` until registered.
    pub external_account_id: Option<i64>,
}

impl From<AccountIdDbModel> for PseudonymousIdentity {
    fn from(row: AccountIdDbModel) -> Self {
        Self {
            local_user_id: row.user_id,
            external_id: row.external_id(),
            external_account_id: row.is_registered().then_some(row.account_id),
        }
    }
}

pub struct IdentityService {
    accounts: Arc<dyn AccountIdRepository>,
    client: Arc<RemoteClient>,
}

impl IdentityService {
    pub fn new(accounts: Arc<dyn AccountIdRepository>, client: Arc<RemoteClient>) -> Self {
        Self { accounts, client }
    }

    /// Identity of `user_id`, created on first access.
    pub async fn lookup_or_create(&self, user_id: i64) -> Result<PseudonymousIdentity> {
        Ok(self.accounts.get_or_create(user_id).await?.into())
    }

    /// Register the identity with the remote service unless it already is.
    ///
    /// When registration is refused the existing remote account for the
    /// external id is looked up instead. Returns the remote account id,
    /// `None` when neither call yields one.
    #[instrument(skip_all, fields(user_id = identity.local_user_id))]
    pub async fn ensure_external_account(
        &self,
        identity: &mut PseudonymousIdentity,
        authorization: &str,
        partner_id: &str,
        ctx: &HostContext,
    ) -> Result<Option<i64>> {
        if let Some(id) = identity.external_account_id {
            return Ok(Some(id));
        }

        let form = AccountForm {
            partner_id: partner_id.to_string(),
            partner_account_id: identity.external_id.clone(),
            native_language: native_language(ctx),
            site_language: site_language(&ctx.current_language),
            is_teacher: ctx.can_manage,
            timezone: ctx.timezone.clone(),
        };
        let account_id = match self.client.create_account(authorization, &form).await {
            Some(id) => id,
            None => {
                debug!("Registration refused, looking up existing remote account");
                match self
                    .client
                    .fetch_account(authorization, partner_id, &identity.external_id)
                    .await
                {
                    Some(id) => id,
                    None => {
                        warn!("Remote account registration failed");
                        return Ok(None);
                    }
                }
            }
        };

        if self
            .accounts
            .set_account_id_if_unset(identity.local_user_id, account_id)
            .await?
        {
            info!(account_id, "Registered remote account");
            identity.external_account_id = Some(account_id);
        } else if let Some(row) = self.accounts.find_by_user(identity.local_user_id).await? {
            // Another request registered first; keep what is stored.
            *identity = row.into();
        }
        Ok(identity.external_account_id)
    }
}
