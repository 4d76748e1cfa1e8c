//! Page entry.
//!
//! [`ViewPage::prepare`] runs the checks of the activity view in order and
//! either stops with a [`Diagnostic`] or returns what the player needs.
//! [`ViewPage::sync_progress`] is the player's callback after a video
//! session.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::Result;
use crate::activity::Activity;
use crate::config::HostContext;
use crate::credentials::{
    ConfigIssue, CredentialResolver, CredentialSet, invalid_config, missing_broker_config,
    missing_config,
};
use crate::database::models::AttemptDbModel;
use crate::database::repositories::VideoRepository;
use crate::progress::{ProgressService, ProgressSummary};
use crate::remote::{DialogMetadata, RemoteClient};
use crate::session::{IdentityService, PlayerSettings, SessionAuthenticator};

/// Why the page cannot show the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Broker settings left blank while credentials depend on the broker.
    MissingBrokerConfig(Vec<&'static str>),
    /// The broker rejected the configured account.
    InvalidBrokerConfig(String),
    MissingConfig(Vec<ConfigIssue>),
    /// The remote did not return a usable token.
    InvalidConfig(String),
    NotAvailable,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBrokerConfig(fields) => {
                write!(f, "Missing broker settings: {}", fields.join(", "))
            }
            Self::InvalidBrokerConfig(msg) => write!(f, "Broker error: {msg}"),
            Self::MissingConfig(issues) => {
                let issues: Vec<String> = issues.iter().map(ToString::to_string).collect();
                write!(f, "Missing or invalid settings: {}", issues.join(", "))
            }
            Self::InvalidConfig(msg) => write!(f, "Remote rejected the configuration: {msg}"),
            Self::NotAvailable => f.write_str("This activity is not currently available"),
        }
    }
}

/// Everything the activity view renders.
#[derive(Debug, Clone)]
pub struct ViewModel {
    pub activity_id: i64,
    pub course_module_id: i64,
    pub exchanged_token: String,
    pub consumer_key: String,
    pub player_settings: PlayerSettings,
    pub fetch_url: String,
    pub search_url: String,
    pub progress: ProgressSummary,
    pub viewable: bool,
    pub read_only: bool,
    pub video_ids: Vec<i64>,
    pub videos: Vec<DialogMetadata>,
    /// Remote account of the user, `None` when registration failed.
    pub account_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum ViewOutcome {
    Ready(Box<ViewModel>),
    Blocked(Diagnostic),
}

impl ViewOutcome {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Blocked(diagnostic) => Some(diagnostic),
            Self::Ready(_) => None,
        }
    }

    pub fn view(&self) -> Option<&ViewModel> {
        match self {
            Self::Ready(view) => Some(view.as_ref()),
            Self::Blocked(_) => None,
        }
    }
}

pub struct ViewPage {
    resolver: CredentialResolver,
    client: Arc<RemoteClient>,
    identities: IdentityService,
    videos: Arc<dyn VideoRepository>,
    progress: Arc<ProgressService>,
}

impl ViewPage {
    pub fn new(
        resolver: CredentialResolver,
        client: Arc<RemoteClient>,
        identities: IdentityService,
        videos: Arc<dyn VideoRepository>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            resolver,
            client,
            identities,
            videos,
            progress,
        }
    }

    /// Resolve credentials and report configuration problems.
    pub async fn check_config(&self, activity: &Activity) -> std::result::Result<CredentialSet, Diagnostic> {
        let config = activity.config();
        let credentials = self.resolver.resolve(config).await;
        let issues = missing_config(&credentials);
        if issues.is_empty() {
            return Ok(credentials);
        }

        if self.resolver.has_broker() && !config.has_direct_credentials() {
            let missing = missing_broker_config(config);
            if !missing.is_empty() {
                return Err(Diagnostic::MissingBrokerConfig(missing));
            }
            if let Some(error) = self.resolver.broker_error(config).await {
                return Err(Diagnostic::InvalidBrokerConfig(error));
            }
        }
        Err(Diagnostic::MissingConfig(issues))
    }

    async fn authenticator(&self, ctx: &HostContext, credentials: CredentialSet) -> Result<SessionAuthenticator> {
        let identity = self.identities.lookup_or_create(ctx.user_id).await?;
        Ok(SessionAuthenticator::new(self.client.clone(), credentials, identity, ctx))
    }

    /// Run the view checks and gather the player settings.
    #[instrument(skip_all, fields(activity_id = activity.id(), user_id = ctx.user_id))]
    pub async fn prepare(&self, activity: &Activity, ctx: &HostContext) -> Result<ViewOutcome> {
        let credentials = match self.check_config(activity).await {
            Ok(credentials) => credentials,
            Err(diagnostic) => {
                warn!(%diagnostic, "Configuration check failed");
                return Ok(ViewOutcome::Blocked(diagnostic));
            }
        };

        let mut auth = self.authenticator(ctx, credentials).await?;
        let exchanged_token = match auth.exchanged_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Token exchange failed");
                return Ok(ViewOutcome::Blocked(Diagnostic::InvalidConfig(e.to_string())));
            }
        };
        if let Some(message) = invalid_config(&exchanged_token) {
            warn!(%message, "Remote returned an unusable token");
            return Ok(ViewOutcome::Blocked(Diagnostic::InvalidConfig(message)));
        }

        if activity.not_available() {
            return Ok(ViewOutcome::Blocked(Diagnostic::NotAvailable));
        }

        let video_ids = activity.video_ids(self.videos.as_ref()).await?;
        let (account_id, videos) = match auth.authorization().await {
            Ok(header) => {
                let partner_id = auth.credentials().partner_id.clone();
                let account_id = self
                    .identities
                    .ensure_external_account(auth.identity_mut(), &header, &partner_id, ctx)
                    .await?;
                let videos = self
                    .client
                    .list_videos(&header, &video_ids, auth.site_language())
                    .await?;
                (account_id, videos)
            }
            Err(e) => {
                warn!(error = %e, "Cannot derive authorization header");
                (auth.identity().external_account_id, Vec::new())
            }
        };

        let view = ViewModel {
            activity_id: activity.id(),
            course_module_id: activity.course_module_id(),
            consumer_key: auth.credentials().consumer_key.clone(),
            player_settings: auth.player_settings(),
            fetch_url: self.client.fetch_url()?,
            search_url: self.client.search_url()?,
            progress: self.progress.summary(activity.id(), ctx.user_id).await?,
            viewable: activity.is_viewable(),
            read_only: activity.read_only(),
            exchanged_token,
            video_ids,
            videos,
            account_id,
        };
        Ok(ViewOutcome::Ready(Box::new(view)))
    }

    /// Fetch and record the progress of one video after the player reports
    /// a session. `None` when nothing was recorded.
    #[instrument(skip(self, activity, ctx, exchanged_token), fields(activity_id = activity.id(), user_id = ctx.user_id))]
    pub async fn sync_progress(
        &self,
        activity: &Activity,
        ctx: &HostContext,
        video_id: i64,
        exchanged_token: &str,
    ) -> Result<Option<AttemptDbModel>> {
        if activity.read_only() {
            info!("Activity is read-only, progress not recorded");
            return Ok(None);
        }
        let credentials = match self.check_config(activity).await {
            Ok(credentials) => credentials,
            Err(diagnostic) => {
                warn!(%diagnostic, "Configuration check failed");
                return Ok(None);
            }
        };

        let mut auth = self
            .authenticator(ctx, credentials)
            .await?
            .with_exchanged_token(exchanged_token);
        let header = match auth.authorization().await {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, "Player token rejected, progress not recorded");
                return Ok(None);
            }
        };
        let Some(report) = self.client.fetch_progress(&header, video_id).await else {
            return Ok(None);
        };
        self.progress
            .update_progress(activity, ctx.user_id, video_id, &report)
            .await
            .map(Some)
    }
}
