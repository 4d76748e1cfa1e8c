//! HTTP client for the remote bridge, report-card and chat services.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::types::{DialogMetadata, RemoteProgressReport};
use super::{AcceptVersion, RemoteBody, Subdomain};
use crate::config::AppConfig;
use crate::database::repositories::VideoRepository;
use crate::{Error, Result};

/// Fixed build date the remote service expects from this client.
pub const APPLICATION_BUILD_DATE: &str = "2017-08-19T13:33:14.000Z";

/// Chat bot used for dialog quizzes.
pub const CHAT_BOT_ID: i64 = 5;

/// Page size of course listings.
const COURSE_PAGE_SIZE: i64 = 25;

const COURSE_FIELDS: &str = "courseID,name,description,difficulty";

const DIALOG_FIELDS: &str = "dialogID,title,difficulty,duration,dialogURL,thumbnailURL,videoDetailsURL,demoPictureURL,description,topics";

/// Connection settings.
#[derive(Debug, Clone)]
pub struct RemoteClientConfig {
    pub domain: String,
    /// Replaces `https://<subdomain>.<domain>` with `<base>/<subdomain>`.
    pub base_url: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl RemoteClientConfig {
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            base_url: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            domain: config.domain().to_string(),
            base_url: config.remote_base_url.clone(),
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Form fields of the identity-authorize call.
#[derive(Debug, Clone)]
pub struct AuthorizeForm {
    pub partner_id: String,
    pub site_language: String,
    pub native_language: String,
}

/// Fields of the account-create call.
#[derive(Debug, Clone)]
pub struct AccountForm {
    pub partner_id: String,
    pub partner_account_id: String,
    pub native_language: String,
    pub site_language: String,
    pub is_teacher: bool,
    pub timezone: String,
}

/// Typed request layer over the remote REST API.
pub struct RemoteClient {
    http: Client,
    config: RemoteClientConfig,
    video_cache: Option<Arc<dyn VideoRepository>>,
}

impl RemoteClient {
    pub fn new(config: RemoteClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            video_cache: None,
        })
    }

    /// Write fetched dialog metadata into this cache.
    pub fn with_video_cache(mut self, cache: Arc<dyn VideoRepository>) -> Self {
        self.video_cache = Some(cache);
        self
    }

    pub fn domain(&self) -> &str {
        &self.config.domain
    }

    /// Absolute URL of an endpoint with query parameters.
    pub fn url(&self, subdomain: Subdomain, endpoint: &str, query: &[(&str, String)]) -> Result<Url> {
        let base = match &self.config.base_url {
            Some(base) => format!("{}/{}/{}", base.trim_end_matches('/'), subdomain.as_str(), endpoint),
            None => format!("https://{}.{}/{}", subdomain.as_str(), self.config.domain, endpoint),
        };
        Url::parse_with_params(&base, query)
            .map_err(|e| Error::config(format!("invalid remote URL {base}: {e}")))
    }

    /// URL the player uses to fetch dialogs.
    pub fn fetch_url(&self) -> Result<String> {
        Ok(self.url(Subdomain::Bridge, "rest/content/dialog", &[])?.to_string())
    }

    /// URL the player uses for full-text dialog search.
    pub fn search_url(&self) -> Result<String> {
        Ok(self
            .url(Subdomain::Bridge, "rest/content/dialog/search/fulltext", &[])?
            .to_string())
    }

    /// Exchange a signed identity assertion for an access token.
    ///
    /// Any response body is returned as-is, including remote error pages;
    /// only transport failures and empty bodies are errors.
    #[instrument(skip_all, fields(partner_id = %form.partner_id))]
    pub async fn authorize(&self, assertion: &str, form: &AuthorizeForm) -> Result<String> {
        let url = self.url(Subdomain::Bridge, "rest/identity/authorize", &[])?;
        let response = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, AcceptVersion::V1.header_value())
            .header("AuthorizeRequest", assertion)
            .form(&[
                ("partnerID", form.partner_id.as_str()),
                ("siteLanguage", form.site_language.as_str()),
                ("nativeLanguage", form.native_language.as_str()),
                ("applicationBuildDate", APPLICATION_BUILD_DATE),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(%status, "Authorize request returned an error status");
        }
        if body.is_empty() {
            return Err(Error::remote(format!("empty authorize response ({status})")));
        }
        Ok(body)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteBody {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Remote request failed");
                return RemoteBody::Empty;
            }
        };
        let status = response.status();
        match response.text().await {
            Ok(text) => {
                if !status.is_success() {
                    debug!(%status, "Remote returned an error status");
                }
                RemoteBody::parse(text)
            }
            Err(e) => {
                warn!(error = %e, "Failed to read remote response");
                RemoteBody::Empty
            }
        }
    }

    async fn get(
        &self,
        authorization: &str,
        subdomain: Subdomain,
        endpoint: &str,
        query: &[(&str, String)],
        accept: AcceptVersion,
    ) -> RemoteBody {
        let url = match self.url(subdomain, endpoint, query) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Cannot build remote URL");
                return RemoteBody::Empty;
            }
        };
        let request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, accept.header_value())
            .header(reqwest::header::AUTHORIZATION, authorization);
        self.send(request).await
    }

    async fn post(
        &self,
        authorization: &str,
        subdomain: Subdomain,
        endpoint: &str,
        query: &[(&str, String)],
        accept: AcceptVersion,
    ) -> RemoteBody {
        let url = match self.url(subdomain, endpoint, query) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Cannot build remote URL");
                return RemoteBody::Empty;
            }
        };
        let request = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, accept.header_value())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            );
        self.send(request).await
    }

    /// Register the pseudonymous account. Returns the remote `accountID`.
    #[instrument(skip_all, fields(partner_account_id = %form.partner_account_id))]
    pub async fn create_account(&self, authorization: &str, form: &AccountForm) -> Option<i64> {
        let query = [
            ("partnerID", form.partner_id.clone()),
            ("partnerAccountID", form.partner_account_id.clone()),
            ("nativeLanguage", form.native_language.clone()),
            ("siteLanguage", form.site_language.clone()),
            ("isTeacher", if form.is_teacher { "1" } else { "0" }.to_string()),
            ("timezone", form.timezone.clone()),
            ("fields", "accountID".to_string()),
        ];
        let body = self
            .post(authorization, Subdomain::Bridge, "rest/identity/account", &query, AcceptVersion::V1)
            .await;
        account_id_of(&body)
    }

    /// Look up an existing remote account without creating one.
    pub async fn fetch_account(
        &self,
        authorization: &str,
        partner_id: &str,
        partner_account_id: &str,
    ) -> Option<i64> {
        let query = [
            ("partnerID", partner_id.to_string()),
            ("partnerAccountID", partner_account_id.to_string()),
            ("fields", "accountID".to_string()),
        ];
        let body = self
            .post(authorization, Subdomain::Bridge, "rest/identity/account", &query, AcceptVersion::V1)
            .await;
        account_id_of(&body)
    }

    pub async fn goals(&self, authorization: &str) -> RemoteBody {
        self.get(authorization, Subdomain::Bridge, "rest/content/goal", &[], AcceptVersion::V1)
            .await
    }

    pub async fn courses(&self, authorization: &str, goal_id: i64, difficulty: i64) -> RemoteBody {
        let query = [
            ("goalID", goal_id.to_string()),
            ("difficulty", difficulty.to_string()),
            ("pageSize", COURSE_PAGE_SIZE.to_string()),
            ("fields", COURSE_FIELDS.to_string()),
        ];
        self.get(authorization, Subdomain::Bridge, "rest/content/course", &query, AcceptVersion::V1)
            .await
    }

    pub async fn course_content(
        &self,
        authorization: &str,
        course_id: i64,
        site_language: &str,
    ) -> RemoteBody {
        let endpoint = format!("rest/content/course/{course_id}");
        let query = [("siteLanguage", site_language.to_string())];
        self.get(authorization, Subdomain::Bridge, &endpoint, &query, AcceptVersion::V1)
            .await
    }

    /// Metadata of the given videos. Newly seen entries are written to the
    /// video cache when one is attached; filled entries are left alone.
    #[instrument(skip(self, authorization), fields(count = video_ids.len()))]
    pub async fn list_videos(
        &self,
        authorization: &str,
        video_ids: &[i64],
        site_language: &str,
    ) -> Result<Vec<DialogMetadata>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = video_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let query = [
            ("dialogIDs", ids),
            ("siteLanguage", site_language.to_string()),
            ("fields", DIALOG_FIELDS.to_string()),
        ];
        let body = self
            .get(authorization, Subdomain::Bridge, "rest/content/dialog", &query, AcceptVersion::V1)
            .await;

        let dialogs: Vec<DialogMetadata> = match body.into_json() {
            Some(Value::Array(items)) => items.into_iter().filter_map(DialogMetadata::from_json).collect(),
            _ => {
                debug!("Dialog listing was not a JSON array");
                return Ok(Vec::new());
            }
        };

        if let Some(cache) = &self.video_cache {
            for dialog in &dialogs {
                let details = serde_json::to_string(&dialog.raw)?;
                match cache
                    .fill_cache(dialog.dialog_id, dialog.title.as_deref(), &details)
                    .await
                {
                    Ok(true) => debug!(video_id = dialog.dialog_id, "Cached dialog metadata"),
                    Ok(false) => {}
                    Err(e) => warn!(video_id = dialog.dialog_id, error = %e, "Failed to cache dialog metadata"),
                }
            }
        }

        Ok(dialogs)
    }

    pub async fn dialog_content(
        &self,
        authorization: &str,
        video_id: i64,
        site_language: &str,
    ) -> RemoteBody {
        let endpoint = format!("rest/content/dialog/{video_id}");
        let query = [("siteLanguage", site_language.to_string())];
        self.get(authorization, Subdomain::Bridge, &endpoint, &query, AcceptVersion::V1)
            .await
    }

    /// Progress report of one video, `None` when unavailable.
    #[instrument(skip(self, authorization))]
    pub async fn fetch_progress(&self, authorization: &str, video_id: i64) -> Option<RemoteProgressReport> {
        let endpoint = format!("rest/report/dialog/{video_id}/progress");
        let body = self
            .get(authorization, Subdomain::ReportCard, &endpoint, &[], AcceptVersion::V2)
            .await;
        match body {
            RemoteBody::Json(value @ Value::Object(_)) => match serde_json::from_value(value) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(error = %e, "Unreadable progress report");
                    None
                }
            },
            RemoteBody::Empty => None,
            other => {
                warn!(body = ?other, "Progress report was not a JSON object");
                None
            }
        }
    }

    /// Conversation list of the quiz chat bot for one video.
    pub async fn chat_progress(&self, authorization: &str, account_id: i64, video_id: i64) -> RemoteBody {
        let query = [
            ("chatBotId", CHAT_BOT_ID.to_string()),
            ("accountId", account_id.to_string()),
            ("dialogId", video_id.to_string()),
        ];
        self.get(authorization, Subdomain::Chat, "rest/conversation/list", &query, AcceptVersion::V1)
            .await
    }
}

/// Non-zero `accountID` of an account response.
fn account_id_of(body: &RemoteBody) -> Option<i64> {
    let value = body.as_json()?.get("accountID")?;
    let id = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (id != 0).then_some(id)
}
