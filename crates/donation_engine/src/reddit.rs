use std::time::{Duration, Instant};

use donation_core::{Amount, DonationRecord};
use engine_logging::{engine_debug, engine_info, engine_warn};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::{form_urlencoded, Url};

use crate::{format_donation_message, Notifier, NotifyError, NotifyReceipt};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Refresh the bearer token this long before reddit says it expires.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct RedditSettings {
    pub auth_base: String,
    pub api_base: String,
    pub subreddit: String,
    pub thread_title: String,
    pub thread_author: String,
    /// Fundraiser page linked from every announcement.
    pub source_url: String,
    pub minimum: Amount,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl RedditSettings {
    pub fn new(
        subreddit: impl Into<String>,
        thread_title: impl Into<String>,
        thread_author: impl Into<String>,
        source_url: impl Into<String>,
        minimum: Amount,
    ) -> Self {
        Self {
            auth_base: "https://www.reddit.com".to_string(),
            api_base: "https://oauth.reddit.com".to_string(),
            subreddit: subreddit.into(),
            thread_title: thread_title.into(),
            thread_author: thread_author.into(),
            source_url: source_url.into(),
            minimum,
            user_agent: "linux:donation_sticky:v1.0".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Deserialize)]
struct Post {
    name: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct CommentResponse {
    json: CommentJson,
}

#[derive(Deserialize)]
struct CommentJson {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    data: Option<CommentData>,
}

#[derive(Deserialize)]
struct CommentData {
    #[serde(default)]
    things: Vec<Thing>,
}

#[derive(Deserialize)]
struct Thing {
    data: ThingData,
}

#[derive(Deserialize)]
struct ThingData {
    name: String,
}

/// Posts each donation as a reply in the subreddit's discussion thread and
/// stickies it.
pub struct RedditNotifier {
    client: reqwest::Client,
    settings: RedditSettings,
    credentials: RedditCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl RedditNotifier {
    pub fn new(
        settings: RedditSettings,
        credentials: RedditCredentials,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            settings,
            credentials,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, NotifyError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        engine_debug!("Refreshing reddit access token");
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", &self.credentials.refresh_token)
            .finish();
        let response = self
            .client
            .post(format!("{}/api/v1/access_token", self.settings.auth_base))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Auth(format!("{status}: {body}")));
        }
        let token: TokenResponse = read_json(response).await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_SLACK);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    /// Drops a token the API has stopped accepting so the next call re-auths.
    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, NotifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.token.lock().await.take();
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn find_thread(&self, token: &str) -> Result<String, NotifyError> {
        engine_debug!("Finding discussion thread");
        let mut url = Url::parse(&format!(
            "{}/r/{}/search",
            self.settings.api_base, self.settings.subreddit
        ))
        .map_err(|err| NotifyError::Transport(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("q", &self.settings.thread_title)
            .append_pair("restrict_sr", "1")
            .append_pair("sort", "new")
            .append_pair("raw_json", "1");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .send()
            .await
            .map_err(transport)?;
        let listing: Listing = read_json(self.check_status(response).await?).await?;

        let title = self.settings.thread_title.to_lowercase();
        listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .find(|post| {
                post.author.eq_ignore_ascii_case(&self.settings.thread_author)
                    && post.title.to_lowercase().contains(&title)
            })
            .map(|post| {
                engine_debug!("Found discussion thread {}", post.name);
                post.name
            })
            .ok_or_else(|| NotifyError::ThreadNotFound {
                title: self.settings.thread_title.clone(),
                author: self.settings.thread_author.clone(),
            })
    }

    async fn post_form(
        &self,
        token: &str,
        endpoint: &str,
        pairs: &[(&str, &str)],
    ) -> Result<reqwest::Response, NotifyError> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().copied())
            .finish();
        self.client
            .post(format!("{}{}", self.settings.api_base, endpoint))
            .bearer_auth(token)
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(transport)
    }

    async fn post_reply(
        &self,
        token: &str,
        thread: &str,
        text: &str,
    ) -> Result<String, NotifyError> {
        let response = self
            .post_form(
                token,
                "/api/comment",
                &[("api_type", "json"), ("thing_id", thread), ("text", text)],
            )
            .await?;
        let status = response.status().as_u16();
        let reply: CommentResponse = read_json(self.check_status(response).await?).await?;
        if !reply.json.errors.is_empty() {
            return Err(NotifyError::Rejected {
                status,
                body: serde_json::Value::Array(reply.json.errors).to_string(),
            });
        }
        reply
            .json
            .data
            .and_then(|data| data.things.into_iter().next())
            .map(|thing| thing.data.name)
            .ok_or_else(|| NotifyError::Transport("reply response carried no comment".into()))
    }

    /// Best effort: a refused or failed pin leaves the reply in place.
    async fn pin(&self, token: &str, comment: &str) -> bool {
        let response = match self
            .post_form(
                token,
                "/api/distinguish",
                &[("api_type", "json"), ("how", "yes"), ("id", comment), ("sticky", "true")],
            )
            .await
        {
            Ok(response) => response,
            Err(err) => {
                engine_warn!("Failed to pin comment {}: {}", comment, err);
                return false;
            }
        };
        match response.status() {
            status if status.is_success() => true,
            StatusCode::FORBIDDEN => {
                engine_warn!("Not allowed to pin comment {}; left unpinned", comment);
                false
            }
            status => {
                engine_warn!("Failed to pin comment {}: status {}", comment, status);
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl Notifier for RedditNotifier {
    async fn notify(&self, record: &DonationRecord) -> Result<NotifyReceipt, NotifyError> {
        let token = self.access_token().await?;
        let thread = self.find_thread(&token).await?;
        let text =
            format_donation_message(record, &self.settings.source_url, self.settings.minimum);
        let comment_id = self.post_reply(&token, &thread, &text).await?;
        let pinned = self.pin(&token, &comment_id).await;
        if pinned {
            engine_info!("Stickied donation message from {}", record.donor_name);
        } else {
            engine_info!("Posted donation message from {}", record.donor_name);
        }
        Ok(NotifyReceipt { comment_id, pinned })
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, NotifyError> {
    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| NotifyError::Transport(format!("unexpected response body: {err}")))
}

fn transport(err: reqwest::Error) -> NotifyError {
    NotifyError::Transport(err.to_string())
}
