//! Blocking HTTP client for the Graph API.
//!
//! Holds the fixed bearer-token header for the process lifetime; there is
//! no refresh logic — an expired token fails the run. One request is in
//! flight at a time, matching the sequential fetch loop.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{GraphError, Result};
use crate::export::attachment::AttachmentSource;
use crate::fetch::PageSource;
use crate::filter::Query;
use crate::model::attachment::{Attachment, AttachmentPage};
use crate::model::message::MessagePage;
use crate::model::profile::Profile;

/// Immutable client configuration: HTTP client with default headers,
/// the API root, and the fallback backoff for 429 answers that carry no
/// `Retry-After` header.
pub struct GraphClient {
    http: Client,
    base_url: Url,
    default_retry: Duration,
}

impl GraphClient {
    /// Build a client around a bearer token and the API settings.
    pub fn new(token: &str, config: &ApiConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GraphError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(config.base_url.trim_end_matches('/'))?,
            default_retry: Duration::from_secs(config.default_retry_secs),
        })
    }

    /// The signed-in user's profile (`GET /me`).
    pub fn profile(&self) -> Result<Profile> {
        let url = self.endpoint("me")?;
        self.get_json(url, &[])
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}/{path}", self.base_url)).map_err(GraphError::from)
    }

    /// GET a URL and decode the JSON body. 429 becomes
    /// [`GraphError::RateLimited`] with the server-provided delay; any
    /// other non-success status becomes [`GraphError::Status`].
    fn get_json<T: DeserializeOwned>(&self, url: Url, params: &[(&str, String)]) -> Result<T> {
        tracing::debug!(url = %url, "GET");
        let mut request = self.http.get(url.clone());
        if !params.is_empty() {
            request = request.query(params);
        }
        let response = request.send()?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GraphError::RateLimited {
                retry_after: retry_after(response.headers(), self.default_retry),
            });
        }
        if !status.is_success() {
            return Err(GraphError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json()?)
    }
}

impl PageSource for GraphClient {
    fn first_page(&self, folder: &str, query: &Query) -> Result<MessagePage> {
        let url = self.endpoint(&format!("me/mailFolders/{folder}/messages"))?;
        self.get_json(url, &query.params())
    }

    fn next_page(&self, next_link: &str) -> Result<MessagePage> {
        // The link is server-issued and already carries the query.
        self.get_json(Url::parse(next_link)?, &[])
    }
}

impl AttachmentSource for GraphClient {
    fn list_attachments(&self, message_id: &str) -> Result<Vec<Attachment>> {
        let url = self.endpoint(&format!("me/messages/{message_id}/attachments"))?;
        let page: AttachmentPage = self.get_json(url, &[])?;
        Ok(page.value)
    }
}

/// Parse the `Retry-After` header (whole seconds), falling back to the
/// configured default when absent or unreadable.
fn retry_after(headers: &HeaderMap, default: Duration) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
