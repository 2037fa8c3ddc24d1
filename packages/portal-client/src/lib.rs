//! HTTP session client for the live SMS portal.
//!
//! Behaves like a single browser tab: one cookie jar, one "current location"
//! that moves whenever a page is fetched. Logging in submits the portal's
//! login form; the feed page is read as server-rendered HTML.
//!
//! # Example
//!
//! ```rust,ignore
//! use portal_client::{PortalClient, PortalOptions};
//!
//! let portal = PortalClient::new(PortalOptions::new("https://www.ivasms.com".parse()?))?;
//! portal.login("me@example.com", "hunter2").await?;
//! let page = portal.navigate_to(&portal.feed_url()).await?;
//! println!("{:?}", page.top_row());
//! ```

use std::time::Duration;

pub mod error;
pub mod page;

pub use error::{PortalError, Result};
pub use page::Page;

use tokio::sync::RwLock;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct PortalOptions {
    pub base_url: Url,
    pub login_path: String,
    pub feed_path: String,
    pub timeout: Duration,
}

impl PortalOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            login_path: "/login".to_string(),
            feed_path: "/portal/live/my_sms".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct PortalClient {
    client: reqwest::Client,
    options: PortalOptions,
    location: RwLock<Option<Url>>,
}

impl PortalClient {
    pub fn new(options: PortalOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            options,
            location: RwLock::new(None),
        })
    }

    pub fn login_url(&self) -> Url {
        self.join(&self.options.login_path)
    }

    pub fn feed_url(&self) -> Url {
        self.join(&self.options.feed_path)
    }

    fn join(&self, path: &str) -> Url {
        let mut url = self.options.base_url.clone();
        url.set_path(path);
        url
    }

    /// True if `url` points at the login form.
    pub fn is_login_url(&self, url: &Url) -> bool {
        url.path().trim_end_matches('/') == self.options.login_path.trim_end_matches('/')
    }

    /// URL of the last page fetched, `None` before the first fetch.
    pub async fn current_location(&self) -> Option<Url> {
        self.location.read().await.clone()
    }

    /// True if the last fetched page was the login form.
    pub async fn on_login_page(&self) -> bool {
        match self.current_location().await {
            Some(url) => self.is_login_url(&url),
            None => false,
        }
    }

    /// GET a page, following redirects, and move the current location there.
    pub async fn navigate_to(&self, url: &Url) -> Result<Page> {
        let response = self.client.get(url.clone()).send().await?;
        self.into_page(response).await
    }

    /// Submit the login form.
    ///
    /// Succeeds only when the portal redirects away from the login page.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let login_url = self.login_url();
        let form_page = self.navigate_to(&login_url).await?;
        let token = page::csrf_token(&form_page.html);

        let mut fields = vec![
            ("email", email.to_string()),
            ("password", password.to_string()),
            ("remember", "on".to_string()),
        ];
        if let Some(token) = token {
            fields.push(("_token", token));
        }

        let response = self.client.post(login_url).form(&fields).send().await?;
        let landed = self.into_page(response).await?;

        if self.is_login_url(&landed.url) {
            tracing::warn!(email, "Portal bounced login back to the login page");
            return Err(PortalError::LoginRejected);
        }

        tracing::info!(location = %landed.url, "Portal login successful");
        Ok(())
    }

    async fn into_page(&self, response: reqwest::Response) -> Result<Page> {
        let url = response.url().clone();
        *self.location.write().await = Some(url.clone());

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text().await?;
        Ok(Page { url, html })
    }
}
