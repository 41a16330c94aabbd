//! HTTP client for the remote case-management API.

use docket_core::HttpConfig;
use docket_core::error::AppError;
use docket_core::remote::{
    RemoteCategory, RemoteContact, RemoteMatter, RemoteMatterStatus, RemoteMatterType, RemoteUser,
};
use docket_core::traits::{Collection, PracticeSource};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::fetch::{fetch_with_retry, status_error};
use crate::pagination::{PAGINATION_HEADER, Page, PageSource, load_all_pages, parse_pagination};

/// Collection response body: a bare array or an object wrapping it.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ListBody<T> {
    Array(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_records(self) -> Vec<T> {
        match self {
            ListBody::Array(records) | ListBody::Wrapped { data: records } => records,
        }
    }
}

/// Single-record response body.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ItemBody<T> {
    Wrapped { data: T },
    Plain(T),
}

impl<T> ItemBody<T> {
    fn into_record(self) -> T {
        match self {
            ItemBody::Wrapped { data } | ItemBody::Plain(data) => data,
        }
    }
}

/// Client for the practice-management REST API.
///
/// Requests are sent one at a time; rate-limited responses are retried with
/// exponential backoff and pages are spaced by [`HttpConfig::page_delay`].
///
/// # Examples
///
/// ```no_run
/// use docket_client::PracticeClient;
/// use docket_core::HttpConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PracticeClient::new("https://app.example.com/api/v4", HttpConfig::default())?;
/// let matter = client.fetch_matter("token", 981).await?;
/// println!("{:?}", matter.title);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PracticeClient {
    client: Client,
    base_url: Url,
    config: HttpConfig,
}

impl PracticeClient {
    /// Creates a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the URL is malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(base_url: &str, config: HttpConfig) -> Result<Self, AppError> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url =
            Url::parse(&normalized).map_err(|_| AppError::InvalidUrl(base_url.to_string()))?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Sends an authenticated GET with rate-limit retries.
    async fn get(&self, url: &Url, token: &str) -> Result<Response, AppError> {
        fetch_with_retry(
            move || {
                let request = self.client.get(url.clone()).bearer_auth(token);
                async move {
                    request
                        .send()
                        .await
                        .map_err(|e| self.map_transport_error(e))
                }
            },
            self.config.max_retries,
        )
        .await
    }

    fn map_transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.config.timeout.as_secs())
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {}", e))
        } else {
            AppError::ClientError(e.to_string())
        }
    }

    /// Reads every page of a collection endpoint.
    pub async fn list<T>(&self, path: &str, token: &str) -> Result<Collection<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        let pages = HttpPages {
            client: self,
            url: self.endpoint(path)?,
            token,
        };
        load_all_pages(&pages, self.config.page_size, self.config.page_delay).await
    }

    /// Fetches one matter with its embedded references.
    pub async fn fetch_matter(&self, token: &str, remote_id: i64) -> Result<RemoteMatter, AppError> {
        let url = self.endpoint(&format!("matters/{}", remote_id))?;
        let resp = self.get(&url, token).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), url.to_string()));
        }

        let body: ItemBody<RemoteMatter> = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;
        Ok(body.into_record())
    }
}

/// Pages of one collection endpoint for one credential.
struct HttpPages<'a> {
    client: &'a PracticeClient,
    url: Url,
    token: &'a str,
}

impl<T> PageSource<T> for HttpPages<'_>
where
    T: DeserializeOwned + Send,
{
    async fn fetch_page(&self, page: u32) -> Result<Page<T>, AppError> {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &self.client.config.page_size.to_string());

        let resp = self.client.get(&url, self.token).await?;
        let status = resp.status();
        if !status.is_success() {
            return Ok(Page {
                status: status.as_u16(),
                url: url.to_string(),
                records: Vec::new(),
                pagination: None,
            });
        }

        let pagination = parse_pagination(
            resp.headers()
                .get(PAGINATION_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        let body: ListBody<T> = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Page {
            status: status.as_u16(),
            url: url.to_string(),
            records: body.into_records(),
            pagination,
        })
    }
}

impl PracticeSource for PracticeClient {
    async fn list_users(&self, token: &str) -> Result<Collection<RemoteUser>, AppError> {
        self.list("users", token).await
    }

    async fn list_contacts(&self, token: &str) -> Result<Collection<RemoteContact>, AppError> {
        self.list("contacts", token).await
    }

    async fn list_matter_types(
        &self,
        token: &str,
    ) -> Result<Collection<RemoteMatterType>, AppError> {
        self.list("matter_types", token).await
    }

    async fn list_matter_statuses(
        &self,
        token: &str,
    ) -> Result<Collection<RemoteMatterStatus>, AppError> {
        self.list("matter_statuses", token).await
    }

    async fn list_categories(&self, token: &str) -> Result<Collection<RemoteCategory>, AppError> {
        self.list("categories", token).await
    }

    async fn list_matters(&self, token: &str) -> Result<Collection<RemoteMatter>, AppError> {
        self.list("matters", token).await
    }

    async fn get_matter(&self, token: &str, remote_id: i64) -> Result<RemoteMatter, AppError> {
        self.fetch_matter(token, remote_id).await
    }
}
