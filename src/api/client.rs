//! REST client for the platform's public course-content API.

use futures_util::TryStreamExt;
use reqwest::Client;
use reqwest::header::{
    AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::error::ApiError;
use super::types::{AttachmentDescriptor, ContentNode, ContentPath};
use super::{ByteSource, CourseApi, DirectResponse};

/// HTTP connect timeout (30 seconds).
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// HTTP read timeout between stream chunks (5 minutes, for large files).
const READ_TIMEOUT_SECS: u64 = 300;

/// Upper bound on result pages followed per listing.
///
/// A listing deeper than this indicates a paging loop on the server side.
const MAX_RESULT_PAGES: usize = 100;

/// Reqwest-backed [`CourseApi`] implementation.
///
/// Holds a bearer-token session and is designed to be created once per pass
/// and shared, taking advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
}

/// One page of a paged listing.
#[derive(Debug, Deserialize)]
struct ResultPage<T> {
    results: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paging {
    #[serde(default)]
    next_page: Option<String>,
}

impl RestClient {
    /// Creates a client bound to a platform origin with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the token is not a valid header
    /// value or the HTTP client cannot be built.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::validation("access token is not a valid header value"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .user_agent(concat!("coursesync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(std::time::Duration::from_secs(READ_TIMEOUT_SECS))
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::validation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn children_url(&self, path: &ContentPath) -> String {
        let base = &self.base_url;
        let course = &path.course_id;
        match &path.content_id {
            None => format!("{base}/learn/api/public/v1/courses/{course}/contents"),
            Some(id) => {
                format!("{base}/learn/api/public/v1/courses/{course}/contents/{id}/children")
            }
        }
    }

    fn attachments_url(&self, path: &ContentPath) -> Result<String, ApiError> {
        let id = path
            .content_id
            .as_deref()
            .ok_or_else(|| ApiError::validation("attachment listing requires a content id"))?;
        Ok(format!(
            "{}/learn/api/public/v1/courses/{}/contents/{id}/attachments",
            self.base_url, path.course_id
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status().as_u16();
        if let Some(err) = ApiError::from_status(status, url) {
            return Err(err);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fetches a listing, following `paging.nextPage` references.
    async fn get_paged<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>, ApiError> {
        let mut results = Vec::new();
        let mut url = first_url;

        for _ in 0..MAX_RESULT_PAGES {
            let page: ResultPage<T> = self.get_json(&url).await?;
            results.extend(page.results);

            match page.paging.and_then(|p| p.next_page) {
                Some(next) => url = format!("{}{next}", self.base_url),
                None => return Ok(results),
            }
        }

        Err(ApiError::validation(format!(
            "listing exceeded {MAX_RESULT_PAGES} result pages"
        )))
    }

    async fn get_stream(&self, url: &str) -> Result<DirectResponse, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status().as_u16();
        // Session problems abort regardless of what the caller would accept;
        // every other status is the acceptance gate's decision.
        match status {
            401 => return Err(ApiError::Unauthorized),
            403 => return Err(ApiError::forbidden(url)),
            _ => {}
        }

        debug!(url, status, "opened direct stream");
        Ok(build_direct_response(response))
    }
}

fn build_direct_response(response: reqwest::Response) -> DirectResponse {
    let header_str = |name| {
        response
            .headers()
            .get(name)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .map(ToString::to_string)
    };

    let status = response.status().as_u16();
    let content_type = header_str(CONTENT_TYPE);
    let content_disposition = header_str(CONTENT_DISPOSITION);
    let content_length = header_str(CONTENT_LENGTH).and_then(|v| v.parse::<u64>().ok());

    let body: ByteSource = Box::pin(
        response
            .bytes_stream()
            .map_err(|e| ApiError::from_transport(&e)),
    );

    DirectResponse {
        status,
        content_type,
        content_length,
        content_disposition,
        body,
    }
}

#[async_trait::async_trait]
impl CourseApi for RestClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_children(&self, path: &ContentPath) -> Result<Vec<ContentNode>, ApiError> {
        self.get_paged(self.children_url(path)).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_attachments(
        &self,
        path: &ContentPath,
    ) -> Result<Vec<AttachmentDescriptor>, ApiError> {
        self.get_paged(self.attachments_url(path)?).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_attachment_stream(
        &self,
        path: &ContentPath,
        attachment_id: &str,
    ) -> Result<DirectResponse, ApiError> {
        let url = format!(
            "{}/{attachment_id}/download",
            self.attachments_url(path)?
        );
        self.get_stream(&url).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_direct(&self, url: &str) -> Result<DirectResponse, ApiError> {
        self.get_stream(url).await
    }
}
