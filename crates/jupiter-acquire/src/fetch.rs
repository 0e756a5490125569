use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// Júpiter Web course-information endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://uspdigital.usp.br/jupiterweb/obterDisciplina";
/// Query parameter carrying the course code.
pub const DEFAULT_QUERY_PARAM: &str = "sgldis";
/// Browser-like identification; the endpoint may reject default client identifiers.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how course pages are requested.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub endpoint: String,
    pub query_param: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            query_param: DEFAULT_QUERY_PARAM.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Raw response for one course code.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested.
    pub url: String,
    pub body: Vec<u8>,
}

/// Issues one GET per course code, reusing a single HTTP client.
#[derive(Debug, Clone)]
pub struct CourseFetcher {
    client: reqwest::Client,
    endpoint: Url,
    query_param: String,
}

impl CourseFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|source| Error::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            source,
        })?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            client,
            endpoint,
            query_param: config.query_param,
        })
    }

    /// URL queried for a course code: `{endpoint}?{query_param}={code}`.
    pub fn course_url(&self, code: &str) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(&self.query_param, code);
        url.to_string()
    }

    /// Fetch the course page for `code`.
    ///
    /// Fails on connection errors, timeouts, and any non-2xx status.
    pub async fn fetch(&self, code: &str) -> Result<FetchedPage> {
        let url = self.course_url(code);
        tracing::debug!(url = %url, "Fetching course page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::from_reqwest(&url, e))?;
        tracing::debug!(url = %url, bytes = body.len(), "Received HTML");

        Ok(FetchedPage {
            url,
            body: body.to_vec(),
        })
    }
}
