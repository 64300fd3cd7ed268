use std::future::Future;
use std::time::Duration;

use frontend_core::RegistrationRequest;
use reqwest::{Client, StatusCode, header};

/// Upper bound on a single registry round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// No response was received from the registry.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("registry request failed: {0}")]
    Request(reqwest::Error),

    /// The connection itself could not be established.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Unavailable(e.to_string())
        } else {
            TransportError::Request(e)
        }
    }
}

/// The two calls the registry handshake needs. Implementations report the
/// status the registry answered with; interpreting it is the caller's job.
pub trait RegistryTransport: Send + Sync + 'static {
    fn register(
        &self,
        app: &str,
        request: &RegistrationRequest,
    ) -> impl Future<Output = Result<StatusCode, TransportError>> + Send;

    fn renew(
        &self,
        app: &str,
        host: &str,
    ) -> impl Future<Output = Result<StatusCode, TransportError>> + Send;
}

/// Talks to a Eureka-compatible registry over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/eureka/apps/{app}`
    pub fn app_url(&self, app: &str) -> String {
        format!("{}/eureka/apps/{}", self.base_url, app)
    }

    /// `{base}/eureka/apps/{app}/{host}`
    pub fn instance_url(&self, app: &str, host: &str) -> String {
        format!("{}/{}", self.app_url(app), host)
    }
}

impl RegistryTransport for HttpTransport {
    async fn register(&self, app: &str, request: &RegistrationRequest) -> Result<StatusCode, TransportError> {
        let res = self
            .client
            .post(self.app_url(app))
            .header(header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;
        Ok(res.status())
    }

    async fn renew(&self, app: &str, host: &str) -> Result<StatusCode, TransportError> {
        let res = self
            .client
            .put(self.instance_url(app, host))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        Ok(res.status())
    }
}
