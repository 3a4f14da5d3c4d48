//! Cloudify manager implementation of the [`Orchestrator`] seam.
//!
//! Requests use basic authentication plus the `Tenant` header. Responses
//! are decoded leniently into [`ExecutionRecord`] values; validating their
//! shape is left to the lifecycle so protocol violations are classified
//! there rather than here.

mod error;

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::execution::{ExecutionId, ExecutionPost, ExecutionRecord};
use crate::orchestrator::{Orchestrator, OrchestratorFuture};

pub use error::CloudifyError;

const API_PATH: &str = "api/v3.1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const TENANT_HEADER: &str = "Tenant";

/// Connection settings for a Cloudify manager.
#[derive(Clone, Eq, PartialEq)]
pub struct ClientSettings {
    /// Manager host, optionally with scheme and port.
    pub host: String,
    /// User name for basic authentication.
    pub user: String,
    /// Password for basic authentication.
    pub password: String,
    /// Tenant the requests are scoped to.
    pub tenant: String,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("tenant", &self.tenant)
            .finish()
    }
}

#[derive(Deserialize)]
struct ExecutionList {
    #[serde(default)]
    items: Vec<ExecutionRecord>,
}

#[derive(Deserialize)]
struct VersionResponse {
    version: String,
}

/// REST client for the Cloudify manager's execution endpoints.
///
/// The client owns its connection pool; dropping it closes every pooled
/// connection.
#[derive(Clone, Debug)]
pub struct CloudifyClient {
    http: Client,
    base_url: String,
    settings: ClientSettings,
}

impl CloudifyClient {
    /// Builds a client for the given manager.
    ///
    /// # Errors
    ///
    /// Returns [`CloudifyError::Settings`] when the host is empty or the HTTP
    /// client cannot be constructed.
    pub fn new(settings: ClientSettings) -> Result<Self, CloudifyError> {
        let host = settings.host.trim();
        if host.is_empty() {
            return Err(CloudifyError::Settings(String::from(
                "manager host must not be empty",
            )));
        }
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| CloudifyError::Settings(err.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url(host),
            settings,
        })
    }

    /// Returns the API root every request is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the manager version.
    ///
    /// # Errors
    ///
    /// Returns [`CloudifyError`] when the request fails or the response is
    /// not a version document.
    pub async fn api_version(&self) -> Result<String, CloudifyError> {
        let url = self.endpoint("version");
        let response: VersionResponse = self.send(&url, self.http.get(&url)).await?;
        Ok(response.version)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        builder: RequestBuilder,
    ) -> Result<T, CloudifyError> {
        let response = builder
            .basic_auth(&self.settings.user, Some(&self.settings.password))
            .header(TENANT_HEADER, &self.settings.tenant)
            .send()
            .await
            .map_err(|err| CloudifyError::Transport {
                url: url.to_owned(),
                message: err.to_string(),
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| CloudifyError::Transport {
                url: url.to_owned(),
                message: err.to_string(),
            })?;

        if !status.is_success() {
            return Err(CloudifyError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(|err| CloudifyError::Decode {
            url: url.to_owned(),
            message: err.to_string(),
        })
    }
}

impl Orchestrator for CloudifyClient {
    type Error = CloudifyError;

    fn create_execution<'a>(
        &'a self,
        post: &'a ExecutionPost,
    ) -> OrchestratorFuture<'a, ExecutionRecord, Self::Error> {
        Box::pin(async move {
            let url = self.endpoint("executions");
            self.send(&url, self.http.post(&url).json(post)).await
        })
    }

    fn list_executions<'a>(
        &'a self,
        id: &'a ExecutionId,
    ) -> OrchestratorFuture<'a, Vec<ExecutionRecord>, Self::Error> {
        Box::pin(async move {
            let url = self.endpoint("executions");
            let request = self.http.get(&url).query(&[("id", id.as_str())]);
            let list: ExecutionList = self.send(&url, request).await?;
            Ok(list.items)
        })
    }
}

fn base_url(host: &str) -> String {
    let root = host.trim_end_matches('/');
    if root.starts_with("http://") || root.starts_with("https://") {
        format!("{root}/{API_PATH}")
    } else {
        format!("http://{root}/{API_PATH}")
    }
}
