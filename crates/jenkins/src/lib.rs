//! Jenkins notification transport.
//!
//! Implements [`webhook::NotificationTransport`] by calling the Jenkins Git
//! plugin's `notifyCommit` endpoint:
//!
//! ```text
//! GET {base_url}/git/notifyCommit?url=<clone url>&branches=<branch>&sha1=<commit>
//! ```
//!
//! `branches` is left out when the endpoint sets `omit_branch_name`, `sha1`
//! when it sets `omit_hash_code`. Jenkins answers with a plain-text summary of
//! the jobs it scheduled; that text becomes the delivery result message.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, clone-URL resolution, TLS options,
//! and timeouts all live here. The [`webhook`] crate sees only
//! [`webhook::NotificationTransport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;
use webhook::{
    CiEndpoint, CloneSource, DeliveryError, HookError, NotificationRequest, NotificationTransport,
    Settings,
};

/// Default timeout for one `notifyCommit` call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Clone URLs
// ---------------------------------------------------------------------------

/// Base URLs the hosting platform serves clones from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUrls {
    /// HTTP(S) base URL of the platform (e.g. `"https://git.example.com"`).
    pub base_url: String,
    /// SSH base URL (e.g. `"ssh://git@git.example.com:7999"`), if SSH is served.
    #[serde(default)]
    pub ssh_base_url: Option<String>,
}

impl PlatformUrls {
    /// Resolves the clone URL Jenkins should match jobs against.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::InvalidEndpoint`] if the settings ask for an
    /// SSH clone URL but no SSH base URL is configured.
    pub fn clone_url(&self, settings: &Settings) -> Result<String, DeliveryError> {
        let repository = &settings.repository;
        let path = format!(
            "{}/{}.git",
            repository.project_key.as_str().to_lowercase(),
            repository.slug
        );

        match &settings.clone_source {
            CloneSource::Http => Ok(format!("{}/scm/{path}", self.base_url.trim_end_matches('/'))),
            CloneSource::Ssh => {
                let ssh_base = self.ssh_base_url.as_deref().ok_or_else(|| {
                    DeliveryError::InvalidEndpoint {
                        endpoint: repository.to_string(),
                        message: "SSH clone requested but no SSH base URL is configured".to_string(),
                    }
                })?;
                Ok(format!("{}/{path}", ssh_base.trim_end_matches('/')))
            }
            CloneSource::Custom { url } => Ok(url.clone()),
        }
    }
}

/// Builds the `notifyCommit` URL for one endpoint.
///
/// # Errors
///
/// Returns [`DeliveryError::InvalidEndpoint`] if the endpoint base URL cannot
/// be parsed.
pub fn notify_commit_url(
    endpoint: &CiEndpoint,
    clone_url: &str,
    request: &NotificationRequest,
) -> Result<Url, DeliveryError> {
    let base = endpoint.base_url.trim().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/git/notifyCommit")).map_err(|e| {
        DeliveryError::InvalidEndpoint {
            endpoint: endpoint.base_url.clone(),
            message: e.to_string(),
        }
    })?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("url", clone_url);
        if !endpoint.omit_branch_name {
            query.append_pair("branches", request.target_branch.as_str());
        }
        if !endpoint.omit_hash_code {
            query.append_pair("sha1", request.commit.as_str());
        }
    }
    Ok(url)
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// [`NotificationTransport`] calling Jenkins over HTTP.
pub struct JenkinsTransport {
    platform: PlatformUrls,
    client: Client,
    insecure_client: Client,
}

impl JenkinsTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Configuration`] if the HTTP client cannot be built
    /// (e.g. no TLS backend is available).
    pub fn new(platform: PlatformUrls, timeout: Duration) -> Result<Self, HookError> {
        let build = |accept_invalid_certs: bool| {
            Client::builder()
                .timeout(timeout)
                .danger_accept_invalid_certs(accept_invalid_certs)
                .build()
                .map_err(|e| HookError::Configuration {
                    message: format!("failed to build HTTP client: {e}"),
                })
        };

        Ok(Self {
            platform,
            client: build(false)?,
            insecure_client: build(true)?,
        })
    }

    fn client_for(&self, endpoint: &CiEndpoint) -> &Client {
        if endpoint.ignore_certs {
            &self.insecure_client
        } else {
            &self.client
        }
    }
}

#[async_trait]
impl NotificationTransport for JenkinsTransport {
    async fn deliver(
        &self,
        settings: &Settings,
        endpoint: &CiEndpoint,
        request: &NotificationRequest,
    ) -> Result<String, DeliveryError> {
        let clone_url = self.platform.clone_url(settings)?;
        let url = notify_commit_url(endpoint, &clone_url, request)?;
        debug!(%url, "Calling notifyCommit");

        let response = self
            .client_for(endpoint)
            .get(url)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body.trim().to_string())
    }
}
