//! Per-repository notification settings and the read-only lookup port.
//!
//! [`SettingsService`] is the only read path for "is this repository enabled"
//! and "which CI endpoints should be told". An absent result is the normal
//! "notifications off" signal, not an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{EventKind, HookError, Repository, UserName};

// ---------------------------------------------------------------------------
// Endpoint descriptors
// ---------------------------------------------------------------------------

/// A CI server to be told about new commits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiEndpoint {
    /// Base URL of the CI server (e.g. `"https://ci.example.com/jenkins"`).
    pub base_url: String,
    /// Skip TLS certificate verification for this endpoint.
    #[serde(default)]
    pub ignore_certs: bool,
    /// Leave the commit SHA out of the trigger request.
    #[serde(default)]
    pub omit_hash_code: bool,
    /// Leave the branch name out of the trigger request.
    #[serde(default)]
    pub omit_branch_name: bool,
}

impl CiEndpoint {
    /// Creates an endpoint descriptor with default options.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ignore_certs: false,
            omit_hash_code: false,
            omit_branch_name: false,
        }
    }
}

impl std::fmt::Display for CiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

/// Where the CI server should clone the repository from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CloneSource {
    /// The platform's HTTP(S) clone URL.
    #[default]
    Http,
    /// The platform's SSH clone URL.
    Ssh,
    /// An explicitly configured clone URL.
    Custom {
        /// The clone URL handed to the CI server verbatim.
        url: String,
    },
}

// ---------------------------------------------------------------------------
// Filter configuration
// ---------------------------------------------------------------------------

/// Whether branch patterns list the branches to notify for or to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchMode {
    /// Only branches matching a pattern notify.
    Allow,
    /// Branches matching a pattern never notify.
    Deny,
}

/// Branch allow-list or deny-list.
///
/// Patterns are matched against the whole branch name; `*` matches any run of
/// characters (including `/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOptions {
    /// How [`Self::patterns`] is interpreted.
    pub mode: BranchMode,
    /// Branch name patterns.
    #[serde(default)]
    pub patterns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn default_enabled() -> bool {
    true
}

/// Notification configuration for one repository.
///
/// Owned by the external settings store; the core only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Repository these settings apply to.
    pub repository: Repository,
    /// Whether notifications are on for the repository.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// CI endpoints to notify. At least one is required.
    pub endpoints: Vec<CiEndpoint>,
    /// Clone URL flavour handed to the CI server.
    #[serde(default, rename = "clone")]
    pub clone_source: CloneSource,
    /// Users whose events never trigger a notification.
    #[serde(default)]
    pub ignore_committers: Vec<UserName>,
    /// Optional branch allow-list or deny-list.
    #[serde(default)]
    pub branch_options: Option<BranchOptions>,
    /// Event kinds that may notify. Empty means every kind.
    #[serde(default)]
    pub trigger_on: Vec<EventKind>,
}

impl Settings {
    /// Creates enabled settings with a single endpoint and no filter configuration.
    pub fn new(repository: Repository, endpoint: CiEndpoint) -> Self {
        Self {
            repository,
            enabled: true,
            endpoints: vec![endpoint],
            clone_source: CloneSource::default(),
            ignore_committers: Vec::new(),
            branch_options: None,
            trigger_on: Vec::new(),
        }
    }

    /// Checks the invariants the rest of the system relies on.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Configuration`] if no endpoint is configured, an
    /// endpoint URL is not absolute HTTP(S), or a custom clone URL is empty.
    pub fn validate(&self) -> Result<(), HookError> {
        if self.endpoints.is_empty() {
            return Err(HookError::Configuration {
                message: format!("repository {} has no CI endpoints", self.repository),
            });
        }

        for endpoint in &self.endpoints {
            let url = endpoint.base_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(HookError::Configuration {
                    message: format!(
                        "repository {}: endpoint '{}' is not an http(s) URL",
                        self.repository, endpoint.base_url
                    ),
                });
            }
        }

        if let CloneSource::Custom { url } = &self.clone_source {
            if url.trim().is_empty() {
                return Err(HookError::Configuration {
                    message: format!("repository {}: custom clone URL is empty", self.repository),
                });
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lookup port
// ---------------------------------------------------------------------------

/// Read-only lookup of repository settings.
///
/// Implementations must be cheap, side-effect free, and safe to call
/// concurrently; they are consulted on the platform's event thread.
pub trait SettingsService: Send + Sync {
    /// Returns the settings for `repository`, or `None` when notifications are
    /// off for it (no settings stored, or stored but disabled).
    fn get_settings(&self, repository: &Repository) -> Option<Settings>;
}

/// [`SettingsService`] backed by a map loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsService {
    settings: HashMap<Repository, Settings>,
}

impl InMemorySettingsService {
    /// Creates an empty service; every lookup reports notifications off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a service from a list of validated settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`HookError::Configuration`] raised by
    /// [`Settings::validate`], or one naming a repository configured twice.
    pub fn from_settings(
        settings: impl IntoIterator<Item = Settings>,
    ) -> Result<Self, HookError> {
        let mut service = Self::new();
        for entry in settings {
            entry.validate()?;
            if service.settings.contains_key(&entry.repository) {
                return Err(HookError::Configuration {
                    message: format!("repository {} is configured twice", entry.repository),
                });
            }
            service.settings.insert(entry.repository.clone(), entry);
        }
        Ok(service)
    }

    /// Inserts or replaces the settings for a repository.
    pub fn insert(&mut self, settings: Settings) {
        self.settings.insert(settings.repository.clone(), settings);
    }

    /// Number of repositories with stored settings (enabled or not).
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Returns `true` if no repository has stored settings.
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

impl SettingsService for InMemorySettingsService {
    fn get_settings(&self, repository: &Repository) -> Option<Settings> {
        self.settings
            .get(repository)
            .filter(|settings| settings.enabled)
            .cloned()
    }
}
