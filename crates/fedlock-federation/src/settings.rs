//! Engine-level settings.

use fedlock_types::SrvTarget;
use std::time::Duration;

/// Default timeout for every outbound federation HTTP call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings the engine needs from the surrounding configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationSettings {
    /// Applied to each outbound HTTP call (directory and peers).
    pub timeout: Duration,
    /// URL scheme used to reach peers at their SRV target.
    pub peer_scheme: String,
    /// URL scheme used to reach the public federation directory.
    pub directory_scheme: String,
}

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            peer_scheme: "https".to_string(),
            directory_scheme: "https".to_string(),
        }
    }
}

impl FederationSettings {
    /// URL of a peer's federation endpoint, e.g. `https://host:port/api/v1/federation/content`.
    pub fn peer_url(&self, target: &SrvTarget, endpoint: &str) -> String {
        format!(
            "{}://{}/api/v1/federation/{}",
            self.peer_scheme,
            target.authority(),
            endpoint
        )
    }

    /// URL on the public federation directory, e.g. `https://dir/api/v1/publickey`.
    pub fn directory_url(&self, host: &str, path: &str) -> String {
        format!(
            "{}://{}/api/v1/{}",
            self.directory_scheme,
            host.trim_end_matches('/'),
            path
        )
    }

    /// Per-call timeout; zero falls back to [`DEFAULT_TIMEOUT`].
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Builds the HTTP client shared by discovery and relay.
    pub(crate) fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.effective_timeout())
            .build()
    }
}
