//! Process-lifetime key material, loaded lazily and exactly once.

use crate::collaborators::{ConfigClient, LicenseClient};
use crate::FederationError;
use fedlock_crypto::FederationPrivateKey;
use fedlock_types::FederationDirectoryConfig;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Lazily loaded private key, license checksum and directory location.
///
/// Each value is fetched at most once per process: concurrent first callers
/// wait on the same in-flight fetch instead of issuing their own. A failed
/// fetch leaves the cell empty so the next caller tries again.
pub struct LocalSecrets {
    license: Arc<dyn LicenseClient>,
    config: Arc<dyn ConfigClient>,
    private_key: OnceCell<Arc<FederationPrivateKey>>,
    license_checksum: OnceCell<String>,
    directory: OnceCell<FederationDirectoryConfig>,
}

impl LocalSecrets {
    pub fn new(license: Arc<dyn LicenseClient>, config: Arc<dyn ConfigClient>) -> Self {
        Self {
            license,
            config,
            private_key: OnceCell::new(),
            license_checksum: OnceCell::new(),
            directory: OnceCell::new(),
        }
    }

    /// This node's private key. Failures are reported as decryption errors,
    /// since nothing can be decrypted without it.
    pub async fn private_key(&self) -> Result<Arc<FederationPrivateKey>, FederationError> {
        self.private_key
            .get_or_try_init(|| async {
                let encoded = self.license.private_key().await.map_err(|e| {
                    tracing::error!("failed to load private key from license service: {}", e);
                    FederationError::Decryption(format!("private key unavailable: {e}"))
                })?;
                let key = tokio::task::spawn_blocking(move || {
                    FederationPrivateKey::from_encoded(&encoded)
                })
                .await?
                .map_err(FederationError::opening)?;
                tracing::info!("loaded federation private key");
                Ok::<_, FederationError>(Arc::new(key))
            })
            .await
            .cloned()
    }

    pub async fn license_checksum(&self) -> Result<String, FederationError> {
        self.license_checksum
            .get_or_try_init(|| async {
                self.license.license_checksum().await.map_err(|e| {
                    tracing::error!("failed to load license checksum: {}", e);
                    FederationError::Discovery(format!("license checksum unavailable: {e}"))
                })
            })
            .await
            .cloned()
    }

    pub async fn directory(&self) -> Result<FederationDirectoryConfig, FederationError> {
        self.directory
            .get_or_try_init(|| async {
                self.config.federation_config().await.map_err(|e| {
                    tracing::error!("failed to load federation directory config: {}", e);
                    FederationError::Discovery(format!("directory config unavailable: {e}"))
                })
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ServiceError;
    use async_trait::async_trait;
    use fedlock_crypto::test_keys;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowLicense {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl LicenseClient for SlowLicense {
        async fn private_key(&self) -> Result<String, ServiceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && n == 0 {
                return Err(ServiceError::new("license", "unavailable"));
            }
            Ok(test_keys::home().private_key)
        }

        async fn license_checksum(&self) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok("license-sum".to_string())
        }
    }

    struct NoConfig;

    #[async_trait]
    impl ConfigClient for NoConfig {
        async fn federation_config(&self) -> Result<FederationDirectoryConfig, ServiceError> {
            Err(ServiceError::new("config", "down"))
        }
    }

    fn secrets(fail_first: bool) -> (Arc<SlowLicense>, Arc<LocalSecrets>) {
        let license = Arc::new(SlowLicense {
            calls: AtomicUsize::new(0),
            fail_first,
        });
        let secrets = Arc::new(LocalSecrets::new(license.clone(), Arc::new(NoConfig)));
        (license, secrets)
    }

    #[tokio::test]
    async fn concurrent_first_use_fetches_once() {
        let (license, secrets) = secrets(false);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let secrets = secrets.clone();
            handles.push(tokio::spawn(async move { secrets.license_checksum().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "license-sum");
        }
        assert_eq!(license.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_retried_by_next_caller() {
        let (license, secrets) = secrets(true);

        let err = secrets.private_key().await.unwrap_err();
        assert!(matches!(err, FederationError::Decryption(_)));

        secrets.private_key().await.unwrap();
        secrets.private_key().await.unwrap();
        assert_eq!(license.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn config_failure_is_a_discovery_error() {
        let (_, secrets) = secrets(false);
        assert!(matches!(
            secrets.directory().await,
            Err(FederationError::Discovery(_))
        ));
    }
}
