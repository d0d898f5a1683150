//! S3 and Azure Blob objects, via the `object_store` crate.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::descriptor::{SourceDescriptor, SourceKind};

/// Fetches a single object fully into memory.
pub struct ObjectStoreBackend {
    kind: SourceKind,
    store: Arc<dyn ObjectStore>,
    path: ObjectPath,
}

impl fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreBackend")
            .field("kind", &self.kind)
            .field("store", &self.store.to_string())
            .field("path", &self.path.as_ref())
            .finish()
    }
}

impl ObjectStoreBackend {
    /// Use an already-built store (any [`ObjectStore`] implementation, e.g. the in-memory one).
    pub fn from_store(kind: SourceKind, store: Arc<dyn ObjectStore>, key: &str) -> Self {
        Self {
            kind,
            store,
            path: ObjectPath::from(key),
        }
    }

    /// Build the S3 or Azure client described by `descriptor`.
    pub fn connect(descriptor: &SourceDescriptor) -> IngestionResult<Self> {
        let kind = descriptor.kind();
        let location = descriptor.object().ok_or_else(|| {
            IngestionError::invalid_option(format!("{kind} source has no bucket/key location"))
        })?;

        let store: Arc<dyn ObjectStore> = match kind {
            SourceKind::S3 => s3::build(&location.bucket, descriptor)?,
            SourceKind::Azure => azure::build(&location.bucket, descriptor)?,
            other => {
                return Err(IngestionError::invalid_option(format!(
                    "{other} is not an object-store source"
                )));
            }
        };

        Ok(Self::from_store(kind, store, &location.key))
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Retrieve the object on a private current-thread runtime.
    ///
    /// Runtimes cannot nest, so a caller already inside a tokio runtime gets the fetch driven
    /// from a scoped helper thread instead.
    pub fn fetch(&self) -> IngestionResult<Bytes> {
        if tokio::runtime::Handle::try_current().is_err() {
            return self.fetch_blocking();
        }

        std::thread::scope(|scope| {
            scope
                .spawn(|| self.fetch_blocking())
                .join()
                .unwrap_or_else(|_| {
                    Err(IngestionError::BackendConnection {
                        backend: self.kind,
                        message: format!("fetch of object '{}' panicked", self.path),
                        source: None,
                    })
                })
        })
    }

    fn fetch_blocking(&self) -> IngestionResult<Bytes> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| IngestionError::backend(self.kind, "failed to start I/O runtime", e))?;

        runtime
            .block_on(async {
                let result = self.store.get(&self.path).await?;
                result.bytes().await
            })
            .map_err(|e| {
                IngestionError::backend(self.kind, format!("failed to fetch object '{}'", self.path), e)
            })
    }
}

#[cfg_attr(all(feature = "s3", feature = "azure"), allow(dead_code))]
fn not_enabled(kind: SourceKind) -> IngestionError {
    IngestionError::BackendConnection {
        backend: kind,
        message: format!("{kind} support not enabled (enable cargo feature '{kind}')"),
        source: None,
    }
}

#[cfg(any(feature = "s3", feature = "azure"))]
fn no_retries() -> object_store::RetryConfig {
    object_store::RetryConfig {
        max_retries: 0,
        ..Default::default()
    }
}

mod s3 {
    use super::*;

    #[cfg(feature = "s3")]
    pub(super) fn build(bucket: &str, descriptor: &SourceDescriptor) -> IngestionResult<Arc<dyn ObjectStore>> {
        use object_store::aws::AmazonS3Builder;

        let settings = descriptor.s3_settings();
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_retry(no_retries());

        if let Some(key) = &settings.access_key {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &settings.secret_key {
            builder = builder.with_secret_access_key(secret.expose());
        }
        if let Some(region) = &settings.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build().map_err(|e| {
            IngestionError::backend(SourceKind::S3, "failed to create S3 client", e)
        })?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "s3"))]
    pub(super) fn build(_bucket: &str, _descriptor: &SourceDescriptor) -> IngestionResult<Arc<dyn ObjectStore>> {
        Err(not_enabled(SourceKind::S3))
    }
}

/// Credentials parsed from an Azure storage connection string.
#[cfg_attr(not(feature = "azure"), allow(dead_code))]
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct AzureConnection {
    pub account: Option<String>,
    pub access_key: Option<String>,
    pub use_emulator: bool,
}

/// Parse `Key=Value;Key=Value` pairs; unknown keys (`EndpointSuffix`, ...) are ignored.
#[cfg_attr(not(feature = "azure"), allow(dead_code))]
pub(crate) fn parse_azure_connection_string(input: &str) -> AzureConnection {
    let mut out = AzureConnection::default();
    for part in input.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "AccountName" => out.account = Some(value.to_string()),
            "AccountKey" => out.access_key = Some(value.to_string()),
            "UseDevelopmentStorage" => out.use_emulator = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
    }
    out
}

mod azure {
    use super::*;

    #[cfg(feature = "azure")]
    pub(super) fn build(container: &str, descriptor: &SourceDescriptor) -> IngestionResult<Arc<dyn ObjectStore>> {
        use object_store::azure::MicrosoftAzureBuilder;

        let mut builder = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .with_retry(no_retries());

        if let Some(conn) = descriptor.connection_string() {
            let parsed = parse_azure_connection_string(conn.expose());
            if let Some(account) = &parsed.account {
                builder = builder.with_account(account);
            }
            if let Some(key) = &parsed.access_key {
                builder = builder.with_access_key(key);
            }
            if parsed.use_emulator {
                builder = builder.with_use_emulator(true);
            }
        }

        let store = builder.build().map_err(|e| {
            IngestionError::backend(SourceKind::Azure, "failed to create Azure Blob client", e)
        })?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "azure"))]
    pub(super) fn build(_container: &str, _descriptor: &SourceDescriptor) -> IngestionResult<Arc<dyn ObjectStore>> {
        Err(not_enabled(SourceKind::Azure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_credentials() {
        let parsed = parse_azure_connection_string(
            "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=abc==;EndpointSuffix=core.windows.net",
        );
        assert_eq!(parsed.account.as_deref(), Some("acct"));
        assert_eq!(parsed.access_key.as_deref(), Some("abc=="));
        assert!(!parsed.use_emulator);
    }

    #[test]
    fn parses_development_storage_flag() {
        assert!(parse_azure_connection_string("UseDevelopmentStorage=true").use_emulator);
    }

    #[test]
    fn fetch_inside_a_running_runtime_does_not_panic() {
        use object_store::memory::InMemory;
        use object_store::PutPayload;

        let store = Arc::new(InMemory::new());
        let outer = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        outer
            .block_on(store.put(&ObjectPath::from("data/a.csv"), PutPayload::from(b"a\n1\n".to_vec())))
            .unwrap();

        let backend = ObjectStoreBackend::from_store(SourceKind::S3, store, "data/a.csv");
        let bytes = outer.block_on(async { backend.fetch() }).unwrap();
        assert_eq!(bytes.as_ref(), b"a\n1\n");

        let missing = ObjectStoreBackend::from_store(SourceKind::S3, Arc::new(InMemory::new()), "nope");
        let err = outer.block_on(async { missing.fetch() }).unwrap_err();
        assert!(matches!(err, IngestionError::BackendConnection { backend: SourceKind::S3, .. }));
    }

    #[cfg(not(feature = "s3"))]
    #[test]
    fn s3_without_feature_is_a_backend_error() {
        let d = SourceDescriptor::s3("s3://bucket/data.csv").unwrap();
        let err = ObjectStoreBackend::connect(&d).unwrap_err();
        assert!(matches!(err, IngestionError::BackendConnection { backend: SourceKind::S3, .. }));
    }
}
