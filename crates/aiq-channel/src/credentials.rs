use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue};
use tonic::transport::{Certificate, ClientTlsConfig};

use crate::error::ChannelError;
use crate::interceptor::{ClientInterceptor, MetadataAppender};

/// Wire metadata key carrying the AIQ API key.
pub const API_KEY_METADATA: &str = "x-api-key";

/// Environment override for the root-of-trust PEM bundle.
pub const TRUST_STORE_ENV: &str = "GRPC_DEFAULT_SSL_ROOTS_FILE_PATH";

const DEFAULT_TRUST_STORE: &str = "/etc/ssl/certs/ca-certificates.crt";

/// Transport credentials plus optional per-call authentication.
pub struct AiqCredentials {
    pub tls: ClientTlsConfig,
    pub call: Option<ApiKeyCredentials>,
}

/// Supplies `("x-api-key", <key>)` on every outgoing call.
///
/// Captures the key once, immutably; safe to invoke concurrently and
/// repeatedly from any transport worker.
#[derive(Clone)]
pub struct ApiKeyCredentials {
    value: AsciiMetadataValue,
}

impl ApiKeyCredentials {
    pub fn new(api_key: &str) -> Result<Self, ChannelError> {
        let value =
            AsciiMetadataValue::try_from(api_key).map_err(|_| ChannelError::InvalidApiKey)?;
        Ok(Self { value })
    }
}

impl ClientInterceptor for ApiKeyCredentials {
    fn intercept(&self, mut metadata: MetadataAppender<'_>) {
        metadata.append(
            AsciiMetadataKey::from_static(API_KEY_METADATA),
            self.value.clone(),
        );
    }
}

impl fmt::Debug for ApiKeyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCredentials").finish_non_exhaustive()
    }
}

/// Builds the composite credentials for a secure channel: server
/// certificate validation against the trust store, plus call credentials
/// when a key is configured.
///
/// A trust store read failure is fatal and aborts channel construction.
pub fn create_credentials(
    api_key: Option<&str>,
    root_ca: Option<&Path>,
) -> Result<AiqCredentials, ChannelError> {
    let path = root_ca.map_or_else(default_trust_store, Path::to_path_buf);
    let pem = fs::read(&path).map_err(|source| ChannelError::TrustStore { path, source })?;
    let tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem));
    let call = api_key.map(ApiKeyCredentials::new).transpose()?;
    Ok(AiqCredentials { tls, call })
}

fn default_trust_store() -> PathBuf {
    std::env::var_os(TRUST_STORE_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_TRUST_STORE), PathBuf::from)
}
