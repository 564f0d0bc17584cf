use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Transport security resolved from [`ChannelOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    Secure,
    Insecure,
}

/// A metadata value, either printable ASCII or raw bytes.
///
/// Binary values require a header name with the gRPC `-bin` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderValue {
    Ascii(String),
    Binary(Vec<u8>),
}

/// One header to inject into every outgoing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: HeaderValue,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: HeaderValue::Ascii(value.into()),
        }
    }

    pub fn binary(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: HeaderValue::Binary(value.into()),
        }
    }
}

impl From<(&str, &str)> for Header {
    fn from((name, value): (&str, &str)) -> Self {
        Self::new(name, value)
    }
}

/// Caller-facing channel configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelOptions {
    /// `host:port` of the AIQ portal. A URI scheme, when present, is kept
    /// verbatim.
    pub endpoint: String,

    /// AIQ project API key. An empty string counts as absent.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Use plaintext and skip server certificate verification. Unset
    /// derives from API key presence.
    #[serde(default)]
    pub insecure: Option<bool>,

    /// Headers appended to every call, after any caller-set metadata.
    #[serde(default)]
    pub additional_headers: Vec<Header>,

    /// Root-of-trust PEM bundle override for secure channels.
    #[serde(default)]
    pub root_ca: Option<PathBuf>,
}

impl ChannelOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// The configured API key, with empty strings normalized to absent.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Resolves the transport security. An explicit `insecure` always wins;
    /// otherwise a configured key implies an encrypted transport.
    #[must_use]
    pub fn security_mode(&self) -> SecurityMode {
        match self.insecure {
            Some(true) => SecurityMode::Insecure,
            Some(false) => SecurityMode::Secure,
            None => {
                if self.api_key().is_some() {
                    SecurityMode::Secure
                } else {
                    SecurityMode::Insecure
                }
            }
        }
    }

    pub(crate) fn endpoint_uri(&self) -> String {
        if self.endpoint.contains("://") {
            return self.endpoint.clone();
        }
        let scheme = match self.security_mode() {
            SecurityMode::Secure => "https",
            SecurityMode::Insecure => "http",
        };
        format!("{scheme}://{}", self.endpoint)
    }
}

impl fmt::Debug for ChannelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelOptions")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("insecure", &self.insecure)
            .field("additional_headers", &self.additional_headers)
            .field("root_ca", &self.root_ca)
            .finish()
    }
}
