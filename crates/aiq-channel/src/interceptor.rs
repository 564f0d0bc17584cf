use std::fmt;
use std::sync::Arc;

use tonic::metadata::{
    AsciiMetadataKey, AsciiMetadataValue, BinaryMetadataKey, BinaryMetadataValue, MetadataMap,
};

use crate::error::ChannelError;
use crate::options::{Header, HeaderValue};

/// Append-only view over an outgoing call's metadata.
///
/// Interceptors only ever extend the metadata; caller-set entries, the
/// method, the deadline and the request payload stay out of reach.
pub struct MetadataAppender<'a> {
    target: &'a mut MetadataMap,
}

impl<'a> MetadataAppender<'a> {
    pub(crate) fn new(target: &'a mut MetadataMap) -> Self {
        Self { target }
    }

    pub fn append(&mut self, key: AsciiMetadataKey, value: AsciiMetadataValue) {
        self.target.append(key, value);
    }

    pub fn append_bin(&mut self, key: BinaryMetadataKey, value: BinaryMetadataValue) {
        self.target.append_bin(key, value);
    }
}

/// A per-call hook invoked for every RPC issued through the channel,
/// regardless of call shape.
pub trait ClientInterceptor: Send + Sync {
    /// Rewrites the outgoing metadata before the call is issued. Invoked on
    /// whichever worker issues the call; implementors hold no mutable state.
    fn intercept(&self, metadata: MetadataAppender<'_>);

    /// Transforms the response headers once the call resolves. Identity
    /// unless overridden.
    fn post_process(&self, _headers: &mut http::HeaderMap) {}
}

/// One validated metadata entry.
#[derive(Debug, Clone)]
pub(crate) enum MetadataPair {
    Ascii(AsciiMetadataKey, AsciiMetadataValue),
    Binary(BinaryMetadataKey, BinaryMetadataValue),
}

impl MetadataPair {
    pub(crate) fn parse(header: &Header) -> Result<Self, ChannelError> {
        match &header.value {
            HeaderValue::Ascii(value) => {
                let key = AsciiMetadataKey::from_bytes(header.name.as_bytes())
                    .map_err(|_| ChannelError::InvalidHeaderName(header.name.clone()))?;
                let value = AsciiMetadataValue::try_from(value.as_str())
                    .map_err(|_| ChannelError::InvalidHeaderValue(header.name.clone()))?;
                Ok(Self::Ascii(key, value))
            }
            HeaderValue::Binary(bytes) => {
                if !header.name.ends_with("-bin") {
                    return Err(ChannelError::InvalidHeaderName(header.name.clone()));
                }
                let key = BinaryMetadataKey::from_bytes(header.name.as_bytes())
                    .map_err(|_| ChannelError::InvalidHeaderName(header.name.clone()))?;
                Ok(Self::Binary(key, BinaryMetadataValue::from_bytes(bytes)))
            }
        }
    }

    fn append_to(&self, metadata: &mut MetadataAppender<'_>) {
        match self {
            Self::Ascii(key, value) => metadata.append(key.clone(), value.clone()),
            Self::Binary(key, value) => metadata.append_bin(key.clone(), value.clone()),
        }
    }
}

/// Appends a fixed, ordered header list to every outgoing call.
///
/// Caller-set metadata comes first; duplicates are appended, never merged.
#[derive(Clone)]
pub struct HeaderInterceptor {
    headers: Arc<[MetadataPair]>,
}

impl fmt::Debug for HeaderInterceptor {
    // The header list may carry the plaintext-fallback api key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderInterceptor")
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl HeaderInterceptor {
    /// Validates `headers` up front so every later call is infallible.
    pub fn new(headers: &[Header]) -> Result<Self, ChannelError> {
        let parsed = headers
            .iter()
            .map(MetadataPair::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_pairs(parsed))
    }

    pub(crate) fn from_pairs(pairs: Vec<MetadataPair>) -> Self {
        Self {
            headers: pairs.into(),
        }
    }
}

impl ClientInterceptor for HeaderInterceptor {
    fn intercept(&self, mut metadata: MetadataAppender<'_>) {
        for pair in self.headers.iter() {
            pair.append_to(&mut metadata);
        }
    }
}
