use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The root-of-trust PEM bundle could not be read.
    #[error("failed to read trust store `{}`: {source}", path.display())]
    TrustStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Errors raised by the transport layer, passed through untranslated.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("invalid metadata name `{0}`")]
    InvalidHeaderName(String),

    #[error("invalid metadata value for `{0}`")]
    InvalidHeaderValue(String),

    #[error("api key is not a valid metadata value")]
    InvalidApiKey,
}
