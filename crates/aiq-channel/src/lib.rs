#![cfg_attr(test, allow(warnings))]

//! Channel construction for the AIQ speech gRPC APIs.
//!
//! Resolves transport security from the caller's options, assembles TLS and
//! per-call credentials, and composes metadata interceptors onto the
//! transport channel. Stubs are built by the caller on the returned
//! [`AiqChannel`].

pub mod channel;
pub mod credentials;
pub mod error;
pub mod interceptor;
pub mod options;

pub use channel::{AiqChannel, create_async_channel, create_channel};
pub use error::ChannelError;
pub use interceptor::{ClientInterceptor, HeaderInterceptor, MetadataAppender};
pub use options::{ChannelOptions, Header, HeaderValue, SecurityMode};
