use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use tonic::metadata::MetadataMap;
use tonic::transport::{Channel, Endpoint};
use tower::Service;
use tracing::debug;

use crate::credentials::{self, API_KEY_METADATA};
use crate::error::ChannelError;
use crate::interceptor::{ClientInterceptor, HeaderInterceptor, MetadataAppender, MetadataPair};
use crate::options::{ChannelOptions, Header, SecurityMode};

type InterceptorStack = Arc<[Arc<dyn ClientInterceptor>]>;

/// Transport channel plus the interceptors composed onto it.
///
/// Implements `tower::Service` over HTTP requests, so any generated client
/// accepts it in place of the bare transport channel. Cheap to clone;
/// clones share the transport and the interceptor stack. Concurrent calls
/// share no mutable state.
///
/// Generic over the inner service so stacks can be composed and exercised
/// without a live transport; defaults to the `tonic` channel.
#[derive(Clone)]
pub struct AiqChannel<S = Channel> {
    inner: S,
    interceptors: InterceptorStack,
}

impl<S> AiqChannel<S> {
    /// Bare channel, zero interceptors.
    pub fn new(inner: S) -> Self {
        Self::with_interceptors(inner, Vec::new())
    }

    /// Composes `interceptors` onto `inner`. Pre-call hooks run in the
    /// given order; response post-processing runs in reverse.
    pub fn with_interceptors(inner: S, interceptors: Vec<Arc<dyn ClientInterceptor>>) -> Self {
        Self {
            inner,
            interceptors: interceptors.into(),
        }
    }

    #[must_use]
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Applies a caller-supplied stub constructor to this channel.
    pub fn stub<T>(self, build: impl FnOnce(Self) -> T) -> T {
        build(self)
    }
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for AiqChannel<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = CallFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: http::Request<ReqBody>) -> Self::Future {
        // The body and every other call detail pass through untouched.
        if !self.interceptors.is_empty() {
            let mut metadata = MetadataMap::from_headers(mem::take(request.headers_mut()));
            for interceptor in self.interceptors.iter() {
                interceptor.intercept(MetadataAppender::new(&mut metadata));
            }
            *request.headers_mut() = metadata.into_headers();
        }
        CallFuture {
            inner: self.inner.call(request),
            interceptors: self.interceptors.clone(),
        }
    }
}

pin_project! {
    /// Future of one intercepted call. Resolves when the inner call does,
    /// after running the response post-process hooks.
    pub struct CallFuture<F> {
        #[pin]
        inner: F,
        interceptors: InterceptorStack,
    }
}

impl<F, ResBody, E> Future for CallFuture<F>
where
    F: Future<Output = Result<http::Response<ResBody>, E>>,
{
    type Output = Result<http::Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.inner.poll(cx) {
            Poll::Ready(Ok(mut response)) => {
                for interceptor in this.interceptors.iter().rev() {
                    interceptor.post_process(response.headers_mut());
                }
                Poll::Ready(Ok(response))
            }
            other => other,
        }
    }
}

/// Builds a channel for blocking-context callers. The transport dials on
/// first use; construction fails only on configuration or trust store
/// errors.
pub fn create_channel(options: &ChannelOptions) -> Result<AiqChannel, ChannelError> {
    let (endpoint, interceptors) = assemble(options)?;
    Ok(AiqChannel::with_interceptors(
        endpoint.connect_lazy(),
        interceptors,
    ))
}

/// Builds a channel and dials eagerly, failing fast when the endpoint is
/// unreachable.
pub async fn create_async_channel(options: &ChannelOptions) -> Result<AiqChannel, ChannelError> {
    let (endpoint, interceptors) = assemble(options)?;
    let channel = endpoint.connect().await?;
    Ok(AiqChannel::with_interceptors(channel, interceptors))
}

fn assemble(
    options: &ChannelOptions,
) -> Result<(Endpoint, Vec<Arc<dyn ClientInterceptor>>), ChannelError> {
    let mode = options.security_mode();
    let mut headers = options
        .additional_headers
        .iter()
        .map(MetadataPair::parse)
        .collect::<Result<Vec<_>, _>>()?;
    let mut interceptors: Vec<Arc<dyn ClientInterceptor>> = Vec::new();

    let endpoint = match mode {
        SecurityMode::Insecure => {
            // Explicit insecure wins over the key-implies-secure default,
            // but a configured key is still delivered, as a plaintext
            // header.
            if let Some(api_key) = options.api_key() {
                headers.push(MetadataPair::parse(&Header::new(API_KEY_METADATA, api_key))?);
            }
            Endpoint::from_shared(options.endpoint_uri())?
        }
        SecurityMode::Secure => {
            let creds =
                credentials::create_credentials(options.api_key(), options.root_ca.as_deref())?;
            if let Some(call) = creds.call {
                interceptors.push(Arc::new(call));
            }
            Endpoint::from_shared(options.endpoint_uri())?.tls_config(creds.tls)?
        }
    };

    if !headers.is_empty() {
        interceptors.push(Arc::new(HeaderInterceptor::from_pairs(headers)));
    }

    debug!(
        endpoint = %options.endpoint,
        mode = ?mode,
        interceptors = interceptors.len(),
        "assembled channel"
    );

    Ok((endpoint, interceptors))
}
