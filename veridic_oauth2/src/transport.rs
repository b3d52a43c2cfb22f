//! HTTP transports used to reach the authorization server
//!
//! Discovery and introspection both go through an [`HttpTransport`]. The
//! default is [`ReqwestTransport`]; substitute your own to add client
//! authentication, proxies, or test doubles.

use std::{error, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use thiserror::Error;

/// An error while exchanging a request with a remote server
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,
    /// The request could not be sent or the response could not be read
    #[error("error sending request")]
    Request(#[from] reqwest::Error),
    /// An error raised by a custom transport
    #[error(transparent)]
    Other(Box<dyn error::Error + Send + Sync + 'static>),
}

impl TransportError {
    /// Wraps an error produced by a custom transport
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync + 'static>>,
    {
        Self::Other(error.into())
    }
}

/// Performs a single HTTP exchange
#[async_trait]
pub trait HttpTransport: std::fmt::Debug + Send + Sync {
    /// Sends the request and returns the full response
    ///
    /// Non-success status codes are not errors at this level.
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
}

/// The default transport, backed by a [`reqwest::Client`]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Constructs a transport with a freshly built client
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("veridic_oauth2/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Constructs a transport using an existing client
    #[inline]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let request = reqwest::Request::try_from(request)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut resp = Response::new(body);
        *resp.status_mut() = status;
        *resp.headers_mut() = headers;
        Ok(resp)
    }
}

/// Executes the request, failing with [`TransportError::Timeout`] if it
/// takes longer than `timeout`
pub(crate) async fn execute_with_timeout(
    transport: &dyn HttpTransport,
    request: Request<Bytes>,
    timeout: Duration,
) -> Result<Response<Bytes>, TransportError> {
    match tokio::time::timeout(timeout, transport.execute(request)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout),
    }
}
