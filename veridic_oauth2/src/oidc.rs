//! Introspection endpoint resolution through OpenID Connect discovery

use std::time::Duration;

use bytes::Bytes;
use http::{header, Request, StatusCode, Uri};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::transport::{execute_with_timeout, HttpTransport, TransportError};

/// Path of the discovery document relative to the authority
pub const DISCOVERY_DOCUMENT_PATH: &str = ".well-known/openid-configuration";

/// An error while resolving the introspection endpoint
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The discovery document could not be fetched
    #[error("error fetching discovery document")]
    Transport(#[from] TransportError),
    /// The authority answered the discovery request with an error status
    #[error("discovery document request failed with status {0}")]
    Status(StatusCode),
    /// The discovery document is not a JSON object
    #[error("discovery document is malformed")]
    Malformed(#[from] serde_json::Error),
    /// The discovery document does not name an introspection endpoint
    #[error("discovery document does not contain a string `introspection_endpoint`")]
    MissingIntrospectionEndpoint,
    /// A URL could not be used to make a request
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// The reason the URL was rejected
        #[source]
        source: http::Error,
    },
}

/// The URL of the discovery document for an authority
///
/// Trailing slashes on the authority are collapsed so that exactly one
/// separates it from the well-known path.
///
/// ```
/// use veridic_oauth2::oidc::discovery_url;
///
/// assert_eq!(
///     discovery_url("https://issuer.example/"),
///     "https://issuer.example/.well-known/openid-configuration",
/// );
/// ```
pub fn discovery_url(authority: &str) -> String {
    format!(
        "{}/{}",
        authority.trim_end_matches('/'),
        DISCOVERY_DOCUMENT_PATH
    )
}

/// Parses an endpoint URL, rejecting anything unusable as a request target
pub(crate) fn parse_endpoint(url: &str) -> Result<Uri, ResolutionError> {
    url.parse::<Uri>()
        .map_err(|err| ResolutionError::InvalidUrl {
            url: url.to_owned(),
            source: err.into(),
        })
}

/// Fetches the authority's discovery document and extracts its
/// `introspection_endpoint`
#[tracing::instrument(skip(transport, timeout), fields(discovery.url = tracing::field::Empty))]
pub async fn fetch_introspection_endpoint(
    transport: &dyn HttpTransport,
    authority: &str,
    timeout: Duration,
) -> Result<Uri, ResolutionError> {
    let url = discovery_url(authority);
    tracing::Span::current().record("discovery.url", url.as_str());
    tracing::debug!("fetching discovery document");

    let request = Request::get(url.as_str())
        .header(header::ACCEPT, "application/json")
        .body(Bytes::new())
        .map_err(|source| ResolutionError::InvalidUrl {
            url: url.clone(),
            source,
        })?;

    let response = execute_with_timeout(transport, request, timeout)
        .await
        .map_err(|err| {
            let error: &dyn std::error::Error = &err;
            tracing::warn!(error, "discovery document request failed");
            err
        })?;

    if !response.status().is_success() {
        tracing::warn!(
            http.status_code = response.status().as_u16(),
            "discovery document request failed; unexpected response status",
        );
        return Err(ResolutionError::Status(response.status()));
    }

    let document: Map<String, Value> = serde_json::from_slice(response.body())?;

    let endpoint = document
        .get("introspection_endpoint")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            tracing::warn!("discovery document does not name an introspection endpoint");
            ResolutionError::MissingIntrospectionEndpoint
        })?;

    parse_endpoint(endpoint)
}
