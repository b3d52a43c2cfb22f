//! Token introspection as defined in [RFC 7662](https://datatracker.ietf.org/doc/html/rfc7662)

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use http::{header, Request, Response, StatusCode, Uri};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    describe_error,
    transport::{execute_with_timeout, HttpTransport},
    AccessToken, Claim, ClientId, ClientSecret,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// An introspection request, sent as form data
#[derive(Clone, Debug, Serialize)]
pub struct IntrospectionRequest {
    /// The token being introspected
    pub token: AccessToken,

    /// A hint about the type of token, such as `access_token`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type_hint: Option<String>,

    /// The client ID of the resource server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,

    /// The client secret of the resource server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<ClientSecret>,
}

impl IntrospectionRequest {
    /// Constructs a request for a token with no client credentials
    pub fn new(token: AccessToken) -> Self {
        Self {
            token,
            token_type_hint: None,
            client_id: None,
            client_secret: None,
        }
    }
}

/// The authorization server's answer to an introspection request
///
/// A response is an error response when the exchange itself failed: the
/// request could not be sent, timed out, was answered with an error status,
/// or the body was not a JSON object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntrospectionResponse {
    http_status: Option<StatusCode>,
    error: Option<String>,
    active: bool,
    claims: Vec<Claim>,
}

impl IntrospectionResponse {
    /// Interprets an HTTP response from the introspection endpoint
    pub fn from_http(response: &Response<Bytes>) -> Self {
        let status = response.status();

        if !status.is_success() {
            let message = match error_code(response.body()) {
                Some(code) => format!("{status}: {code}"),
                None => status.to_string(),
            };
            return Self::error(Some(status), message);
        }

        match serde_json::from_slice::<Map<String, Value>>(response.body()) {
            Ok(document) => Self::from_document(Some(status), document),
            Err(err) => Self::error(Some(status), describe_error(&err)),
        }
    }

    /// Constructs a response from a JSON object
    pub fn from_document(http_status: Option<StatusCode>, document: Map<String, Value>) -> Self {
        let active = document
            .get("active")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut claims = Vec::with_capacity(document.len());
        for (name, value) in document {
            match value {
                Value::Array(values) => claims.extend(
                    values
                        .into_iter()
                        .map(|value| Claim::new(name.clone(), claim_value(value))),
                ),
                value => claims.push(Claim::new(name, claim_value(value))),
            }
        }

        Self {
            http_status,
            error: None,
            active,
            claims,
        }
    }

    /// Constructs an error response
    pub fn error(http_status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            http_status,
            error: Some(message.into()),
            active: false,
            claims: Vec::new(),
        }
    }

    /// Whether the exchange failed
    #[inline]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The reason the exchange failed
    #[inline]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The HTTP status returned by the endpoint, if one was received
    #[inline]
    pub fn http_status(&self) -> Option<StatusCode> {
        self.http_status
    }

    /// Whether the authorization server considers the token active
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Every claim returned, including `active`, in document order
    #[inline]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Consumes the response, returning its claims
    #[inline]
    pub fn into_claims(self) -> Vec<Claim> {
        self.claims
    }
}

fn claim_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn error_code(body: &[u8]) -> Option<String> {
    let document: Map<String, Value> = serde_json::from_slice(body).ok()?;
    document
        .get("error")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// A client bound to a single introspection endpoint
#[derive(Clone, Debug)]
pub struct IntrospectionClient {
    endpoint: Uri,
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl IntrospectionClient {
    /// Constructs a client that sends requests through `transport`
    pub fn new(endpoint: Uri, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoint,
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bounds the time allowed for each introspection exchange
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The introspection endpoint
    #[inline]
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// The time allowed for each introspection exchange
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Introspects a token
    ///
    /// Failures of the exchange are reported through
    /// [`IntrospectionResponse::is_error`] rather than as an `Err`.
    #[tracing::instrument(skip_all, fields(introspection.endpoint = %self.endpoint))]
    pub async fn send(&self, request: &IntrospectionRequest) -> IntrospectionResponse {
        let body = match serde_urlencoded::to_string(request) {
            Ok(body) => body,
            Err(err) => return IntrospectionResponse::error(None, describe_error(&err)),
        };

        let http_request = match Request::post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ACCEPT, "application/json")
            .body(Bytes::from(body))
        {
            Ok(req) => req,
            Err(err) => return IntrospectionResponse::error(None, describe_error(&err)),
        };

        tracing::trace!("sending introspection request");

        match execute_with_timeout(&*self.transport, http_request, self.timeout).await {
            Ok(response) => {
                tracing::debug!(
                    response.status = response.status().as_u16(),
                    "received introspection response"
                );
                let response = IntrospectionResponse::from_http(&response);
                if let Some(error) = response.error_message() {
                    tracing::warn!(error, "introspection endpoint returned an error");
                }
                response
            }
            Err(err) => {
                let error: &dyn std::error::Error = &err;
                tracing::warn!(error, "introspection request failed");
                IntrospectionResponse::error(None, describe_error(&err))
            }
        }
    }
}
