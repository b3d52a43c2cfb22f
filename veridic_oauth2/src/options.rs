use std::{fmt, sync::Arc, time::Duration};

use thiserror::Error;

use crate::{ClientId, ClientSecret, FromAuthorizationHeader, HttpTransport, TokenRetriever};

/// A configuration that can never be used to authenticate requests
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Neither an authority nor an introspection endpoint was set
    #[error("you must either set an authority or an introspection endpoint")]
    MissingAuthorityOrEndpoint,
    /// Neither a client ID nor a custom introspection transport was set
    #[error("you must either set a client ID or a custom introspection transport")]
    MissingClientIdOrTransport,
    /// No token retriever was set
    #[error("a token retriever must be set")]
    MissingTokenRetriever,
    /// The default HTTP transport could not be constructed
    #[error("unable to construct the default HTTP transport")]
    HttpClient(#[from] reqwest::Error),
}

/// Options controlling how tokens are retrieved and introspected
///
/// Construct with [`Default`] and adjust with the `with_*` methods, or set
/// the public fields directly. Empty strings are treated as unset.
#[derive(Clone)]
pub struct IntrospectionOptions {
    /// Base URL of the authorization server, used to discover the
    /// introspection endpoint
    pub authority: Option<String>,

    /// The introspection endpoint; when set, discovery is skipped
    pub introspection_endpoint: Option<String>,

    /// The client ID presented to the introspection endpoint, usually the
    /// API scope name
    pub client_id: Option<ClientId>,

    /// The secret paired with the client ID
    pub client_secret: Option<ClientSecret>,

    /// How the token is found on a request
    pub token_retriever: Option<Arc<dyn TokenRetriever>>,

    /// Whether tokens containing a `.` are left for another handler to
    /// validate, without being introspected
    pub skip_tokens_with_dots: bool,

    /// Whether the raw token is added to the identity as an
    /// [`access_token`](crate::ACCESS_TOKEN_CLAIM) claim
    pub save_tokens_as_claims: bool,

    /// Whether endpoint resolution waits for the first request that needs it
    /// instead of happening during construction
    pub delay_load_discovery_document: bool,

    /// Time allowed for discovery and for each introspection exchange
    pub discovery_timeout: Duration,

    /// Transport used to fetch the discovery document
    pub discovery_transport: Option<Arc<dyn HttpTransport>>,

    /// Transport used to reach the introspection endpoint
    pub introspection_transport: Option<Arc<dyn HttpTransport>>,

    /// Optional `token_type_hint` sent with each introspection request
    pub token_type_hint: Option<String>,

    /// Claim type holding the subject's name
    pub name_claim_type: String,

    /// Claim type holding the subject's roles
    pub role_claim_type: String,

    /// Label of the authentication scheme attached to identities
    pub authentication_scheme: String,
}

impl Default for IntrospectionOptions {
    fn default() -> Self {
        Self {
            authority: None,
            introspection_endpoint: None,
            client_id: None,
            client_secret: None,
            token_retriever: Some(Arc::new(FromAuthorizationHeader::new())),
            skip_tokens_with_dots: true,
            save_tokens_as_claims: false,
            delay_load_discovery_document: false,
            discovery_timeout: Duration::from_secs(60),
            discovery_transport: None,
            introspection_transport: None,
            token_type_hint: None,
            name_claim_type: "name".to_owned(),
            role_claim_type: "role".to_owned(),
            authentication_scheme: "Bearer".to_owned(),
        }
    }
}

impl fmt::Debug for IntrospectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IntrospectionOptions")
            .field("authority", &self.authority)
            .field("introspection_endpoint", &self.introspection_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .field("token_retriever", &self.token_retriever.as_ref().map(|_| ".."))
            .field("skip_tokens_with_dots", &self.skip_tokens_with_dots)
            .field("save_tokens_as_claims", &self.save_tokens_as_claims)
            .field(
                "delay_load_discovery_document",
                &self.delay_load_discovery_document,
            )
            .field("discovery_timeout", &self.discovery_timeout)
            .field("discovery_transport", &self.discovery_transport)
            .field("introspection_transport", &self.introspection_transport)
            .field("token_type_hint", &self.token_type_hint)
            .field("name_claim_type", &self.name_claim_type)
            .field("role_claim_type", &self.role_claim_type)
            .field("authentication_scheme", &self.authentication_scheme)
            .finish()
    }
}

impl IntrospectionOptions {
    /// Sets the authority used for discovery
    #[inline]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Sets the introspection endpoint, bypassing discovery
    #[inline]
    pub fn with_introspection_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.introspection_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the client ID and secret presented to the introspection endpoint
    #[inline]
    pub fn with_client_credentials(mut self, client_id: ClientId, secret: ClientSecret) -> Self {
        self.client_id = Some(client_id);
        self.client_secret = Some(secret);
        self
    }

    /// Sets the client ID without a secret
    #[inline]
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Replaces the token retriever
    #[inline]
    pub fn with_token_retriever<R>(mut self, retriever: R) -> Self
    where
        R: TokenRetriever + 'static,
    {
        self.token_retriever = Some(Arc::new(retriever));
        self
    }

    /// Sets whether tokens containing a `.` skip introspection
    #[inline]
    pub fn with_skip_tokens_with_dots(mut self, skip: bool) -> Self {
        self.skip_tokens_with_dots = skip;
        self
    }

    /// Sets whether the raw token is saved as a claim
    #[inline]
    pub fn with_save_tokens_as_claims(mut self, save: bool) -> Self {
        self.save_tokens_as_claims = save;
        self
    }

    /// Defers endpoint resolution until the first request that needs it
    #[inline]
    pub fn with_delayed_discovery(mut self) -> Self {
        self.delay_load_discovery_document = true;
        self
    }

    /// Sets the time allowed for discovery and introspection exchanges
    #[inline]
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Sets a custom transport for fetching the discovery document
    #[inline]
    pub fn with_discovery_transport<T>(mut self, transport: T) -> Self
    where
        T: HttpTransport + 'static,
    {
        self.discovery_transport = Some(Arc::new(transport));
        self
    }

    /// Sets a custom transport for introspection requests
    #[inline]
    pub fn with_introspection_transport<T>(mut self, transport: T) -> Self
    where
        T: HttpTransport + 'static,
    {
        self.introspection_transport = Some(Arc::new(transport));
        self
    }

    /// Sets the `token_type_hint` sent with each introspection request
    #[inline]
    pub fn with_token_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.token_type_hint = Some(hint.into());
        self
    }

    /// Sets the claim types used for the subject's name and roles
    #[inline]
    pub fn with_claim_types(
        mut self,
        name_claim_type: impl Into<String>,
        role_claim_type: impl Into<String>,
    ) -> Self {
        self.name_claim_type = name_claim_type.into();
        self.role_claim_type = role_claim_type.into();
        self
    }

    /// Sets the authentication scheme label attached to identities
    #[inline]
    pub fn with_authentication_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.authentication_scheme = scheme.into();
        self
    }

    /// Checks that the options can be used to authenticate requests
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if present(&self.authority).is_none() && present(&self.introspection_endpoint).is_none() {
            return Err(ConfigurationError::MissingAuthorityOrEndpoint);
        }

        let has_client_id = self
            .client_id
            .as_ref()
            .map_or(false, |id| !id.as_str().trim().is_empty());
        if !has_client_id && self.introspection_transport.is_none() {
            return Err(ConfigurationError::MissingClientIdOrTransport);
        }

        if self.token_retriever.is_none() {
            return Err(ConfigurationError::MissingTokenRetriever);
        }

        Ok(())
    }
}

/// The trimmed value of an optional string setting, if it is set and not blank
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
