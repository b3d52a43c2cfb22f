use std::sync::Arc;

use http::{request::Parts, Uri};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::{
    oidc::{self, ResolutionError},
    options::present,
    AccessToken, AuthenticateResult, AuthenticationFailure, Claim, ClaimsIdentity,
    ConfigurationError, HttpTransport, IntrospectionClient, IntrospectionOptions,
    IntrospectionRequest, IntrospectionResponse, ReqwestTransport, TokenRetriever,
    ACCESS_TOKEN_CLAIM,
};

/// The introspection client could not be initialized
///
/// The underlying error is shared: every caller that depends on the failed
/// initialization observes the same error.
#[derive(Clone, Debug, Error)]
#[error("unable to initialize the introspection client")]
pub struct InitializationError {
    #[source]
    source: Arc<ResolutionError>,
}

impl InitializationError {
    /// The reason endpoint resolution failed
    #[inline]
    pub fn resolution_error(&self) -> &ResolutionError {
        &self.source
    }
}

impl From<ResolutionError> for InitializationError {
    #[inline]
    fn from(source: ResolutionError) -> Self {
        Self {
            source: Arc::new(source),
        }
    }
}

/// An error constructing an [`Introspector`]
#[derive(Debug, Error)]
pub enum IntrospectorError {
    /// The options are unusable
    #[error("invalid introspection configuration")]
    Configuration(#[from] ConfigurationError),
    /// Eager initialization failed
    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

#[derive(Debug)]
enum EndpointSource {
    Explicit(String),
    Discover {
        authority: String,
        transport: Arc<dyn HttpTransport>,
    },
}

struct Inner {
    options: IntrospectionOptions,
    endpoint_source: EndpointSource,
    token_retriever: Arc<dyn TokenRetriever>,
    introspection_transport: Arc<dyn HttpTransport>,
    client: OnceCell<Result<IntrospectionClient, InitializationError>>,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Introspector")
            .field("options", &self.options)
            .field("endpoint_source", &self.endpoint_source)
            .field("client", &self.client)
            .finish()
    }
}

/// Authenticates requests by introspecting their bearer tokens
///
/// The introspection client is built at most once and shared by every
/// clone of the introspector.
#[derive(Clone, Debug)]
#[must_use]
pub struct Introspector {
    inner: Arc<Inner>,
}

impl Introspector {
    /// Validates the options and constructs an introspector
    ///
    /// Unless [`delay_load_discovery_document`] is set, the introspection
    /// endpoint is resolved before this returns, so discovery failures
    /// surface here.
    ///
    /// [`delay_load_discovery_document`]: IntrospectionOptions::delay_load_discovery_document
    pub async fn new(options: IntrospectionOptions) -> Result<Self, IntrospectorError> {
        let introspector = Self::new_deferred(options)?;

        if !introspector.inner.options.delay_load_discovery_document {
            introspector.client().await?;
        }

        Ok(introspector)
    }

    /// Validates the options and constructs an introspector that resolves
    /// its endpoint on first use, regardless of
    /// [`delay_load_discovery_document`](IntrospectionOptions::delay_load_discovery_document)
    pub fn new_deferred(options: IntrospectionOptions) -> Result<Self, ConfigurationError> {
        options.validate()?;

        let mut default_transport = None;

        let endpoint_source = match (
            present(&options.introspection_endpoint),
            present(&options.authority),
        ) {
            (Some(endpoint), _) => EndpointSource::Explicit(endpoint.to_owned()),
            (None, Some(authority)) => EndpointSource::Discover {
                authority: authority.to_owned(),
                transport: match &options.discovery_transport {
                    Some(transport) => transport.clone(),
                    None => shared_default(&mut default_transport)?,
                },
            },
            (None, None) => return Err(ConfigurationError::MissingAuthorityOrEndpoint),
        };

        let token_retriever = options
            .token_retriever
            .clone()
            .ok_or(ConfigurationError::MissingTokenRetriever)?;

        let introspection_transport = match &options.introspection_transport {
            Some(transport) => transport.clone(),
            None => shared_default(&mut default_transport)?,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                options,
                endpoint_source,
                token_retriever,
                introspection_transport,
                client: OnceCell::new(),
            }),
        })
    }

    /// The options this introspector was built from
    ///
    /// These are never modified. A discovered endpoint is not written back
    /// into [`introspection_endpoint`](IntrospectionOptions::introspection_endpoint);
    /// use [`Introspector::introspection_endpoint`] to read the resolved value.
    #[inline]
    pub fn options(&self) -> &IntrospectionOptions {
        &self.inner.options
    }

    /// The resolved introspection endpoint, once initialization has succeeded
    pub fn introspection_endpoint(&self) -> Option<&Uri> {
        match self.inner.client.get() {
            Some(Ok(client)) => Some(client.endpoint()),
            _ => None,
        }
    }

    /// The introspection client, initializing it if this is the first use
    ///
    /// Concurrent first callers wait on a single initialization. Its
    /// outcome, success or failure, is kept for the life of the
    /// introspector and is never retried.
    ///
    /// Initialization runs on its own task, so dropping a caller that is
    /// waiting on it does not abandon discovery.
    pub async fn client(&self) -> Result<&IntrospectionClient, InitializationError> {
        if !self.inner.client.initialized() {
            let inner = self.inner.clone();
            let init = tokio::spawn(async move {
                inner.client.get_or_init(|| inner.initialize()).await;
            });

            if let Err(err) = init.await {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }

        self.inner
            .client
            .get_or_init(|| self.inner.initialize())
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Authenticates a request
    ///
    /// Expected failures, such as a missing or inactive token, are returned
    /// as [`AuthenticateResult::Failure`]. An `Err` is returned only when the
    /// introspection client could not be initialized.
    pub async fn authenticate(
        &self,
        request: &Parts,
    ) -> Result<AuthenticateResult, InitializationError> {
        let token = self
            .inner
            .token_retriever
            .retrieve(request)
            .unwrap_or_default();

        self.authenticate_token(&token).await
    }

    /// Authenticates a token that has already been retrieved from a request
    #[tracing::instrument(skip_all, fields(scheme = %self.inner.options.authentication_scheme))]
    pub async fn authenticate_token(
        &self,
        token: &str,
    ) -> Result<AuthenticateResult, InitializationError> {
        let options = &self.inner.options;

        if token.trim().is_empty() {
            tracing::debug!("authentication failed: no bearer token");
            return Ok(AuthenticateResult::Failure(
                AuthenticationFailure::NoBearerToken,
            ));
        }

        if options.skip_tokens_with_dots && token.contains('.') {
            tracing::debug!("token contains a dot; skipping introspection");
            return Ok(AuthenticateResult::Failure(
                AuthenticationFailure::TokenContainsDot,
            ));
        }

        let client = self.client().await?;

        let request = IntrospectionRequest {
            token: AccessToken::new(token.to_owned()),
            token_type_hint: options.token_type_hint.clone(),
            client_id: options.client_id.clone(),
            client_secret: options.client_secret.clone(),
        };

        let response = client.send(&request).await;

        Ok(self.identify(token, response).into())
    }

    fn identify(
        &self,
        token: &str,
        response: IntrospectionResponse,
    ) -> Result<ClaimsIdentity, AuthenticationFailure> {
        let options = &self.inner.options;

        if let Some(error) = response.error_message() {
            tracing::debug!(error, "authentication failed: introspection error");
            return Err(AuthenticationFailure::IntrospectionError(
                error.to_owned(),
            ));
        }

        if !response.is_active() {
            tracing::debug!("authentication failed: token is not active");
            return Err(AuthenticationFailure::InvalidToken);
        }

        let mut claims: Vec<Claim> = response
            .into_claims()
            .into_iter()
            .filter(|c| c.claim_type != "active")
            .collect();

        if options.save_tokens_as_claims {
            claims.push(Claim::new(ACCESS_TOKEN_CLAIM, token));
        }

        tracing::trace!(claims = claims.len(), "token is active");

        Ok(ClaimsIdentity::new(
            claims,
            options.authentication_scheme.clone(),
            options.name_claim_type.clone(),
            options.role_claim_type.clone(),
        ))
    }
}

fn shared_default(
    slot: &mut Option<Arc<dyn HttpTransport>>,
) -> Result<Arc<dyn HttpTransport>, ConfigurationError> {
    if let Some(transport) = slot {
        return Ok(transport.clone());
    }

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
    *slot = Some(transport.clone());
    Ok(transport)
}

impl Inner {
    async fn initialize(&self) -> Result<IntrospectionClient, InitializationError> {
        let endpoint = match &self.endpoint_source {
            EndpointSource::Explicit(endpoint) => oidc::parse_endpoint(endpoint)?,
            EndpointSource::Discover {
                authority,
                transport,
            } => {
                oidc::fetch_introspection_endpoint(
                    &**transport,
                    authority,
                    self.options.discovery_timeout,
                )
                .await?
            }
        };

        tracing::info!(introspection.endpoint = %endpoint, "introspection client initialized");

        Ok(
            IntrospectionClient::new(endpoint, self.introspection_transport.clone())
                .with_timeout(self.options.discovery_timeout),
        )
    }
}
