use std::{fmt, future::Future, pin::Pin};

use http::{Request, Response};
use tower_http::auth::{AsyncAuthorizeRequest, AsyncRequireAuthorization, AsyncRequireAuthorizationLayer};
use tower_layer::Layer;
use veridic_oauth2::{AuthenticateResult, AuthenticationFailure, InitializationError, Introspector};

use crate::{
    util::{internal_error, unauthorized},
    TerseErrorHandler, VerboseErrorHandler,
};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Authorizer that authenticates each request by introspecting its token
///
/// On success, the [`ClaimsIdentity`](veridic_oauth2::ClaimsIdentity) is
/// inserted into the request extensions before the request is passed on.
pub struct IntrospectionAuthorizer<OnError> {
    introspector: Introspector,
    on_error: OnError,
}

impl<OnError> Clone for IntrospectionAuthorizer<OnError>
where
    OnError: Clone,
{
    #[inline]
    fn clone(&self) -> Self {
        Self {
            introspector: self.introspector.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<OnError> fmt::Debug for IntrospectionAuthorizer<OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IntrospectionAuthorizer")
            .field("introspector", &self.introspector)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl IntrospectionAuthorizer<()> {
    /// Constructs a new authorizer from an introspector
    ///
    /// An error handler must be attached before the authorizer can be used.
    #[inline]
    pub fn new(introspector: Introspector) -> Self {
        Self {
            introspector,
            on_error: (),
        }
    }

    /// Attaches a custom error handler to generate responses
    /// in the event of an authentication failure
    #[inline]
    pub fn with_error_handler<OnError>(self, on_error: OnError) -> IntrospectionAuthorizer<OnError> {
        IntrospectionAuthorizer {
            introspector: self.introspector,
            on_error,
        }
    }

    /// Attaches the default terse error handler: [`TerseErrorHandler`]
    #[inline]
    pub fn with_terse_error_handler<ResBody: Default>(
        self,
    ) -> IntrospectionAuthorizer<TerseErrorHandler<ResBody>> {
        self.with_error_handler(TerseErrorHandler::new())
    }

    /// Attaches the default verbose error handler: [`VerboseErrorHandler`]
    ///
    /// The failure reason is included in the `www-authenticate` challenge.
    #[inline]
    pub fn with_verbose_error_handler<ResBody: Default>(
        self,
    ) -> IntrospectionAuthorizer<VerboseErrorHandler<ResBody>> {
        self.with_error_handler(VerboseErrorHandler::new())
    }
}

impl<OnError> IntrospectionAuthorizer<OnError> {
    /// The introspector used to authenticate requests
    #[inline]
    pub fn introspector(&self) -> &Introspector {
        &self.introspector
    }
}

impl<OnError> IntrospectionAuthorizer<OnError>
where
    OnError: OnIntrospectionError + Clone,
{
    /// Wraps the authorizer in a layer that rejects unauthenticated requests
    #[inline]
    pub fn layer(&self) -> AsyncRequireAuthorizationLayer<Self> {
        AsyncRequireAuthorizationLayer::new(self.clone())
    }
}

impl<S, OnError> Layer<S> for IntrospectionAuthorizer<OnError>
where
    OnError: OnIntrospectionError + Clone,
{
    type Service = AsyncRequireAuthorization<S, Self>;

    fn layer(&self, inner: S) -> Self::Service {
        AsyncRequireAuthorizationLayer::new(self.clone()).layer(inner)
    }
}

impl<OnError, ReqBody> AsyncAuthorizeRequest<ReqBody> for IntrospectionAuthorizer<OnError>
where
    OnError: OnIntrospectionError + Clone + Send + 'static,
    OnError::Body: Default + Send + 'static,
    ReqBody: Send + 'static,
{
    type RequestBody = ReqBody;
    type ResponseBody = OnError::Body;
    type Future = BoxFuture<Result<Request<ReqBody>, Response<OnError::Body>>>;

    fn authorize(&mut self, request: Request<ReqBody>) -> Self::Future {
        let introspector = self.introspector.clone();
        let on_error = self.on_error.clone();

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();

            match introspector.authenticate(&parts).await {
                Ok(AuthenticateResult::Success(identity)) => {
                    tracing::trace!("request authenticated");
                    parts.extensions.insert(identity);
                    Ok(Request::from_parts(parts, body))
                }
                Ok(AuthenticateResult::Failure(failure)) => {
                    Err(on_error.on_authentication_failure(&failure))
                }
                Err(error) => Err(on_error.on_initialization_error(&error)),
            }
        })
    }
}

/// Handler for responding to failures while authenticating a request
pub trait OnIntrospectionError {
    /// The body type returned on an error
    type Body;

    /// Response when the request could not be authenticated
    fn on_authentication_failure(&self, failure: &AuthenticationFailure) -> Response<Self::Body>;

    /// Response when the introspection client could not be initialized
    fn on_initialization_error(&self, error: &InitializationError) -> Response<Self::Body>;
}

macro_rules! delegate_impls {
    ($($ty:ty)*) => {
        $(
            impl<T> OnIntrospectionError for $ty
            where
                T: OnIntrospectionError,
            {
                type Body = T::Body;

                fn on_authentication_failure(&self, failure: &AuthenticationFailure) -> Response<Self::Body> {
                    T::on_authentication_failure(self, failure)
                }

                fn on_initialization_error(&self, error: &InitializationError) -> Response<Self::Body> {
                    T::on_initialization_error(self, error)
                }
            }
        )*
    }
}

delegate_impls!(
    &'_ T
    Box<T>
    std::rc::Rc<T>
    std::sync::Arc<T>
);

impl<ResBody> OnIntrospectionError for TerseErrorHandler<ResBody>
where
    ResBody: Default,
{
    type Body = ResBody;

    #[inline]
    fn on_authentication_failure(&self, failure: &AuthenticationFailure) -> Response<Self::Body> {
        tracing::debug!("authentication failed: {failure}");
        unauthorized("")
    }

    #[inline]
    fn on_initialization_error(&self, error: &InitializationError) -> Response<Self::Body> {
        let error: &dyn std::error::Error = error;
        tracing::error!(error, "introspection client unavailable");
        internal_error()
    }
}

impl<ResBody> OnIntrospectionError for VerboseErrorHandler<ResBody>
where
    ResBody: Default,
{
    type Body = ResBody;

    #[inline]
    fn on_authentication_failure(&self, failure: &AuthenticationFailure) -> Response<Self::Body> {
        let message = failure.reason();
        tracing::debug!("authentication failed: {message}");
        unauthorized(&message)
    }

    #[inline]
    fn on_initialization_error(&self, error: &InitializationError) -> Response<Self::Body> {
        let error: &dyn std::error::Error = error;
        tracing::error!(error, "introspection client unavailable");
        internal_error()
    }
}
