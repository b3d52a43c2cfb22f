use thiserror::Error;

use crate::ClaimsIdentity;

/// The outcome of authenticating a single request
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum AuthenticateResult {
    /// The token was active; the identity carries its claims
    Success(ClaimsIdentity),
    /// The request could not be authenticated
    Failure(AuthenticationFailure),
}

impl AuthenticateResult {
    /// Whether authentication succeeded
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The authenticated identity, if any
    #[inline]
    pub fn identity(&self) -> Option<&ClaimsIdentity> {
        match self {
            Self::Success(identity) => Some(identity),
            Self::Failure(_) => None,
        }
    }

    /// Consumes the result, returning the authenticated identity, if any
    #[inline]
    pub fn into_identity(self) -> Option<ClaimsIdentity> {
        match self {
            Self::Success(identity) => Some(identity),
            Self::Failure(_) => None,
        }
    }

    /// The reason authentication failed, if it did
    #[inline]
    pub fn failure(&self) -> Option<&AuthenticationFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

impl From<Result<ClaimsIdentity, AuthenticationFailure>> for AuthenticateResult {
    fn from(result: Result<ClaimsIdentity, AuthenticationFailure>) -> Self {
        match result {
            Ok(identity) => Self::Success(identity),
            Err(failure) => Self::Failure(failure),
        }
    }
}

/// Reasons a request was not authenticated
///
/// These are expected outcomes, reported to the host so it can issue a
/// challenge. The `Display` implementation produces the failure reason.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthenticationFailure {
    /// No token could be retrieved from the request
    #[error("No bearer token.")]
    NoBearerToken,
    /// The token contains a `.` and dotted tokens are left to other handlers
    #[error("Token contains a dot. Skipping.")]
    TokenContainsDot,
    /// The introspection exchange failed
    #[error("Error returned from introspection: {0}")]
    IntrospectionError(String),
    /// The authorization server reports the token as inactive
    #[error("invalid token.")]
    InvalidToken,
}

impl AuthenticationFailure {
    /// The human-readable failure reason
    #[inline]
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
