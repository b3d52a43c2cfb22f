//! Strategies for retrieving the access token from an inbound request

use std::borrow::Cow;

use http::{header, request::Parts};

/// Retrieves the access token presented with a request
///
/// Any `Fn(&Parts) -> Option<String>` closure can be used as a retriever.
pub trait TokenRetriever: Send + Sync {
    /// Retrieves the token, or `None` if the request doesn't carry one
    fn retrieve(&self, request: &Parts) -> Option<String>;
}

impl<F> TokenRetriever for F
where
    F: Fn(&Parts) -> Option<String> + Send + Sync,
{
    #[inline]
    fn retrieve(&self, request: &Parts) -> Option<String> {
        self(request)
    }
}

/// Retrieves the token from the `Authorization` header
///
/// The header must use the expected scheme, `Bearer` by default. Schemes
/// are compared case-insensitively.
#[derive(Clone, Debug)]
pub struct FromAuthorizationHeader {
    scheme: Cow<'static, str>,
}

impl FromAuthorizationHeader {
    /// Expects the `Bearer` authorization scheme
    #[inline]
    pub const fn new() -> Self {
        Self {
            scheme: Cow::Borrowed("Bearer"),
        }
    }

    /// Expects a custom authorization scheme
    #[inline]
    pub fn with_scheme(scheme: impl Into<Cow<'static, str>>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }
}

impl Default for FromAuthorizationHeader {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRetriever for FromAuthorizationHeader {
    fn retrieve(&self, request: &Parts) -> Option<String> {
        let authorization = request
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())?;

        let (scheme, token) = authorization.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case(&self.scheme) {
            return None;
        }

        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_owned())
        }
    }
}

/// Retrieves the token from a query string parameter
///
/// The parameter is `access_token` by default, as described in
/// [RFC 6750 §2.3](https://datatracker.ietf.org/doc/html/rfc6750#section-2.3).
#[derive(Clone, Debug)]
pub struct FromQueryString {
    name: Cow<'static, str>,
}

impl FromQueryString {
    /// Reads the `access_token` query parameter
    #[inline]
    pub const fn new() -> Self {
        Self {
            name: Cow::Borrowed("access_token"),
        }
    }

    /// Reads a custom query parameter
    #[inline]
    pub fn with_name(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for FromQueryString {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRetriever for FromQueryString {
    fn retrieve(&self, request: &Parts) -> Option<String> {
        let query = request.uri.query()?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;

        pairs
            .into_iter()
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use http::Request;

    use super::*;

    fn parts(request: http::request::Builder) -> Parts {
        request.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_is_read_from_the_authorization_header() {
        let request = parts(Request::builder().header("authorization", "Bearer abc123"));

        assert_eq!(
            FromAuthorizationHeader::new().retrieve(&request).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let request = parts(Request::builder().header("authorization", "bEaReR abc123"));

        assert_eq!(
            FromAuthorizationHeader::new().retrieve(&request).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn other_schemes_are_ignored() {
        let request = parts(Request::builder().header("authorization", "Basic dXNlcjpwYXNz"));

        assert_eq!(FromAuthorizationHeader::new().retrieve(&request), None);
    }

    #[test]
    fn scheme_without_token_yields_none() {
        let request = parts(Request::builder().header("authorization", "Bearer "));

        assert_eq!(FromAuthorizationHeader::new().retrieve(&request), None);

        let request = parts(Request::builder().header("authorization", "Bearer"));

        assert_eq!(FromAuthorizationHeader::new().retrieve(&request), None);
    }

    #[test]
    fn missing_header_yields_none() {
        let request = parts(Request::builder());

        assert_eq!(FromAuthorizationHeader::new().retrieve(&request), None);
    }

    #[test]
    fn custom_scheme_is_respected() {
        let request = parts(Request::builder().header("authorization", "DPoP abc123"));

        assert_eq!(
            FromAuthorizationHeader::with_scheme("DPoP")
                .retrieve(&request)
                .as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn token_is_read_from_the_query_string() {
        let request = parts(Request::builder().uri("/resource?x=1&access_token=abc%20123"));

        assert_eq!(
            FromQueryString::new().retrieve(&request).as_deref(),
            Some("abc 123")
        );
    }

    #[test]
    fn missing_query_parameter_yields_none() {
        let request = parts(Request::builder().uri("/resource?x=1"));

        assert_eq!(FromQueryString::new().retrieve(&request), None);
        assert_eq!(
            FromQueryString::with_name("token").retrieve(&parts(Request::builder().uri("/"))),
            None
        );
    }

    #[test]
    fn closures_are_retrievers() {
        let retriever = |parts: &Parts| {
            parts
                .headers
                .get("x-api-token")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let request = parts(Request::builder().header("x-api-token", "opaque"));

        assert_eq!(retriever.retrieve(&request).as_deref(), Some("opaque"));
    }
}
