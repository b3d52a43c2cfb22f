//! Authorizers for working with `tower_http` and other constructs in the
//! ecosystem, including `axum`.
//!
//! Each request passes through an [`Introspector`](veridic_oauth2::Introspector).
//! When the token is active, the resulting
//! [`ClaimsIdentity`](veridic_oauth2::ClaimsIdentity) is made available
//! through [`Request::extensions`](http::Request::extensions). Otherwise the
//! request is answered with a `401 Unauthorized` challenge.
//!
//! See the `examples` folder in the repository for a working example using
//! an `axum` web server.
//!
//! ```no_run
//! use axum::{routing::get, Extension, Router};
//! use veridic_oauth2::{ClaimsIdentity, ClientId, ClientSecret, IntrospectionOptions, Introspector};
//! use veridic_tower::IntrospectionAuthorizer;
//!
//! async fn whoami(Extension(identity): Extension<ClaimsIdentity>) -> String {
//!     format!("hello, {}", identity.name().unwrap_or("anonymous"))
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = IntrospectionOptions::default()
//!     .with_authority("https://issuer.example")
//!     .with_client_credentials(ClientId::from_static("api1"), ClientSecret::from_static("secret"));
//!
//! let authorizer = IntrospectionAuthorizer::new(Introspector::new(options).await?)
//!     .with_terse_error_handler::<axum::body::Body>();
//!
//! let app: Router = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(authorizer.layer());
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use std::{fmt, marker::PhantomData};

mod authorizer;
pub mod util;

pub use crate::authorizer::*;

/// Terse responder for authentication failures
///
/// Failures produce a `401 Unauthorized` response with an empty body and a
/// bare `invalid_token` challenge.
pub struct TerseErrorHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> TerseErrorHandler<ResBody> {
    /// Instantiates a new instance over a given body type
    #[inline]
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> fmt::Debug for TerseErrorHandler<ResBody> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("TerseErrorHandler")
    }
}

impl<ResBody> Default for TerseErrorHandler<ResBody> {
    #[inline]
    fn default() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> Clone for TerseErrorHandler<ResBody> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<ResBody> Copy for TerseErrorHandler<ResBody> {}

/// Verbose responder for authentication failures
///
/// Failures produce a `401 Unauthorized` response with an empty body and a
/// challenge whose `error_description` carries the failure reason.
pub struct VerboseErrorHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> VerboseErrorHandler<ResBody> {
    /// Instantiates a new instance over a given body type
    #[inline]
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> fmt::Debug for VerboseErrorHandler<ResBody> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("VerboseErrorHandler")
    }
}

impl<ResBody> Default for VerboseErrorHandler<ResBody> {
    #[inline]
    fn default() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> Clone for VerboseErrorHandler<ResBody> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<ResBody> Copy for VerboseErrorHandler<ResBody> {}
