//! `gabinete-auth`: identity and authorization decisions.
//!
//! Decoupled from HTTP and storage. Membership and super-admin facts come in
//! through the [`AccessDirectory`] trait; bearer credentials are verified by a
//! [`JwtValidator`].

pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;

pub use authorize::{AccessDirectory, Authorizer, AuthzError, DecisionTrace, LookupError};
pub use claims::{
    Hs256JwtSigner, Hs256JwtValidator, JwtClaims, JwtValidator, TokenSigningError, TokenValidationError,
    validate_claims,
};
pub use principal::Identity;
pub use roles::Role;
