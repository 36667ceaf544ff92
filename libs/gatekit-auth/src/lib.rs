#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

// Core modules
pub mod config;
pub mod errors;
pub mod http;
pub mod traits;

// JWT / JWKS
pub mod jwks;
pub mod standard_claims;
pub mod validator;

// Role fallback (client credentials + membership lookup)
pub mod credentials;
pub mod fallback;

pub use config::{AuthConfig, AuthConfigError};
pub use errors::{TransportError, ValidationError};
pub use traits::{JwksSource, KeyProvider, RoleLookup, TokenValidator};

pub use jwks::{HttpJwksSource, JwksCache};
pub use standard_claims::{StandardClaim, extract_identity};
pub use validator::JwtValidator;

pub use credentials::{ServiceCredential, ServiceCredentialCache};
pub use fallback::GraphRoleResolver;

pub use secrecy::SecretString;
