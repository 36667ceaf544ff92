/// Failure talking to an external identity endpoint.
///
/// Messages carry the endpoint and status only, never credentials or
/// response bodies.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("client secret is not configured")]
    MissingClientSecret,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Bearer token rejected.
///
/// Display strings are generic and never include token bytes or claim values.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid token: missing key id")]
    MissingKeyId,

    #[error("Invalid token: unknown signing key")]
    UnknownKey,

    #[error("Invalid token: signature")]
    InvalidSignature,

    #[error("Invalid token: algorithm not allowed")]
    DisallowedAlgorithm,

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Invalid token: issuer")]
    InvalidIssuer,

    #[error("Invalid token: audience")]
    InvalidAudience,

    #[error("Invalid token: missing claim {0}")]
    MissingClaim(String),

    #[error("Invalid token")]
    Malformed,

    #[error("Signing keys unavailable")]
    KeySetUnavailable(#[source] TransportError),
}

impl ValidationError {
    /// Stable reason code for logs and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingKeyId => "missing_kid",
            Self::UnknownKey => "unknown_kid",
            Self::InvalidSignature => "invalid_signature",
            Self::DisallowedAlgorithm => "disallowed_algorithm",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::MissingClaim(_) => "missing_claim",
            Self::Malformed => "malformed",
            Self::KeySetUnavailable(_) => "key_set_unavailable",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
                Self::DisallowedAlgorithm
            }
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::Malformed,
        }
    }
}
