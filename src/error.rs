use thiserror::Error;

/// Failures while turning a bearer token into an owner id. All of these
/// surface to the client as 401; the variant only decides the message and
/// what gets logged.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no authentication token provided")]
    MissingHeader,

    #[error("malformed authorization header")]
    MalformedHeader,

    #[error("token header has no key id")]
    MissingKeyId,

    #[error("unknown signing key: {0}")]
    UnknownKeyId(String),

    #[error("invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("failed to fetch signing keys: {0}")]
    Jwks(#[from] reqwest::Error),
}
