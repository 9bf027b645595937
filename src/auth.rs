use std::collections::HashMap;

use axum::http::{HeaderMap, header};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

use crate::config::Auth;
use crate::error::AuthError;

/// Clock-skew tolerance when validating `exp`/`iat`, in seconds.
const CLOCK_SKEW_SECONDS: u64 = 30;

/// Claims carried by an identity-provider token.
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: u64,
}

/// Verifies bearer tokens against the identity provider's signing keys.
///
/// The JWKS is fetched once at startup; there is no refresh loop and no
/// retry. A rotated signing key requires a process restart.
pub struct TokenVerifier {
    keys: HashMap<String, DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    pub async fn new(cfg: &Auth) -> Result<Self, AuthError> {
        let jwks: JwkSet = reqwest::get(&cfg.jwks_url).await?.json().await?;
        Self::from_jwks(jwks, cfg)
    }

    pub fn from_jwks(jwks: JwkSet, cfg: &Auth) -> Result<Self, AuthError> {
        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => {
                    tracing::warn!(kid = %kid, error = %e, "skipping unusable signing key");
                }
            }
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&cfg.issuer]);
        validation.set_audience(&[&cfg.audience]);
        validation.leeway = CLOCK_SKEW_SECONDS;

        Ok(TokenVerifier { keys, validation })
    }

    /// Validate a token and return the owner id (the `sub` claim).
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self
            .keys
            .get(&kid)
            .ok_or_else(|| AuthError::UnknownKeyId(kid))?;

        let data = decode::<Claims>(token, key, &self.validation)?;
        Ok(data.claims.sub)
    }

    /// Pull the raw token out of the `Authorization` header.
    pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?;
        let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MalformedHeader)
    }
}

#[cfg(test)]
pub(crate) const TEST_KID: &str = "test-key";
#[cfg(test)]
pub(crate) const TEST_SECRET: &[u8] = b"wordvault-test-secret";

#[cfg(test)]
impl TokenVerifier {
    /// HS256 verifier with a fixed key, so tests can mint their own tokens.
    pub(crate) fn for_tests() -> Self {
        let mut keys = HashMap::new();
        keys.insert(TEST_KID.to_string(), DecodingKey::from_secret(TEST_SECRET));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.leeway = 0;

        TokenVerifier { keys, validation }
    }
}

/// Mint a token the [`TokenVerifier::for_tests`] verifier accepts.
#[cfg(test)]
pub(crate) fn test_token(sub: &str) -> String {
    test_token_with_exp(sub, unix_now() + 3600)
}

#[cfg(test)]
pub(crate) fn test_token_with_exp(sub: &str, exp: u64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    #[derive(serde::Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: u64,
        iat: u64,
    }

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());

    encode(
        &header,
        &TestClaims {
            sub,
            exp,
            iat: unix_now(),
        },
        &EncodingKey::from_secret(TEST_SECRET),
    )
    .unwrap()
}

#[cfg(test)]
fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            TokenVerifier::bearer_token(&headers),
            Err(AuthError::MissingHeader)
        ));
    }

    #[test]
    fn bearer_token_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert!(matches!(
            TokenVerifier::bearer_token(&headers),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn bearer_token_extracts_the_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(TokenVerifier::bearer_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn verify_accepts_a_well_formed_token() {
        let verifier = TokenVerifier::for_tests();
        let token = test_token("user-1");
        assert_eq!(verifier.verify(&token).unwrap(), "user-1");
    }

    #[test]
    fn verify_rejects_garbage() {
        let verifier = TokenVerifier::for_tests();
        assert!(matches!(
            verifier.verify("not.a.token"),
            Err(AuthError::Jwt(_))
        ));
    }

    #[test]
    fn verify_rejects_unknown_key_id() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        #[derive(serde::Serialize)]
        struct TestClaims {
            sub: String,
            exp: u64,
        }

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("rotated-away".to_string());
        let token = encode(
            &header,
            &TestClaims {
                sub: "user-1".to_string(),
                exp: unix_now() + 3600,
            },
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        let verifier = TokenVerifier::for_tests();
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::UnknownKeyId(kid)) if kid == "rotated-away"
        ));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let verifier = TokenVerifier::for_tests();
        let token = test_token_with_exp("user-1", unix_now() - 120);
        assert!(matches!(verifier.verify(&token), Err(AuthError::Jwt(_))));
    }
}
