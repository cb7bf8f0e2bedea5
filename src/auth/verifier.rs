use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use super::claims::{Claims, CustomClaims};
use super::jwks::{KeySetError, SigningKeyCache};
use super::secret::{SecretCache, SecretError};

/// Why a presented token was not accepted.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("invalid token signature")]
    BadSignature,

    #[error("unexpected token issuer")]
    InvalidIssuer,

    #[error("unexpected token audience")]
    InvalidAudience,

    #[error("token header has no key id")]
    MissingKeyId,

    #[error(transparent)]
    KeySet(#[from] KeySetError),

    #[error("signing secret unavailable: {0}")]
    Secret(#[from] SecretError),

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::InvalidSignature => VerifyError::BadSignature,
            ErrorKind::InvalidIssuer => VerifyError::InvalidIssuer,
            ErrorKind::InvalidAudience => VerifyError::InvalidAudience,
            _ => VerifyError::Malformed(err.to_string()),
        }
    }
}

/// Identity-provider settings checked on every token.
#[derive(Debug, Clone)]
pub struct IdentityProviderSettings {
    pub issuer: String,
    pub audience: Option<String>,
}

/// Verifies both token schemes and mints custom tokens.
///
/// Every failure is reported; deciding what a failure means for the request
/// is left to the resolver.
pub struct TokenVerifier {
    secrets: SecretCache,
    keys: SigningKeyCache,
    idp: IdentityProviderSettings,
}

impl TokenVerifier {
    pub fn new(secrets: SecretCache, keys: SigningKeyCache, idp: IdentityProviderSettings) -> Self {
        Self { secrets, keys, idp }
    }

    /// Verify an HS256 custom token against the shared signing secret.
    ///
    /// Legacy `{ID, ProjectID}` tokens carry no `exp`; expiry is only
    /// enforced when the claim is present.
    pub async fn verify_custom(&self, token: &str) -> Result<Claims, VerifyError> {
        let secret = self.secrets.signing_secret().await?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Map<String, Value>>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(Claims(data.claims))
    }

    /// Verify an RS256 identity-provider token: signature, issuer and expiry
    pub async fn verify_identity(&self, token: &str) -> Result<Claims, VerifyError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(VerifyError::MissingKeyId)?;
        let key = self.keys.signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.idp.issuer.as_str()]);
        match &self.idp.audience {
            Some(audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Map<String, Value>>(token, &key, &validation)?;
        Ok(Claims(data.claims))
    }

    /// Sign a custom token with the shared secret
    pub async fn issue_custom_token(&self, claims: &CustomClaims) -> Result<String, VerifyError> {
        let secret = self.secrets.signing_secret().await?;
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| VerifyError::Signing(e.to_string()))
    }
}
