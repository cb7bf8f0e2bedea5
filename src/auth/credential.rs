// auth/credential.rs - Authorization header classification
//
// Purely syntactic: no token is decoded or verified here.

/// Credential scheme presented by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    NoCredential,
    /// `Bearer <token>`, an application-issued HS256 token.
    CustomToken(String),
    /// `<idp scheme> <token>`, an identity-provider RS256 token.
    IdentityProviderToken(String),
}

const BEARER_PREFIX: &str = "Bearer ";

/// Classify a raw `Authorization` header value.
///
/// Prefixes are matched case-sensitively. A recognised prefix followed by an
/// empty token classifies as `NoCredential`.
pub fn classify(header: Option<&str>, idp_scheme: &str) -> Credential {
    let Some(value) = header else {
        return Credential::NoCredential;
    };

    if let Some(token) = value.strip_prefix(BEARER_PREFIX) {
        return non_empty(token).map_or(Credential::NoCredential, Credential::CustomToken);
    }

    if !idp_scheme.is_empty() {
        if let Some(token) = value
            .strip_prefix(idp_scheme)
            .and_then(|rest| rest.strip_prefix(' '))
        {
            return non_empty(token)
                .map_or(Credential::NoCredential, Credential::IdentityProviderToken);
        }
    }

    Credential::NoCredential
}

fn non_empty(token: &str) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
