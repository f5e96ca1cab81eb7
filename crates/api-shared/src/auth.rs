//! Caller identity.
//!
//! Bearer tokens are not verified yet. The caller is identified by a placeholder derived from
//! the token so that audit records carry a stable user id per token.

/// User id attributed to requests without credentials.
pub const DEV_USER_ID: &str = "dev_user_001";

const TOKEN_PREFIX_CHARS: usize = 8;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid authentication credentials")]
    InvalidCredentials,
    #[error("Missing API key")]
    MissingApiKey,
    #[error("Invalid API key")]
    InvalidApiKey,
}

/// Resolves the user id for a request from its bearer token.
///
/// # Arguments
/// * `bearer` - Token from the `Authorization: Bearer` header, if the header was sent.
///
/// # Returns
/// - [`DEV_USER_ID`] when no token was sent.
/// - `user_<first 8 characters>` for tokens of 8 characters or more.
/// - `unknown_user` for shorter tokens.
///
/// # Errors
/// Returns `AuthError::InvalidCredentials` for an empty token.
pub fn resolve_user(bearer: Option<&str>) -> Result<String, AuthError> {
    let Some(token) = bearer else {
        return Ok(DEV_USER_ID.to_string());
    };
    if token.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }
    if token.chars().count() >= TOKEN_PREFIX_CHARS {
        let prefix: String = token.chars().take(TOKEN_PREFIX_CHARS).collect();
        Ok(format!("user_{}", prefix))
    } else {
        Ok("unknown_user".to_string())
    }
}

/// Validates the provided API key against the configured one.
///
/// When no key is configured every request is accepted.
pub fn validate_api_key(provided: Option<&str>, expected: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match provided {
        None => Err(AuthError::MissingApiKey),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::InvalidApiKey),
    }
}
