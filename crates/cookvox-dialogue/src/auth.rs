//! Short-lived credentials for the dialogue backend.
//!
//! Token issuance lives with an external service; the session only knows
//! `token() -> AuthToken | error`.

use async_trait::async_trait;

use cookvox_foundation::DialogueError;

/// Opaque bearer credential. Debug output is redacted so tokens never land
/// in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<AuthToken, DialogueError>;
}

/// Fixed token, for tests and demos.
pub struct StaticTokenProvider {
    token: AuthToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AuthToken::new(token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<AuthToken, DialogueError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_token() {
        let token = AuthToken::new("very-secret");
        assert_eq!(format!("{:?}", token), "AuthToken(***)");
        assert_eq!(token.expose(), "very-secret");
    }
}
