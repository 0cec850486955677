//! Credential providers.
//!
//! Backends never hold a token themselves; they ask a [`TokenProvider`] right
//! before every request so that long runs survive token expiry.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub type TokenHandle = Arc<dyn TokenProvider + Send + Sync>;

/// Supplies a currently valid bearer token on demand.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token, or [`Auth`](ErrorKind::Auth) when none can be
    /// obtained without user interaction.
    async fn access_token(&self) -> Result<String>;
}

/// A pre-acquired bearer token. Never refreshed.
pub struct StaticToken(String);
impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        if self.0.trim().is_empty() {
            exn::bail!(ErrorKind::Auth("empty access token".to_string()));
        }
        Ok(self.0.clone())
    }
}

#[cfg(feature = "graph")]
pub use self::refresh::RefreshTokenProvider;

#[cfg(feature = "graph")]
mod refresh {
    use super::TokenProvider;
    use crate::error::{ErrorKind, Result};
    use async_trait::async_trait;
    use exn::ResultExt;
    use serde::Deserialize;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    const TOKEN_ENDPOINT: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
    const SCOPE: &str = "Files.ReadWrite.All offline_access";
    /// Refresh this long before the service says the token expires.
    const EXPIRY_MARGIN: Duration = Duration::from_secs(120);

    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
        expires_in: u64,
        refresh_token: Option<String>,
    }

    struct Cached {
        access_token: String,
        expires_at: Instant,
    }

    struct State {
        refresh_token: String,
        cached: Option<Cached>,
    }

    /// Exchanges a refresh token for access tokens at the Microsoft identity
    /// platform, caching each access token until shortly before it expires.
    ///
    /// Rotated refresh tokens returned by the endpoint replace the old one in
    /// memory only; nothing is written to disk. Interactive consent is out of
    /// scope: obtaining the initial refresh token is up to the user.
    pub struct RefreshTokenProvider {
        client: reqwest::Client,
        application_id: String,
        redirect_uri: String,
        state: Mutex<State>,
    }

    impl RefreshTokenProvider {
        pub fn new(
            client: reqwest::Client,
            application_id: impl Into<String>,
            redirect_uri: impl Into<String>,
            refresh_token: impl Into<String>,
        ) -> Self {
            Self {
                client,
                application_id: application_id.into(),
                redirect_uri: redirect_uri.into(),
                state: Mutex::new(State { refresh_token: refresh_token.into(), cached: None }),
            }
        }

        async fn redeem(&self, refresh_token: &str) -> Result<TokenResponse> {
            let form = [
                ("client_id", self.application_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", SCOPE),
            ];
            let response = self
                .client
                .post(TOKEN_ENDPOINT)
                .form(&form)
                .send()
                .await
                .or_raise(|| ErrorKind::Network("token endpoint unreachable".to_string()))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::debug!(%status, body = %body, "Token endpoint rejected refresh token");
                exn::bail!(ErrorKind::Auth(format!("token endpoint returned {status}")));
            }
            response
                .json::<TokenResponse>()
                .await
                .or_raise(|| ErrorKind::InvalidResponse("malformed token response".to_string()))
        }
    }

    #[async_trait]
    impl TokenProvider for RefreshTokenProvider {
        async fn access_token(&self) -> Result<String> {
            let mut state = self.state.lock().await;
            if let Some(cached) = &state.cached
                && Instant::now() < cached.expires_at
            {
                return Ok(cached.access_token.clone());
            }
            let response = self.redeem(&state.refresh_token).await?;
            tracing::debug!(expires_in = response.expires_in, "Redeemed refresh token");
            let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_MARGIN);
            if let Some(rotated) = response.refresh_token {
                state.refresh_token = rotated;
            }
            state.cached = Some(Cached {
                access_token: response.access_token.clone(),
                expires_at: Instant::now() + lifetime,
            });
            Ok(response.access_token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("abc");
        assert_eq!(provider.access_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_static_token_empty() {
        let err = StaticToken::new("  ").access_token().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Auth(_)));
    }
}
