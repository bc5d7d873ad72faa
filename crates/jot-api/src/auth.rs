use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use jot_db::Database;
use jot_push::notifier::Notifier;
use jot_push::registry::Registry;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub registry: Registry,
    pub notifier: Notifier,
    pub verifier: Verifier,
    pub stream_ttl: Duration,
}

/// A verified user identity, as reported by the identity provider.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

/// Shape of the provider's tokeninfo response. `sub` is the stable
/// user id; everything else is ignored.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: String,
    email: Option<String>,
}

/// Delegates credential verification to the external identity provider
/// (Google's OAuth2 tokeninfo endpoint in production). The URL is
/// injected so tests can point it at an in-process stub.
#[derive(Clone)]
pub struct Verifier {
    tokeninfo_url: String,
    client: reqwest::Client,
}

impl Verifier {
    pub fn new(tokeninfo_url: String) -> Self {
        Self {
            tokeninfo_url,
            client: reqwest::Client::new(),
        }
    }

    /// Exchange a bearer access token for a verified identity. Any
    /// provider-side rejection or transport failure is an auth error;
    /// nothing about the provider's response is trusted beyond `sub`.
    pub async fn verify(&self, token: &str) -> Result<Identity, ApiError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(|e| {
                debug!("tokeninfo request failed: {e}");
                ApiError::Auth("Invalid access token".into())
            })?;

        if !response.status().is_success() {
            return Err(ApiError::Auth("Invalid access token".into()));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|_| ApiError::Auth("Invalid access token".into()))?;

        Ok(Identity {
            user_id: info.sub,
            email: info.email,
        })
    }
}
