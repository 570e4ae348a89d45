//! Token manager for assistant credentials
//!
//! Loads a user's OAuth token from the store and rotates it with a
//! refresh-token grant when expired. Refresh tokens are single-use, so
//! refresh is single-flight per user: concurrent callers serialize on a
//! per-user lock, and whoever arrives second re-reads the store and reuses
//! the freshly persisted token instead of burning the refresh token again.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::authn::token::OAuthToken;
use crate::errors::BridgeError;
use crate::http::auth::AuthApi;
use crate::storage::store::TokenStore;
use crate::utils::Clock;

/// Token manager trait for testability
#[async_trait]
pub trait TokenManagerExt: Send + Sync {
    /// Get a currently valid token for the user, refreshing if needed.
    ///
    /// Fails with `AuthExpired` when no credential exists or the refresh
    /// grant is rejected; callers must not send reports without a token
    /// obtained through this method.
    async fn get_valid_token(&self, user_id: &str) -> Result<OAuthToken, BridgeError>;
}

/// Token manager implementation
pub struct TokenManager {
    token_store: Arc<dyn TokenStore>,
    auth_client: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(
        token_store: Arc<dyn TokenStore>,
        auth_client: Arc<dyn AuthApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            token_store,
            auth_client,
            clock,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn load_token(&self, user_id: &str) -> Result<OAuthToken, BridgeError> {
        self.token_store.get(user_id).await?.ok_or_else(|| {
            BridgeError::AuthExpired(format!("no credentials stored for user {}", user_id))
        })
    }

    async fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn refresh(&self, expired: OAuthToken) -> Result<OAuthToken, BridgeError> {
        info!("Refreshing credential for user {}", expired.user_id);

        let grant = self.auth_client.refresh(&expired.refresh_token).await?;

        // rotate in place: same key, both tokens replaced
        let rotated = OAuthToken {
            user_id: expired.user_id,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_type: grant.token_type,
            expires_in: grant.expires_in,
            created_at: self.clock.now(),
            code: expired.code,
        };
        self.token_store.put(&rotated).await?;

        info!(
            "Credential refreshed for user {}, expires at {}",
            rotated.user_id,
            rotated.expires_at()
        );

        Ok(rotated)
    }
}

#[async_trait]
impl TokenManagerExt for TokenManager {
    async fn get_valid_token(&self, user_id: &str) -> Result<OAuthToken, BridgeError> {
        let token = self.load_token(user_id).await?;
        if token.is_valid_at(self.clock.now()) {
            return Ok(token);
        }

        // at most one refresh grant in flight per user
        let lock = self.lock_for(user_id).await;
        let _guard = lock.lock().await;

        // a concurrent caller may have rotated the token while we waited
        let token = self.load_token(user_id).await?;
        if token.is_valid_at(self.clock.now()) {
            debug!("Credential for user {} already refreshed by a concurrent caller", user_id);
            return Ok(token);
        }

        match self.refresh(token).await {
            Ok(rotated) => Ok(rotated),
            Err(err) => {
                warn!("Credential refresh failed for user {}: {}", user_id, err);
                Err(BridgeError::AuthExpired(err.to_string()))
            }
        }
    }
}
