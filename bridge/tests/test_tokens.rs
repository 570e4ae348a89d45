//! Credential lifecycle integration tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use domobridge::authn::token_mngr::{TokenManager, TokenManagerExt};
use domobridge::errors::BridgeError;
use domobridge::storage::memory::MemoryTokenStore;
use domobridge::storage::store::TokenStore;

use common::{test_now, token, FakeAuthApi, FixedClock};

fn manager(auth: Arc<FakeAuthApi>, store: Arc<MemoryTokenStore>) -> Arc<TokenManager> {
    Arc::new(TokenManager::new(
        store,
        auth,
        Arc::new(FixedClock(test_now())),
    ))
}

#[tokio::test]
async fn test_valid_token_is_returned_without_refresh() {
    let auth = Arc::new(FakeAuthApi::new());
    let store = Arc::new(MemoryTokenStore::new());
    store.put(&token(false)).await.unwrap();

    let mngr = manager(auth.clone(), store);
    let fetched = mngr.get_valid_token("user-1").await.unwrap();

    assert_eq!(fetched.access_token, "access-0");
    assert_eq!(auth.refresh_calls(), 0);
}

#[tokio::test]
async fn test_expired_token_is_rotated_in_place() {
    let auth = Arc::new(FakeAuthApi::new());
    let store = Arc::new(MemoryTokenStore::new());
    store.put(&token(true)).await.unwrap();

    let mngr = manager(auth.clone(), store.clone());
    let fetched = mngr.get_valid_token("user-1").await.unwrap();

    assert_eq!(auth.refresh_calls(), 1);
    assert_eq!(fetched.access_token, "access-1");

    // rotated under the same key, both tokens replaced
    let stored = store.get("user-1").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token, "refresh-1");
    assert!(stored.is_valid_at(test_now()));
}

#[tokio::test]
async fn test_missing_token_fails_auth_expired() {
    let auth = Arc::new(FakeAuthApi::new());
    let store = Arc::new(MemoryTokenStore::new());

    let mngr = manager(auth, store);
    let result = mngr.get_valid_token("user-1").await;

    assert!(matches!(result, Err(BridgeError::AuthExpired(_))));
}

#[tokio::test]
async fn test_rejected_refresh_surfaces_auth_expired() {
    let auth = Arc::new(FakeAuthApi::failing());
    let store = Arc::new(MemoryTokenStore::new());
    store.put(&token(true)).await.unwrap();

    let mngr = manager(auth, store.clone());
    let result = mngr.get_valid_token("user-1").await;

    assert!(matches!(result, Err(BridgeError::AuthExpired(_))));

    // the stored token is left untouched for a later retry
    let stored = store.get("user-1").await.unwrap().unwrap();
    assert_eq!(stored.refresh_token, "refresh-0");
}

#[tokio::test]
async fn test_concurrent_callers_share_a_single_refresh() {
    let auth = Arc::new(FakeAuthApi::with_refresh_delay(Duration::from_millis(50)));
    let store = Arc::new(MemoryTokenStore::new());
    store.put(&token(true)).await.unwrap();

    let mngr = manager(auth.clone(), store);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let mngr = mngr.clone();
        handles.push(tokio::spawn(async move {
            mngr.get_valid_token("user-1").await
        }));
    }

    let mut access_tokens = Vec::new();
    for handle in handles {
        let fetched = handle.await.unwrap().unwrap();
        access_tokens.push(fetched.access_token);
    }

    // exactly one refresh grant; every caller sees the same rotated token
    assert_eq!(auth.refresh_calls(), 1);
    assert!(access_tokens.iter().all(|t| t == "access-1"));
}
