//! Shared fakes for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;

use domobridge::alexa::capability::CapabilityName;
use domobridge::alexa::envelope::{
    Directive, DirectiveEnvelope, EndpointRef, Header, ResponseEnvelope,
};
use domobridge::authn::token::OAuthToken;
use domobridge::authn::token_mngr::TokenManager;
use domobridge::directive::router::DirectiveRouter;
use domobridge::errors::BridgeError;
use domobridge::events::translator::EventTranslator;
use domobridge::http::auth::{AuthApi, Profile, TokenGrant};
use domobridge::http::gateway::EventGatewayExt;
use domobridge::models::device::{Device, DeviceMode, DeviceTemplate};
use domobridge::shadow::store::MemoryShadowStore;
use domobridge::shadow::synchronizer::{ReportWindows, StateSynchronizer};
use domobridge::storage::memory::{MemoryDeviceStore, MemoryTokenStore};
use domobridge::utils::Clock;

/// A clock pinned to a fixed instant
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The instant every test clock is pinned to
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Fake authorization server: counts refresh grants and mints numbered tokens
pub struct FakeAuthApi {
    refresh_calls: AtomicUsize,
    fail_refresh: bool,
    refresh_delay: Duration,
}

impl FakeAuthApi {
    pub fn new() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            fail_refresh: false,
            refresh_delay: Duration::from_millis(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_refresh: true,
            ..Self::new()
        }
    }

    /// Slow refreshes widen the race window for single-flight tests
    pub fn with_refresh_delay(delay: Duration) -> Self {
        Self {
            refresh_delay: delay,
            ..Self::new()
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, BridgeError> {
        Ok(TokenGrant {
            access_token: format!("access-for-{}", code),
            refresh_token: format!("refresh-for-{}", code),
            expires_in: 3600,
            token_type: "bearer".to_string(),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, BridgeError> {
        tokio::time::sleep(self.refresh_delay).await;
        if self.fail_refresh {
            return Err(BridgeError::AuthExpired("grant rejected".to_string()));
        }
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenGrant {
            access_token: format!("access-{}", call),
            refresh_token: format!("refresh-{}", call),
            expires_in: 3600,
            token_type: "bearer".to_string(),
        })
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<Profile, BridgeError> {
        Ok(Profile {
            user_id: "user-1".to_string(),
            name: None,
            email: None,
        })
    }
}

/// Fake event gateway capturing every posted report
#[derive(Default)]
pub struct CapturingGateway {
    reports: Mutex<Vec<(String, ResponseEnvelope)>>,
}

impl CapturingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reports(&self) -> Vec<(String, ResponseEnvelope)> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl EventGatewayExt for CapturingGateway {
    async fn post_report(
        &self,
        access_token: &str,
        report: &ResponseEnvelope,
    ) -> Result<(), BridgeError> {
        self.reports
            .lock()
            .await
            .push((access_token.to_string(), report.clone()));
        Ok(())
    }
}

/// A device with the given capabilities, owned by user-1
pub fn device(id: &str, template: DeviceTemplate, capabilities: &[&str]) -> Device {
    Device {
        id: id.to_string(),
        owner_user_id: "user-1".to_string(),
        template,
        display_name: format!("device_{}", id),
        capabilities: capabilities
            .iter()
            .map(|raw| CapabilityName::parse(raw))
            .collect(),
        modes: Vec::new(),
        updated_at: test_now(),
    }
}

/// A device with one mode instance
pub fn device_with_mode(id: &str, mode_name: &str, values: &[&str]) -> Device {
    let mut result = device(id, DeviceTemplate::Switch, &["power"]);
    result
        .capabilities
        .insert(CapabilityName::Mode(mode_name.to_string()));
    result.modes = vec![DeviceMode {
        name: mode_name.to_string(),
        values: values.iter().map(|v| v.to_string()).collect(),
    }];
    result
}

/// A token for user-1, expired or valid relative to [`test_now`]
pub fn token(expired: bool) -> OAuthToken {
    OAuthToken {
        user_id: "user-1".to_string(),
        access_token: "access-0".to_string(),
        refresh_token: "refresh-0".to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        created_at: if expired {
            test_now() - chrono::Duration::seconds(7200)
        } else {
            test_now()
        },
        code: None,
    }
}

/// The full translation stack over in-memory fakes
pub struct Harness {
    pub devices: Arc<MemoryDeviceStore>,
    pub tokens: Arc<MemoryTokenStore>,
    pub shadow: Arc<MemoryShadowStore>,
    pub gateway: Arc<CapturingGateway>,
    pub auth: Arc<FakeAuthApi>,
    pub translator: Arc<EventTranslator>,
    pub router: Arc<DirectiveRouter>,
}

pub fn harness() -> Harness {
    harness_with_auth(Arc::new(FakeAuthApi::new()))
}

pub fn harness_with_auth(auth: Arc<FakeAuthApi>) -> Harness {
    let clock = Arc::new(FixedClock(test_now()));
    let devices = Arc::new(MemoryDeviceStore::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let shadow = Arc::new(MemoryShadowStore::new());
    let gateway = Arc::new(CapturingGateway::new());

    let synchronizer = Arc::new(StateSynchronizer::new(
        shadow.clone(),
        clock.clone(),
        ReportWindows::default(),
    ));
    let token_mngr = Arc::new(TokenManager::new(
        tokens.clone(),
        auth.clone(),
        clock.clone(),
    ));
    let translator = Arc::new(EventTranslator::new(
        devices.clone(),
        synchronizer.clone(),
        token_mngr,
        gateway.clone(),
        clock.clone(),
    ));
    let router = Arc::new(DirectiveRouter::new(
        devices.clone(),
        tokens.clone(),
        synchronizer,
        translator.clone(),
        auth.clone(),
        clock,
    ));

    Harness {
        devices,
        tokens,
        shadow,
        gateway,
        auth,
        translator,
        router,
    }
}

/// Build a directive envelope addressed at an endpoint
pub fn directive(
    namespace: &str,
    name: &str,
    endpoint_id: Option<&str>,
    payload: serde_json::Value,
) -> DirectiveEnvelope {
    DirectiveEnvelope {
        directive: Directive {
            header: Header {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message_id: "message-1".to_string(),
                payload_version: "3".to_string(),
                correlation_token: Some("corr-1".to_string()),
                instance: None,
            },
            endpoint: endpoint_id.map(EndpointRef::new),
            payload,
        },
    }
}
