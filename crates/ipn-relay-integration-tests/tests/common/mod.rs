//! Common test utilities for ipn-relay integration tests
//!
//! This module provides:
//! - An in-memory activity log
//! - Routers wired to a real provider client pointed at a mock server
//! - Builders for signed notifications

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ipn_relay_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use ipn_relay_core::adapters::{BrevoClient, BrevoClientConfig};
use ipn_relay_core::{
    sign, ActivityLevel, ActivityLog, InboundMessage, IpnPipeline, IpnSettings, ListMapping,
    SecretValue, SignatureOptions, StaticSettings,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::MockServer;

pub const SIGNING_SECRET: &str = "integration-secret";
pub const API_KEY: &str = "xkeysib-integration";
pub const CONTACTS_PATH: &str = "/v3/contacts";

// ============================================================================
// Activity log
// ============================================================================

/// Activity log keeping entries in memory
#[derive(Default)]
pub struct MemoryActivityLog {
    entries: Mutex<Vec<(ActivityLevel, String)>>,
}

impl MemoryActivityLog {
    pub fn entries(&self) -> Vec<(ActivityLevel, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, level: ActivityLevel, fragment: &str) -> bool {
        self.entries()
            .iter()
            .any(|(l, message)| *l == level && message.contains(fragment))
    }

    pub fn text(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(_, message)| message)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn log(&self, message: &str, level: ActivityLevel) {
        self.entries
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

// ============================================================================
// Application builders
// ============================================================================

/// Settings mapping product `42` to list `7`, newsletter disabled
pub fn default_settings() -> IpnSettings {
    IpnSettings {
        signing_secret: Some(SecretValue::from(SIGNING_SECRET)),
        provider_api_key: Some(SecretValue::from(API_KEY)),
        lists: ListMapping::default().with_product("42", 7),
        ..IpnSettings::default()
    }
}

/// Router and activity log of one test application
pub struct TestApp {
    pub router: Router,
    pub activity: Arc<MemoryActivityLog>,
}

/// Build an application whose provider client talks to `provider`.
pub fn create_test_app(provider: &MockServer, settings: IpnSettings) -> TestApp {
    create_test_app_with_config(provider, settings, ServiceConfig::default())
}

pub fn create_test_app_with_config(
    provider: &MockServer,
    settings: IpnSettings,
    config: ServiceConfig,
) -> TestApp {
    let activity = Arc::new(MemoryActivityLog::default());
    let router = create_router_with_activity(provider, settings, config, activity.clone());
    TestApp { router, activity }
}

pub fn create_router_with_activity(
    provider: &MockServer,
    settings: IpnSettings,
    config: ServiceConfig,
    activity: Arc<dyn ActivityLog>,
) -> Router {
    let client = BrevoClient::new(
        BrevoClientConfig::default().with_base_url(format!("{}/v3/", provider.uri())),
    )
    .unwrap();

    let pipeline = IpnPipeline::new(
        Arc::new(StaticSettings::new(settings)),
        Arc::new(client),
        activity,
        config.webhook.signature,
    );

    create_router(AppState::new(
        config,
        Arc::new(pipeline),
        ServiceMetrics::new().unwrap(),
    ))
}

// ============================================================================
// Requests
// ============================================================================

/// Fields plus a valid `sha_sign` for [`SIGNING_SECRET`]
pub fn signed_fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    let message = InboundMessage::from_pairs(pairs.iter().copied());
    let signature = sign(&message, SIGNING_SECRET, SignatureOptions::default());

    let mut fields: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    fields.push(("sha_sign".to_string(), signature.as_str().to_string()));
    fields
}

/// Form-encoded body with a valid signature
pub fn signed_form(pairs: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(signed_fields(pairs)).unwrap()
}

pub fn form_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send `request` and collect status and body text.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
