//! Event translator integration tests

mod common;

use serde_json::json;

use domobridge::alexa::capability::CapabilityName;
use domobridge::errors::BridgeError;
use domobridge::models::device::DeviceTemplate;
use domobridge::models::event::DeviceEvent;
use domobridge::storage::store::{DeviceStore, TokenStore};

use common::{device, harness, token};

fn parse_event(raw: serde_json::Value) -> DeviceEvent {
    serde_json::from_value(raw).unwrap()
}

#[tokio::test]
async fn test_register_persists_device_and_reports_discovery() {
    let h = harness();
    h.tokens.put(&token(false)).await.unwrap();

    let event = parse_event(json!({
        "event": "register_device",
        "device_id": "lamp-1",
        "device_name": "Luz da sala",
        "user_id": "user-1",
        "properties": { "power": true, "brightness": true, "color": true },
        "buttons": { "power": true },
        "device_template": "light_rgb",
        "topic_events": "domo/device/lamp-1/event"
    }));
    h.translator.handle_event(event).await.unwrap();

    // device persisted with parsed capabilities
    let stored = h.devices.get("lamp-1").await.unwrap().unwrap();
    assert_eq!(stored.display_name, "Luz da sala");
    assert_eq!(stored.capabilities.len(), 3);

    // one discovery report went out with the stored credential
    let reports = h.gateway.reports().await;
    assert_eq!(reports.len(), 1);
    let (access_token, report) = &reports[0];
    assert_eq!(access_token, "access-0");

    let json = serde_json::to_value(report).unwrap();
    assert_eq!(json["event"]["header"]["namespace"], "Alexa.Discovery");
    assert_eq!(json["event"]["header"]["name"], "AddOrUpdateReport");
    let endpoints = json["event"]["payload"]["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0]["endpointId"], "lamp-1");
    assert_eq!(endpoints[0]["friendlyName"], "Luz da sala");
    assert_eq!(endpoints[0]["displayCategories"][0], "LIGHT");
    // health + base interface + power/brightness/color
    assert_eq!(endpoints[0]["capabilities"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_reregistration_merges_capabilities() {
    let h = harness();
    h.tokens.put(&token(false)).await.unwrap();

    h.translator
        .handle_event(parse_event(json!({
            "event": "register_device",
            "device_id": "dev-1",
            "user_id": "user-1",
            "properties": { "power": true },
            "device_template": "switch"
        })))
        .await
        .unwrap();

    h.translator
        .handle_event(parse_event(json!({
            "event": "register_device",
            "device_id": "dev-1",
            "user_id": "user-1",
            "properties": { "brightness": true },
            "device_template": "light_brightness"
        })))
        .await
        .unwrap();

    let stored = h.devices.get("dev-1").await.unwrap().unwrap();
    // capability set grows across registrations
    assert!(stored.capabilities.contains(&CapabilityName::Power));
    assert!(stored.capabilities.contains(&CapabilityName::Brightness));
    assert_eq!(stored.template, DeviceTemplate::LightBrightness);
}

#[tokio::test]
async fn test_lock_interaction_becomes_change_report() {
    let h = harness();
    h.tokens.put(&token(false)).await.unwrap();
    h.devices
        .put(&device("door-1", DeviceTemplate::Smartlock, &["lock"]))
        .await
        .unwrap();

    let event = parse_event(json!({
        "event": "physical_interaction",
        "device_id": "door-1",
        "property": "lock",
        "state": { "lock": "LOCKED" }
    }));
    h.translator.handle_event(event).await.unwrap();

    let reports = h.gateway.reports().await;
    assert_eq!(reports.len(), 1);
    let json = serde_json::to_value(&reports[0].1).unwrap();

    assert_eq!(json["event"]["header"]["namespace"], "Alexa");
    assert_eq!(json["event"]["header"]["name"], "ChangeReport");
    assert_eq!(json["event"]["endpoint"]["endpointId"], "door-1");
    assert_eq!(
        json["event"]["payload"]["change"]["cause"]["type"],
        "PHYSICAL_INTERACTION"
    );

    let changed = json["event"]["payload"]["change"]["properties"]
        .as_array()
        .unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0]["namespace"], "Alexa.LockController");
    assert_eq!(changed[0]["name"], "lockState");
    assert_eq!(changed[0]["value"], "LOCKED");
    assert_eq!(changed[0]["uncertaintyInMilliseconds"], 0);

    // nothing else in the snapshot, so context is empty
    let context = json["context"]["properties"].as_array().unwrap();
    assert!(context.is_empty());
}

#[tokio::test]
async fn test_interaction_snapshot_fills_context_properties() {
    let h = harness();
    h.tokens.put(&token(false)).await.unwrap();
    h.devices
        .put(&device(
            "lamp-1",
            DeviceTemplate::LightBrightness,
            &["power", "brightness"],
        ))
        .await
        .unwrap();

    let event = parse_event(json!({
        "event": "physical_interaction",
        "device_id": "lamp-1",
        "property": "power",
        "state": { "power": "ON", "brightness": 70 }
    }));
    h.translator.handle_event(event).await.unwrap();

    let json = serde_json::to_value(&h.gateway.reports().await[0].1).unwrap();

    let changed = json["event"]["payload"]["change"]["properties"]
        .as_array()
        .unwrap();
    assert_eq!(changed[0]["name"], "powerState");
    assert_eq!(changed[0]["uncertaintyInMilliseconds"], 0);

    let context = json["context"]["properties"].as_array().unwrap();
    assert_eq!(context.len(), 1);
    assert_eq!(context[0]["name"], "brightness");
    assert_eq!(context[0]["value"], 70);
    assert_eq!(context[0]["uncertaintyInMilliseconds"], 6000);
}

#[tokio::test]
async fn test_doorbell_press_payload_carries_only_a_timestamp() {
    let h = harness();
    h.tokens.put(&token(false)).await.unwrap();

    // register then press, as the firmware does on boot
    h.translator
        .handle_event(parse_event(json!({
            "event": "register_device",
            "device_id": "bell-1",
            "user_id": "user-1",
            "properties": {},
            "device_template": "doorbell"
        })))
        .await
        .unwrap();

    h.translator
        .handle_event(parse_event(json!({
            "event": "physical_interaction",
            "device_id": "bell-1",
            "state": {}
        })))
        .await
        .unwrap();

    let reports = h.gateway.reports().await;
    assert_eq!(reports.len(), 2);
    let json = serde_json::to_value(&reports[1].1).unwrap();

    assert_eq!(
        json["event"]["header"]["namespace"],
        "Alexa.DoorbellEventSource"
    );
    assert_eq!(json["event"]["header"]["name"], "DoorbellPress");

    // payload is a timestamp and nothing else; no ChangeReport shape
    let payload = json["event"]["payload"].as_object().unwrap();
    assert_eq!(payload.len(), 1);
    assert!(payload.contains_key("timestamp"));
    assert!(json.get("context").is_none());
}

#[tokio::test]
async fn test_correlated_interaction_answers_state_report() {
    let h = harness();
    h.tokens.put(&token(false)).await.unwrap();
    h.devices
        .put(&device("door-1", DeviceTemplate::Smartlock, &["lock"]))
        .await
        .unwrap();

    let event = parse_event(json!({
        "event": "physical_interaction",
        "device_id": "door-1",
        "property": "lock",
        "state": { "lock": "UNLOCKED" },
        "correlation": "corr-42"
    }));
    h.translator.handle_event(event).await.unwrap();

    let json = serde_json::to_value(&h.gateway.reports().await[0].1).unwrap();
    assert_eq!(json["event"]["header"]["name"], "StateReport");
    assert_eq!(json["event"]["header"]["correlationToken"], "corr-42");
    let properties = json["context"]["properties"].as_array().unwrap();
    assert_eq!(properties[0]["value"], "UNLOCKED");
}

#[tokio::test]
async fn test_expired_credential_is_refreshed_before_reporting() {
    let h = harness();
    h.tokens.put(&token(true)).await.unwrap();
    h.devices
        .put(&device("dev-1", DeviceTemplate::Switch, &["power"]))
        .await
        .unwrap();

    let event = parse_event(json!({
        "event": "physical_interaction",
        "device_id": "dev-1",
        "property": "power",
        "state": { "power": "ON" }
    }));
    h.translator.handle_event(event).await.unwrap();

    assert_eq!(h.auth.refresh_calls(), 1);

    // the report used the rotated credential, never the stale one
    let reports = h.gateway.reports().await;
    assert_eq!(reports[0].0, "access-1");

    let stored = h.tokens.get("user-1").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token, "refresh-1");
}

#[tokio::test]
async fn test_interaction_on_unknown_device_surfaces_error() {
    let h = harness();

    let event = parse_event(json!({
        "event": "physical_interaction",
        "device_id": "ghost",
        "property": "power",
        "state": {}
    }));
    let result = h.translator.handle_event(event).await;

    assert!(matches!(result, Err(BridgeError::NoSuchEndpoint(_))));
    assert!(h.gateway.reports().await.is_empty());
}

#[tokio::test]
async fn test_interaction_without_property_on_non_doorbell_is_invalid() {
    let h = harness();
    h.tokens.put(&token(false)).await.unwrap();
    h.devices
        .put(&device("dev-1", DeviceTemplate::Switch, &["power"]))
        .await
        .unwrap();

    let event = parse_event(json!({
        "event": "physical_interaction",
        "device_id": "dev-1",
        "state": {}
    }));
    let result = h.translator.handle_event(event).await;

    assert!(matches!(result, Err(BridgeError::InvalidValue(_))));
    assert!(h.gateway.reports().await.is_empty());
}
