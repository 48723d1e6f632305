//! Order lifecycle notifications relayed to the passenger

mod common;

use common::*;
use ride_bot::notification::{relay, NotificationOutcome, OrderNotification};
use serde_json::json;
use std::sync::atomic::Ordering;

fn notification(value: serde_json::Value) -> OrderNotification {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_assigned_sends_driver_details() {
    let translator = translator();
    let outbound = RecordingOutbound::new();
    let payload = notification(json!({
        "status": "assigned",
        "id": 812,
        "user": USER,
        "driver_details": {
            "full_name": "Bekzod Aliyev",
            "phone": "+998907654321",
            "rating": 4.9,
            "cars": [{"car_model": "Cobalt", "car_number": "01A123BC"}],
            "from_location": "tashkent",
            "to_location": "qoqon"
        },
        "content_object": {"id": 55, "passenger": 2, "price": "400000"},
        "creator": {"language": "en"}
    }));

    let outcome = relay(&payload, &translator, &outbound).await.unwrap();

    assert_eq!(outcome, NotificationOutcome::Sent("assigned"));
    let sent = outbound.take();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Sent::Message { chat_id, text, keyboard, .. } => {
            assert_eq!(*chat_id, USER);
            assert!(keyboard.is_none());
            for expected in ["812", "Bekzod Aliyev", "Cobalt", "01A123BC", "4.9", "Tashkent", "Qoqon", "400000"] {
                assert!(text.contains(expected), "missing {expected} in {text}");
            }
        }
        other => panic!("expected a message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_assigned_tolerates_missing_driver_fields() {
    let translator = translator();
    let outbound = RecordingOutbound::new();
    let payload = notification(json!({"status": "assigned", "id": 3, "user": USER}));

    relay(&payload, &translator, &outbound).await.unwrap();

    let text = outbound.last_text().unwrap();
    assert!(text.contains('-'));
}

#[tokio::test]
async fn test_arrived_offers_in_car_button() {
    let translator = translator();
    let outbound = RecordingOutbound::new();
    let payload = notification(json!({
        "status": "arrived",
        "id": 812,
        "user": USER,
        "creator": {"language": "ru"}
    }));

    let outcome = relay(&payload, &translator, &outbound).await.unwrap();

    assert_eq!(outcome, NotificationOutcome::Sent("arrived"));
    assert_eq!(outbound.last_text(), Some(translator.t("driver-arrived", "ru")));
    assert_eq!(outbound.last_keyboard().unwrap().callbacks(), vec!["in_car:812"]);
}

#[tokio::test]
async fn test_ended_asks_for_a_rating_on_the_order() {
    let translator = translator();
    let outbound = RecordingOutbound::new();
    let payload = notification(json!({
        "status": "ENDED",
        "id": 812,
        "user": USER,
        "content_object": {"id": 55}
    }));

    let outcome = relay(&payload, &translator, &outbound).await.unwrap();

    assert_eq!(outcome, NotificationOutcome::Sent("ended"));
    // no creator language: falls back to uz
    assert_eq!(outbound.last_text(), Some(translator.t("rate-trip", "uz")));
    assert_eq!(
        outbound.last_keyboard().unwrap().callbacks(),
        vec!["rate:5:812", "rate:4:812", "rate:3:812", "rate:2:812", "rate:1:812"]
    );
}

#[tokio::test]
async fn test_unsupported_language_uses_default() {
    let translator = translator();
    let outbound = RecordingOutbound::new();
    let payload = notification(json!({
        "status": "arrived",
        "id": 1,
        "user": USER,
        "creator": {"language": "de"}
    }));

    relay(&payload, &translator, &outbound).await.unwrap();

    assert_eq!(outbound.last_text(), Some(translator.t("driver-arrived", "en")));
}

#[tokio::test]
async fn test_other_statuses_are_ignored() {
    let translator = translator();
    let outbound = RecordingOutbound::new();
    let payload = notification(json!({"status": "started", "id": 1, "user": USER}));

    let outcome = relay(&payload, &translator, &outbound).await.unwrap();

    assert_eq!(outcome, NotificationOutcome::Ignored);
    assert!(outbound.take().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_is_reported() {
    let translator = translator();
    let outbound = RecordingOutbound::new();
    outbound.fail_sends.store(true, Ordering::SeqCst);
    let payload = notification(json!({"status": "ended", "id": 1, "user": USER}));

    assert!(relay(&payload, &translator, &outbound).await.is_err());
}
