//! Method-call boundary and authorization protocol tests.

use std::sync::Arc;

use anyhow::Result;
use sendlater::{
    AlarmStore, Capability, ERROR_INVALID_ARGUMENTS, Error, ManualClock, MemoryStore, MethodCall,
    MethodOutcome, SmsScheduler, StaticAuthorization,
};
use serde_json::{Value, json};

use crate::support::{RecordingSender, at, init_test_tracing};

fn build(
    authz: Arc<StaticAuthorization>,
) -> (MemoryStore, Arc<RecordingSender>, SmsScheduler<MemoryStore>) {
    let store = MemoryStore::new();
    let sender = RecordingSender::new();
    let scheduler = SmsScheduler::builder(store.clone(), sender.clone())
        .authorization(authz)
        .clock(ManualClock::at(at(100)))
        .build();
    (store, sender, scheduler)
}

fn build_granted() -> (MemoryStore, Arc<RecordingSender>, SmsScheduler<MemoryStore>) {
    build(StaticAuthorization::holding([
        Capability::SendSms,
        Capability::ExactAlarm,
    ]))
}

#[tokio::test]
async fn schedule_sms_with_valid_args_succeeds() -> Result<()> {
    init_test_tracing();
    let (store, _, scheduler) = build_granted();

    let outcome = scheduler
        .handle_call(&MethodCall::new(
            "scheduleSms",
            json!({"phoneNumber": "555", "message": "hi", "scheduledTime": 5_000_000}),
        ))
        .await;

    assert_eq!(outcome, MethodOutcome::Success(Value::Null));
    assert_eq!(store.scan_pending().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn schedule_sms_with_null_arg_is_invalid_and_schedules_nothing() -> Result<()> {
    init_test_tracing();
    let (store, _, scheduler) = build_granted();

    let outcome = scheduler
        .handle_call(&MethodCall::new(
            "scheduleSms",
            json!({"phoneNumber": null, "message": "hi", "scheduledTime": 5_000_000}),
        ))
        .await;

    let MethodOutcome::Error { code, .. } = outcome else {
        panic!("expected structured error, got {outcome:?}");
    };
    assert_eq!(code, ERROR_INVALID_ARGUMENTS);
    assert!(store.scan_pending().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn schedule_sms_with_missing_time_is_invalid() {
    init_test_tracing();
    let (_, _, scheduler) = build_granted();

    let outcome = scheduler
        .handle_call(&MethodCall::new(
            "scheduleSms",
            json!({"phoneNumber": "555", "message": "hi"}),
        ))
        .await;

    assert!(matches!(outcome, MethodOutcome::Error { code, .. } if code == ERROR_INVALID_ARGUMENTS));
}

#[tokio::test]
async fn schedule_sms_boundary_swallows_permission_failure() -> Result<()> {
    init_test_tracing();
    // No capabilities at all: scheduling fails internally.
    let (store, _, scheduler) = build(StaticAuthorization::denied());

    let outcome = scheduler
        .handle_call(&MethodCall::new(
            "scheduleSms",
            json!({"phoneNumber": "555", "message": "hi", "scheduledTime": 5_000_000}),
        ))
        .await;

    // The boundary still reports success; the failure exists only in the
    // log. Nothing was persisted.
    assert_eq!(outcome, MethodOutcome::Success(Value::Null));
    assert!(store.scan_pending().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn schedule_resumes_after_granted_request() -> Result<()> {
    init_test_tracing();
    // Denied on first check, granted when requested: the prompt-then-retry
    // flow completes the original call.
    let (store, _, scheduler) = build(StaticAuthorization::granting_on_request([
        Capability::ExactAlarm,
    ]));

    scheduler.schedule("555", "hi", at(5_000)).await?;
    assert_eq!(store.scan_pending().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn schedule_fails_when_request_denied() {
    init_test_tracing();
    let (_, _, scheduler) = build(StaticAuthorization::denied());

    let err = scheduler.schedule("555", "hi", at(5_000)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PermissionDenied(Capability::ExactAlarm)
    ));
}

#[tokio::test]
async fn send_sms_hands_off_immediately() {
    init_test_tracing();
    let (_, sender, scheduler) = build_granted();

    let outcome = scheduler
        .handle_call(&MethodCall::new(
            "sendSms",
            json!({"phoneNumber": "3030", "message": "1"}),
        ))
        .await;

    assert_eq!(outcome, MethodOutcome::Success(Value::Null));
    assert_eq!(sender.sent(), vec![("3030".to_owned(), "1".to_owned())]);
}

#[tokio::test]
async fn send_sms_boundary_swallows_send_failure() {
    init_test_tracing();
    let (_, sender, scheduler) = build_granted();

    // Empty target: the telephony fake rejects it, the boundary still
    // reports success.
    let outcome = scheduler
        .handle_call(&MethodCall::new(
            "sendSms",
            json!({"phoneNumber": "", "message": "1"}),
        ))
        .await;

    assert_eq!(outcome, MethodOutcome::Success(Value::Null));
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn send_now_surfaces_denied_permission_to_typed_callers() {
    init_test_tracing();
    let (_, sender, scheduler) = build(StaticAuthorization::denied());

    let err = scheduler.send_now("555", "hi").await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(Capability::SendSms)));
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn get_platform_version_returns_description() {
    init_test_tracing();
    let (_, _, scheduler) = build_granted();

    let outcome = scheduler
        .handle_call(&MethodCall::new("getPlatformVersion", Value::Null))
        .await;

    let MethodOutcome::Success(Value::String(version)) = outcome else {
        panic!("expected version string, got {outcome:?}");
    };
    assert!(!version.is_empty());
}

#[tokio::test]
async fn unknown_method_is_not_implemented() {
    init_test_tracing();
    let (_, _, scheduler) = build_granted();

    let outcome = scheduler
        .handle_call(&MethodCall::new("frobnicate", Value::Null))
        .await;

    assert_eq!(outcome, MethodOutcome::NotImplemented);
}
