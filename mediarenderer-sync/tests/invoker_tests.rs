//! Outbound actions: wire arguments, error propagation and cache effects

mod common;

use std::sync::Arc;

use common::*;
use mediarenderer_api::{ApiError, FieldMap, ProtocolClient, Service};
use mediarenderer_sync::{ActionInvoker, RendererController, SyncError};
use rstest::rstest;

fn args(pairs: &[(&str, &str)]) -> FieldMap {
    pairs.iter().copied().collect()
}

#[tokio::test]
async fn test_play_marks_playing_on_success() {
    let client = FakeClient::new();
    let handle = spawn_with(&client);

    handle.request_play().await.unwrap();

    assert!(handle.is_playing());
    assert_eq!(
        client.calls(),
        vec![RecordedCall {
            service: Service::AVTransport,
            action: "Play".to_string(),
            args: args(&[("InstanceID", "0"), ("Speed", "1")]),
        }]
    );
}

#[tokio::test]
async fn test_pause_marks_not_playing_on_success() {
    let client = FakeClient::new();
    let handle = spawn_with(&client);

    handle.request_play().await.unwrap();
    handle.request_pause().await.unwrap();

    assert!(!handle.is_playing());
    assert_eq!(client.calls()[1].args, args(&[("InstanceID", "0")]));
}

#[tokio::test]
async fn test_failed_play_leaves_cache_untouched() {
    let client = FakeClient::new();
    client.fail("Play", ApiError::SoapFault(701));
    let handle = spawn_with(&client);

    let result = handle.request_play().await;

    assert_eq!(result, Err(SyncError::Remote(ApiError::SoapFault(701))));
    assert!(!handle.is_playing());
}

#[tokio::test]
async fn test_failed_pause_keeps_playing() {
    let client = FakeClient::new();
    let handle = spawn_with(&client);
    handle.request_play().await.unwrap();

    client.fail("Pause", ApiError::NetworkError("timed out".to_string()));
    assert!(handle.request_pause().await.is_err());
    assert!(handle.is_playing());
}

#[tokio::test]
async fn test_set_volume_waits_for_the_event() {
    let client = FakeClient::new();
    let handle = spawn_with(&client);
    handle.start().await.unwrap();

    handle.request_set_volume(55).await.unwrap();

    assert_eq!(handle.volume(), 0);
    assert_eq!(
        client.calls()[0].args,
        args(&[("InstanceID", "0"), ("Channel", "Master"), ("DesiredVolume", "55")])
    );

    client.emit(Service::RenderingControl, &[("Volume", "55")]);
    wait_for_state(&handle, |s| s.volume == 55).await;
}

#[rstest]
#[case(true, "1")]
#[case(false, "0")]
#[tokio::test]
async fn test_set_mute_waits_for_the_event(#[case] muted: bool, #[case] wire: &str) {
    let client = FakeClient::new();
    let handle = spawn_with(&client);

    handle.request_set_mute(muted).await.unwrap();

    assert!(!handle.mute());
    let call = &client.calls()[0];
    assert_eq!(call.service, Service::RenderingControl);
    assert_eq!(call.action, "SetMute");
    assert_eq!(
        call.args,
        args(&[("InstanceID", "0"), ("Channel", "Master"), ("DesiredMute", wire)])
    );
}

#[tokio::test]
async fn test_out_of_range_volume_is_rejected_locally() {
    let client = FakeClient::new();
    let handle = spawn_with(&client);

    let result = handle.request_set_volume(101).await;

    assert!(matches!(result, Err(SyncError::InvalidParameter(_))));
    assert!(client.calls().is_empty());

    // The limit itself is accepted
    handle.request_set_volume(100).await.unwrap();
    assert_eq!(client.call_names(), vec!["SetVolume"]);
}

#[tokio::test]
async fn test_intents_without_client_are_not_initialized() {
    let handle = RendererController::new(identity()).spawn();

    assert_eq!(handle.request_play().await, Err(SyncError::NotInitialized));
    assert_eq!(handle.request_pause().await, Err(SyncError::NotInitialized));
    assert_eq!(
        handle.request_set_volume(20).await,
        Err(SyncError::NotInitialized)
    );
    assert_eq!(
        handle.request_set_mute(true).await,
        Err(SyncError::NotInitialized)
    );
    assert_eq!(handle.fetch_mute().await, Err(SyncError::NotInitialized));
    assert!(!handle.is_playing());
}

#[tokio::test]
async fn test_unbound_invoker() {
    let invoker = ActionInvoker::unbound();

    assert!(!invoker.is_bound());
    assert_eq!(invoker.play().await, Err(SyncError::NotInitialized));
    assert_eq!(invoker.get_volume().await, Err(SyncError::NotInitialized));
    // The client check comes before argument validation
    assert_eq!(invoker.set_volume(200).await, Err(SyncError::NotInitialized));
}

#[tokio::test]
async fn test_fetch_does_not_touch_the_cache() {
    let client = FakeClient::new();
    client.respond("GetMute", &[("CurrentMute", "1")]);
    client.respond("GetVolume", &[("CurrentVolume", "73")]);
    client.respond("GetTransportInfo", &[("CurrentTransportState", "PLAYING")]);
    let handle = spawn_with(&client);

    assert_eq!(handle.fetch_mute().await, Ok(true));
    assert_eq!(handle.fetch_volume().await, Ok(73));
    assert_eq!(
        handle.fetch_transport_state().await.as_deref(),
        Ok("PLAYING")
    );

    assert!(!handle.mute());
    assert_eq!(handle.volume(), 0);
    assert!(!handle.is_playing());
}

#[rstest]
#[case("abc")]
#[case("150")]
#[tokio::test]
async fn test_malformed_volume_response_is_a_parse_error(#[case] raw: &str) {
    let client = FakeClient::new();
    client.respond("GetVolume", &[("CurrentVolume", raw)]);
    let invoker = ActionInvoker::new(Arc::clone(&client) as Arc<dyn ProtocolClient>);

    assert!(matches!(
        invoker.get_volume().await,
        Err(SyncError::Parse { field: "Volume", .. })
    ));
}

#[tokio::test]
async fn test_missing_result_field_is_a_parse_error() {
    let client = FakeClient::new();
    let invoker = ActionInvoker::new(Arc::clone(&client) as Arc<dyn ProtocolClient>);

    assert!(matches!(
        invoker.get_transport_state().await,
        Err(SyncError::Parse {
            field: "CurrentTransportState",
            ..
        })
    ));
}

#[rstest]
#[case("GetMute", Service::RenderingControl, &[("InstanceID", "0"), ("Channel", "Master")])]
#[case("GetVolume", Service::RenderingControl, &[("InstanceID", "0"), ("Channel", "Master")])]
#[case("GetTransportInfo", Service::AVTransport, &[("InstanceID", "0")])]
#[tokio::test]
async fn test_query_wire_arguments(
    #[case] action: &str,
    #[case] service: Service,
    #[case] expected: &[(&str, &str)],
) {
    let client = FakeClient::new();
    let invoker = ActionInvoker::new(Arc::clone(&client) as Arc<dyn ProtocolClient>);

    let _ = match action {
        "GetMute" => invoker.get_mute().await.map(drop),
        "GetVolume" => invoker.get_volume().await.map(drop),
        _ => invoker.get_transport_state().await.map(drop),
    };

    let call = &client.calls()[0];
    assert_eq!(call.action, action);
    assert_eq!(call.service, service);
    assert_eq!(call.args, args(expected));
}

#[tokio::test]
async fn test_events_apply_while_an_action_is_pending() {
    let client = FakeClient::new();
    let gate = client.gate("Play");
    let handle = spawn_with(&client);
    handle.start().await.unwrap();

    let pending = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.request_play().await })
    };

    client.emit(Service::RenderingControl, &[("Volume", "18")]);
    wait_for_state(&handle, |s| s.volume == 18).await;
    assert!(!handle.is_playing());

    gate.notify_one();
    within(pending).await.unwrap().unwrap();
    assert!(handle.is_playing());
}

#[tokio::test]
async fn test_latest_write_wins_between_event_and_play() {
    let client = FakeClient::new();
    let handle = spawn_with(&client);
    handle.start().await.unwrap();

    handle.request_play().await.unwrap();
    client.emit(Service::AVTransport, &[("TransportState", "STOPPED")]);

    wait_for_state(&handle, |s| !s.is_playing).await;
}
