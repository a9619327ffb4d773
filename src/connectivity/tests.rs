use embassy_futures::block_on;

use super::*;
use crate::control::InboundMessage;
use crate::testing::{MemoryKvStore, ScriptedLink};

const DISCONNECT: LinkEvent = LinkEvent::StaDisconnected { reason: 201 };
const GOT_IP: LinkEvent = LinkEvent::GotIp {
    address: [192, 168, 1, 50],
};

fn policy(max_retries: u8, connect_timeout_ms: u32) -> ConnectivityPolicy {
    ConnectivityPolicy {
        max_retries,
        connect_timeout_ms,
    }
}

fn stored(ssid: &str, pass: &str) -> CredentialStore<MemoryKvStore> {
    let mut store = CredentialStore::new(MemoryKvStore::default());
    store.save(&Credentials::new(ssid, pass).unwrap()).unwrap();
    store
}

#[test]
fn engine_retries_exactly_max_then_falls_back() {
    let mut engine = ConnectivityEngine::new(3);
    let boot = engine.apply(ConnectivityEvent::Boot {
        has_credentials: true,
    });
    assert_eq!(boot.after, ConnectivityState::StaConnecting);
    assert!(boot.has(ConnectivityAction::IssueConnect));

    for attempt in 1..=3 {
        let result = engine.apply(ConnectivityEvent::StaDisconnected);
        assert_eq!(result.after, ConnectivityState::StaConnecting);
        assert_eq!(result.retries, attempt);
        assert!(result.has(ConnectivityAction::IssueConnect));
    }

    let result = engine.apply(ConnectivityEvent::StaDisconnected);
    assert_eq!(result.after, ConnectivityState::ApFallback);
    assert!(result.has(ConnectivityAction::FallBack));
    assert!(!result.has(ConnectivityAction::IssueConnect));
}

#[test]
fn engine_ignores_station_events_after_fallback() {
    let mut engine = ConnectivityEngine::new(0);
    engine.apply(ConnectivityEvent::Boot {
        has_credentials: false,
    });
    assert_eq!(engine.state(), ConnectivityState::ApFallback);

    for event in [
        ConnectivityEvent::GotIp,
        ConnectivityEvent::StaDisconnected,
        ConnectivityEvent::ConnectTimeout,
    ] {
        let result = engine.apply(event);
        assert!(!result.changed());
        assert!(result.actions.is_empty());
    }

    let result = engine.apply(ConnectivityEvent::ProvisioningStarted);
    assert_eq!(result.after, ConnectivityState::Provisioning);
    let result = engine.apply(ConnectivityEvent::ApClientLeft);
    assert_eq!(result.after, ConnectivityState::Provisioning);
    assert!(result.has(ConnectivityAction::ClearControl));
}

#[test]
fn got_ip_resets_retry_count() {
    let mut engine = ConnectivityEngine::new(5);
    engine.apply(ConnectivityEvent::Boot {
        has_credentials: true,
    });
    engine.apply(ConnectivityEvent::StaDisconnected);
    engine.apply(ConnectivityEvent::StaDisconnected);
    assert_eq!(engine.retries(), 2);

    let result = engine.apply(ConnectivityEvent::GotIp);
    assert_eq!(result.after, ConnectivityState::StaConnected);
    assert_eq!(result.retries, 0);
    assert!(result.has(ConnectivityAction::SignalConnected));
}

#[test]
fn boot_without_credentials_starts_access_point() {
    let events = LinkEvents::new();
    let link = SharedLink::new(ScriptedLink::new(&events));
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(5, 1_000));
    let mut store = CredentialStore::new(MemoryKvStore::default());

    let outcome = block_on(manager.boot(&mut store, None)).unwrap();
    assert_eq!(
        outcome,
        BootOutcome::AccessPoint {
            reason: FallbackReason::NoCredentials
        }
    );

    let radio = block_on(link.lock());
    assert!(radio.station.is_none());
    assert_eq!(radio.connect_calls, 0);
    let ap = radio.access_point.as_ref().unwrap();
    assert!(ap.ssid.ends_with("-C001"));
    drop(radio);

    let snapshot = status.snapshot();
    assert_eq!(snapshot.state, ConnectivityState::ApFallback);
    assert_eq!(snapshot.last_trigger, Trigger::NoCredentials);

    let result = block_on(manager.mark_provisioning());
    assert_eq!(result.after, ConnectivityState::Provisioning);
    assert_eq!(status.state(), ConnectivityState::Provisioning);
}

#[test]
fn boot_connects_with_stored_credentials() {
    let events = LinkEvents::new();
    let link = SharedLink::new(
        ScriptedLink::new(&events).on_connect(&[LinkEvent::StaAssociated, GOT_IP]),
    );
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(5, 2_000));
    let mut store = stored("home", "secret");

    let outcome = block_on(manager.boot(&mut store, None)).unwrap();
    assert_eq!(
        outcome,
        BootOutcome::Connected {
            source: CredentialSource::Stored
        }
    );

    let radio = block_on(link.lock());
    assert_eq!(radio.station.as_ref().unwrap().ssid(), "home");
    assert!(radio.access_point.is_none());
    drop(radio);
    assert_eq!(status.state(), ConnectivityState::StaConnected);
    assert_eq!(telemetry.snapshot().link_ups, 1);
}

#[test]
fn compiled_credentials_are_used_when_store_is_empty() {
    let events = LinkEvents::new();
    let link = SharedLink::new(ScriptedLink::new(&events).on_connect(&[GOT_IP]));
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(5, 2_000));
    let mut store = CredentialStore::new(MemoryKvStore::default());

    let outcome = block_on(manager.boot(&mut store, Some(Credentials::new("factory", "").unwrap())))
        .unwrap();
    assert_eq!(
        outcome,
        BootOutcome::Connected {
            source: CredentialSource::Compiled
        }
    );
    assert!(block_on(link.lock()).station.as_ref().unwrap().is_open());
}

#[test]
fn boot_retries_then_falls_back_to_access_point() {
    let events = LinkEvents::new();
    let link = SharedLink::new(
        ScriptedLink::new(&events)
            .on_connect(&[DISCONNECT])
            .on_connect(&[DISCONNECT])
            .on_connect(&[DISCONNECT]),
    );
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(2, 5_000));
    let mut store = stored("home", "wrong");

    let outcome = block_on(manager.boot(&mut store, None)).unwrap();
    assert_eq!(
        outcome,
        BootOutcome::AccessPoint {
            reason: FallbackReason::RetriesExhausted
        }
    );

    let radio = block_on(link.lock());
    assert_eq!(radio.connect_calls, 3);
    assert_eq!(radio.access_point_starts, 1);
    drop(radio);

    let counters = telemetry.snapshot();
    assert_eq!(counters.sta_connect_attempts, 3);
    assert_eq!(counters.sta_disconnects, 3);
    assert_eq!(counters.ap_fallbacks, 1);
    assert_eq!(status.snapshot().last_trigger, Trigger::StaDisconnected);
}

#[test]
fn boot_times_out_into_access_point() {
    let events = LinkEvents::new();
    let link = SharedLink::new(ScriptedLink::new(&events));
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(5, 50));
    let mut store = stored("home", "secret");

    let outcome = block_on(manager.boot(&mut store, None)).unwrap();
    assert_eq!(
        outcome,
        BootOutcome::AccessPoint {
            reason: FallbackReason::Timeout
        }
    );
    assert_eq!(status.snapshot().last_trigger, Trigger::ConnectTimeout);
    assert_eq!(block_on(link.lock()).access_point_starts, 1);
}

#[test]
fn access_point_start_failure_is_fatal() {
    let events = LinkEvents::new();
    let mut radio = ScriptedLink::new(&events);
    radio.fail_access_point = true;
    let link = SharedLink::new(radio);
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(5, 1_000));
    let mut store = CredentialStore::new(MemoryKvStore::default());

    assert_eq!(
        block_on(manager.boot(&mut store, None)),
        Err(BootError::AccessPoint(LinkError::StartFailed))
    );
}

#[test]
fn late_got_ip_after_fallback_is_ignored() {
    let events = LinkEvents::new();
    let link = SharedLink::new(ScriptedLink::new(&events));
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(5, 20));
    let mut store = stored("home", "secret");
    block_on(manager.boot(&mut store, None)).unwrap();

    let result = block_on(manager.handle_event(GOT_IP)).unwrap().unwrap();
    assert!(!result.changed());
    assert_eq!(manager.state(), ConnectivityState::ApFallback);
    assert_eq!(block_on(link.lock()).access_point_starts, 1);
    assert_eq!(telemetry.snapshot().link_ups, 0);
}

#[test]
fn disconnect_after_boot_reconnects() {
    let events = LinkEvents::new();
    let link = SharedLink::new(
        ScriptedLink::new(&events)
            .on_connect(&[GOT_IP])
            .on_connect(&[GOT_IP]),
    );
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(5, 2_000));
    let mut store = stored("home", "secret");
    block_on(manager.boot(&mut store, None)).unwrap();

    let result = block_on(manager.handle_event(DISCONNECT)).unwrap().unwrap();
    assert_eq!(result.after, ConnectivityState::StaConnecting);
    assert_eq!(result.retries, 1);
    assert_eq!(block_on(link.lock()).connect_calls, 2);

    let next = events.try_receive().unwrap();
    let result = block_on(manager.handle_event(next)).unwrap().unwrap();
    assert_eq!(result.after, ConnectivityState::StaConnected);
    assert_eq!(result.retries, 0);
    assert_eq!(telemetry.snapshot().link_ups, 2);
}

#[test]
fn access_point_client_leaving_clears_control() {
    let events = LinkEvents::new();
    let link = SharedLink::new(ScriptedLink::new(&events));
    let status = ConnectivityStatus::new();
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let mut manager =
        ConnectivityManager::new(&link, &events, &status, &control, &telemetry, policy(5, 1_000));
    let mut store = CredentialStore::new(MemoryKvStore::default());
    block_on(manager.boot(&mut store, None)).unwrap();
    block_on(manager.mark_provisioning());

    control.on_message(4, InboundMessage::Binary(&[1, 0, 0, 0, 0]));
    assert!(!control.read().is_zero());

    assert!(block_on(manager.handle_event(LinkEvent::ApClientJoined { aid: 1 }))
        .unwrap()
        .is_none());
    block_on(manager.handle_event(LinkEvent::ApClientLeft { aid: 1 })).unwrap();
    assert!(control.read().is_zero());
    assert_eq!(manager.state(), ConnectivityState::Provisioning);
}

#[test]
fn reason_labels_cover_common_codes() {
    assert_eq!(disconnect_reason_label(201), "no_ap_found");
    assert_eq!(disconnect_reason_label(15), "4way_handshake_timeout");
    assert_eq!(disconnect_reason_label(99), "other");
}
