use embassy_futures::block_on;

use super::*;
use crate::testing::RecordingHub;

#[test]
fn exact_length_message_is_published_verbatim() {
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let message = [1, 0, 0, 1, 0];

    let outcome = control.on_message(7, InboundMessage::Binary(&message));

    assert_eq!(
        outcome,
        ControlOutcome::Updated(ControlVector::from_message(&message).unwrap())
    );
    assert_eq!(control.read().as_bytes(), &message);
    assert_eq!(telemetry.snapshot().control_updates, 1);
}

#[test]
fn other_lengths_leave_vector_untouched() {
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    control.on_message(1, InboundMessage::Binary(&[0, 1, 0, 0, 0]));
    let before = control.read();

    for len in [0usize, 1, 4, 6, 64] {
        let bytes = vec![0xAA; len];
        assert_eq!(
            control.on_message(1, InboundMessage::Binary(&bytes)),
            ControlOutcome::Ignored { len }
        );
        assert_eq!(control.read(), before);
    }
    assert_eq!(telemetry.snapshot().control_ignored, 5);
}

#[test]
fn repeated_vector_is_a_no_op() {
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let message = [0, 0, 1, 0, 0];
    control.on_message(1, InboundMessage::Binary(&message));

    assert_eq!(
        control.on_message(1, InboundMessage::Binary(&message)),
        ControlOutcome::Unchanged
    );
    assert_eq!(telemetry.snapshot().control_updates, 1);
}

#[test]
fn text_messages_do_not_mutate() {
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    assert_eq!(
        control.on_message(3, InboundMessage::Text("hello")),
        ControlOutcome::Diagnostic
    );
    assert!(control.read().is_zero());
}

#[test]
fn closing_last_writer_clears_vector() {
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    control.on_message(1, InboundMessage::Binary(&[1, 0, 0, 0, 0]));
    control.on_message(2, InboundMessage::Binary(&[0, 1, 0, 0, 0]));

    control.on_session_closed(1);
    assert_eq!(control.read().as_bytes(), &[0, 1, 0, 0, 0]);

    control.on_session_closed(2);
    assert!(control.read().is_zero());
}

#[test]
fn receive_error_closes_only_that_session() {
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let hub = RecordingHub::with_sessions(&[1, 2]);
    control.on_message(2, InboundMessage::Binary(&[0, 0, 0, 1, 0]));

    block_on(control.on_receive_error(&hub, 1, TransportError::ReceiveFailed));

    assert_eq!(hub.closed(), vec![1]);
    assert_eq!(control.read().as_bytes(), &[0, 0, 0, 1, 0]);
}

#[test]
fn receive_error_on_writer_keeps_vector() {
    let telemetry = Telemetry::new();
    let control = ControlState::new(&telemetry);
    let hub = RecordingHub::with_sessions(&[1, 2]);
    control.on_message(1, InboundMessage::Binary(&[1, 0, 0, 0, 0]));

    block_on(control.on_receive_error(&hub, 1, TransportError::ReceiveFailed));

    assert_eq!(hub.closed(), vec![1]);
    assert_eq!(control.read().as_bytes(), &[1, 0, 0, 0, 0]);

    // The disconnect that follows the close still clears it.
    control.on_session_closed(1);
    assert!(control.read().is_zero());
}

#[test]
fn display_matches_state_log_format() {
    let vector = ControlVector::from_message(&[1, 0, 1, 0, 0]).unwrap();
    assert_eq!(
        format!("{}", vector),
        "UP:1 DOWN:0 LEFT:1 RIGHT:0 STOP:0"
    );
}
