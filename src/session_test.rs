
use std::sync::{Arc, Mutex};

use super::*;
use crate::frame::Frame;
use crate::message::Sender;
use crate::transport::test_helpers::RecordingTransport;
use crate::transport::{TransportEvent, TransportStatus};

/// Session bound to an open recording transport, already past `Opened`.
fn open_session() -> (Arc<RecordingTransport>, ChatSession) {
    let transport = Arc::new(RecordingTransport::open());
    let mut session = ChatSession::new(transport.clone());
    let events = session.handle_transport_event(TransportEvent::Opened);
    assert_eq!(
        events,
        [SessionEvent::ConnectionStatusChanged(ConnectionStatus::Open)]
    );
    (transport, session)
}

fn senders(session: &ChatSession) -> Vec<Sender> {
    session.log().iter().map(|m| m.sender).collect()
}

// =============================================================================
// SENDING
// =============================================================================

#[test]
fn send_message_appends_one_local_entry_per_call_in_order() {
    let (transport, mut session) = open_session();

    for text in ["one", "two", "three"] {
        let events = session.handle_command(SessionCommand::SendMessage(text.into()));
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SessionEvent::MessageReceived(m) if m.content == text));
    }

    assert_eq!(session.log().len(), 3);
    assert_eq!(senders(&session), [Sender::LocalUser; 3]);
    let contents: Vec<String> =
        session.log().iter().map(|m| m.content.clone()).collect();
    assert_eq!(contents, ["one", "two", "three"]);

    let sent = transport.sent_frames();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], Frame::Chat { message: "one".into() });
}

#[test]
fn blank_send_is_a_no_op() {
    let (transport, mut session) = open_session();

    assert!(session.handle_command(SessionCommand::SendMessage(String::new())).is_empty());
    assert!(session.handle_command(SessionCommand::SendMessage("   ".into())).is_empty());
    assert!(session.handle_command(SessionCommand::SendMessage("\n\t".into())).is_empty());

    assert!(session.log().is_empty());
    assert!(transport.sent_frames().is_empty());
}

#[test]
fn send_before_open_is_refused_with_connectivity_notice() {
    let transport = Arc::new(RecordingTransport::with_status(TransportStatus::Connecting));
    let mut session = ChatSession::new(transport.clone());

    let events = session.handle_command(SessionCommand::SendMessage("hi".into()));
    assert_eq!(events, [SessionEvent::TransportUnavailable]);
    assert!(session.log().is_empty());
    assert!(transport.sent_frames().is_empty());
}

#[test]
fn local_sends_interleave_with_inbound_in_processing_order() {
    let (_, mut session) = open_session();

    session.handle_transport_event(TransportEvent::Frame(Frame::Chat { message: "A".into() }));
    session.handle_command(SessionCommand::SendMessage("mine".into()));
    session.handle_transport_event(TransportEvent::Frame(Frame::Chat { message: "B".into() }));

    let contents: Vec<String> =
        session.log().iter().map(|m| m.content.clone()).collect();
    assert_eq!(contents, ["A", "mine", "B"]);
    assert_eq!(
        senders(&session),
        [Sender::RemoteUser, Sender::LocalUser, Sender::RemoteUser]
    );
}

// =============================================================================
// TYPING PRESENCE
// =============================================================================

#[test]
fn inbound_typing_sets_indicator_and_arms_timer() {
    let (_, mut session) = open_session();

    let events = session.handle_transport_event(TransportEvent::Frame(Frame::Typing));
    assert_eq!(events, [SessionEvent::TypingChanged(true)]);
    assert!(session.remote_typing());
    assert!(session.presence().is_armed());
}

#[test]
fn repeated_typing_refreshes_without_duplicate_events() {
    let (_, mut session) = open_session();

    session.handle_transport_event(TransportEvent::Frame(Frame::Typing));
    let second = session.handle_transport_event(TransportEvent::Frame(Frame::Typing));
    assert!(second.is_empty(), "indicator already on, no duplicate event");
    assert!(session.remote_typing());
}

#[test]
fn typing_expiry_clears_indicator_exactly_once() {
    let (_, mut session) = open_session();
    session.handle_transport_event(TransportEvent::Frame(Frame::Typing));

    let first = session.handle_typing_expired();
    assert_eq!(first, [SessionEvent::TypingChanged(false)]);
    assert!(!session.remote_typing());
    assert!(!session.presence().is_armed());

    // A stray second expiry produces nothing.
    assert!(session.handle_typing_expired().is_empty());
}

#[test]
fn inbound_chat_clears_typing_indicator() {
    let (_, mut session) = open_session();
    session.handle_transport_event(TransportEvent::Frame(Frame::Typing));

    let events =
        session.handle_transport_event(TransportEvent::Frame(Frame::Chat { message: "hi".into() }));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], SessionEvent::TypingChanged(false));
    assert!(matches!(&events[1], SessionEvent::MessageReceived(m) if m.sender == Sender::RemoteUser));
    assert!(!session.presence().is_armed());
}

#[test]
fn notify_typing_sends_one_fire_and_forget_frame() {
    let (transport, mut session) = open_session();

    let events = session.handle_command(SessionCommand::NotifyTyping);
    assert!(events.is_empty());
    assert_eq!(transport.sent_frames(), [Frame::Typing]);
}

#[test]
fn notify_typing_is_suppressed_outside_active() {
    let (transport, mut session) = open_session();
    session.handle_command(SessionCommand::EndChat);
    let frames_after_end = transport.sent_frames().len();

    session.handle_command(SessionCommand::NotifyTyping);
    assert_eq!(transport.sent_frames().len(), frames_after_end);
}

// =============================================================================
// BUBBLE COLOR
// =============================================================================

#[test]
fn set_bubble_color_recolors_prior_local_messages_only() {
    let (transport, mut session) = open_session();

    session.handle_command(SessionCommand::SendMessage("m1".into()));
    session.handle_command(SessionCommand::SendMessage("m2".into()));
    session.handle_transport_event(TransportEvent::Frame(Frame::Chat { message: "peer".into() }));
    let frames_before = transport.sent_frames().len();

    let events = session.handle_command(SessionCommand::SetBubbleColor("#4ADE80".into()));
    assert!(events.is_empty(), "pure local mutation, no event, no frame");
    assert_eq!(transport.sent_frames().len(), frames_before);

    let colors: Vec<Option<&str>> =
        session.log().iter().map(|m| m.display_color.as_deref()).collect();
    assert_eq!(colors, [Some("#4ADE80"), Some("#4ADE80"), None]);
    assert_eq!(session.bubble_color(), Some("#4ADE80"));
}

#[test]
fn new_local_messages_take_the_updated_color() {
    let (_, mut session) = open_session();
    session.handle_command(SessionCommand::SetBubbleColor("#F87171".into()));
    session.handle_command(SessionCommand::SendMessage("after".into()));

    let last = session.log().last().expect("message appended");
    assert_eq!(last.display_color.as_deref(), Some("#F87171"));
}

// =============================================================================
// ENDING
// =============================================================================

#[test]
fn end_chat_transitions_and_blocks_further_sends() {
    let (transport, mut session) = open_session();

    let events = session.handle_command(SessionCommand::EndChat);
    assert_eq!(session.phase(), LifecyclePhase::EndedByLocal);
    assert!(transport.sent_frames().contains(&Frame::EndChat));
    assert!(events.iter().any(
        |e| matches!(e, SessionEvent::MessageReceived(m) if m.sender == Sender::System && m.content == "You have ended the chat")
    ));
    assert!(events.contains(&SessionEvent::SessionEnded { reason: EndReason::Local }));

    let log_len = session.log().len();
    let after = session.handle_command(SessionCommand::SendMessage("hi".into()));
    assert!(after.is_empty());
    assert_eq!(session.log().len(), log_len);
    assert_eq!(transport.sent_frames().len(), 1, "only the endChat frame went out");
}

#[test]
fn match_ended_emits_session_ended_remote_exactly_once() {
    let (_, mut session) = open_session();

    let events = session.handle_transport_event(TransportEvent::Frame(Frame::MatchEnded));
    assert_eq!(session.phase(), LifecyclePhase::EndedByRemote);
    let ended: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::SessionEnded { reason: EndReason::Remote }))
        .collect();
    assert_eq!(ended.len(), 1);
    assert!(events.iter().any(
        |e| matches!(e, SessionEvent::MessageReceived(m) if m.sender == Sender::System)
    ));

    // Duplicate notice from the relay: phase already left Active, ignored.
    assert!(session.handle_transport_event(TransportEvent::Frame(Frame::MatchEnded)).is_empty());
}

#[test]
fn inbound_frames_are_ignored_after_the_chat_ends() {
    let (_, mut session) = open_session();
    session.handle_command(SessionCommand::EndChat);
    let log_len = session.log().len();

    let events =
        session.handle_transport_event(TransportEvent::Frame(Frame::Chat { message: "late".into() }));
    assert!(events.is_empty());
    assert_eq!(session.log().len(), log_len);
}

// =============================================================================
// REMATCH
// =============================================================================

#[test]
fn rematch_negotiation_releases_transport_once() {
    let (transport, mut session) = open_session();

    let events = session.handle_transport_event(TransportEvent::Frame(Frame::RematchRequested));
    assert_eq!(session.phase(), LifecyclePhase::RematchPending);
    assert!(events.contains(&SessionEvent::RematchRequested));

    let events = session.handle_command(SessionCommand::ConfirmRematch);
    assert_eq!(session.phase(), LifecyclePhase::Rematching);
    assert_eq!(events, [SessionEvent::RematchConfirmed]);
    assert_eq!(transport.close_count(), 1);

    // Teardown afterwards must not double-release.
    session.handle_command(SessionCommand::Teardown);
    assert_eq!(transport.close_count(), 1);
}

#[test]
fn confirm_rematch_outside_pending_is_ignored() {
    let (transport, mut session) = open_session();
    let events = session.handle_command(SessionCommand::ConfirmRematch);
    assert!(events.is_empty());
    assert_eq!(session.phase(), LifecyclePhase::Active);
    assert_eq!(transport.close_count(), 0);
}

// =============================================================================
// CONNECTION LOSS & TEARDOWN
// =============================================================================

#[test]
fn connection_loss_mid_chat_is_a_notice_not_an_end() {
    let (_, mut session) = open_session();

    let events = session.handle_transport_event(TransportEvent::Closed);
    assert_eq!(session.connection(), ConnectionStatus::Closed);
    assert_eq!(session.phase(), LifecyclePhase::Active, "loss is not a phase transition");
    assert!(events.contains(&SessionEvent::ConnectionStatusChanged(ConnectionStatus::Closed)));
    assert!(events.iter().any(
        |e| matches!(e, SessionEvent::MessageReceived(m) if m.sender == Sender::System && m.content == "Connection lost")
    ));
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::SessionEnded { .. })));
}

#[test]
fn transport_failure_collapses_to_closed() {
    let (_, mut session) = open_session();
    let events =
        session.handle_transport_event(TransportEvent::Failed("reset by peer".into()));
    assert_eq!(session.connection(), ConnectionStatus::Closed);
    assert!(events.contains(&SessionEvent::ConnectionStatusChanged(ConnectionStatus::Closed)));
}

#[test]
fn close_after_graceful_end_only_updates_status() {
    let (_, mut session) = open_session();
    session.handle_command(SessionCommand::EndChat);
    let log_len = session.log().len();

    let events = session.handle_transport_event(TransportEvent::Closed);
    assert_eq!(
        events,
        [SessionEvent::ConnectionStatusChanged(ConnectionStatus::Closed)]
    );
    assert_eq!(session.log().len(), log_len, "no connection-lost notice after an ended chat");
}

#[test]
fn duplicate_close_notifications_are_ignored() {
    let (_, mut session) = open_session();
    session.handle_transport_event(TransportEvent::Closed);
    assert!(session.handle_transport_event(TransportEvent::Closed).is_empty());
    assert!(session.handle_transport_event(TransportEvent::Failed("again".into())).is_empty());
}

#[test]
fn teardown_is_idempotent() {
    let (transport, mut session) = open_session();
    session.handle_transport_event(TransportEvent::Frame(Frame::Typing));

    session.handle_command(SessionCommand::Teardown);
    session.handle_command(SessionCommand::Teardown);

    assert_eq!(transport.close_count(), 1);
    assert!(!session.presence().is_armed());
}

// =============================================================================
// NAVIGATION HOOK
// =============================================================================

#[test]
fn navigation_locks_on_open_and_releases_on_end() {
    let calls: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();

    let transport = Arc::new(RecordingTransport::open());
    let mut session = ChatSession::new(transport)
        .with_navigation_hook(Box::new(move |enabled| {
            sink.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(enabled);
        }));

    session.handle_transport_event(TransportEvent::Opened);
    session.handle_command(SessionCommand::EndChat);

    let recorded = calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
    assert_eq!(recorded, [false, true]);
}
