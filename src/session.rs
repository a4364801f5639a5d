//! Chat session — the client-side state machine for one matched chat.
//!
//! DESIGN
//! ======
//! The session owns the transcript, connection status, typing state, and the
//! end/rematch negotiation. Transition methods are plain `&mut self` calls
//! that mutate state and return the batch of [`SessionEvent`]s to deliver.
//! They never call back into the presentation layer mid-mutation and never
//! send events directly. The event loop in [`crate::driver`] owns delivery.
//!
//! LIFECYCLE
//! =========
//! 1. Transport `Opened` → connection Open, navigation locked
//! 2. Commands and inbound frames drive the Active phase
//! 3. `endChat` / `matchEnded` / rematch negotiation leave Active; phases
//!    are one-directional and never re-entered
//! 4. `Teardown` cancels the presence timer and releases the transport,
//!    exactly once, from any phase

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::frame::Frame;
use crate::message::{Message, MessageLog};
use crate::presence::{PresenceTimer, TYPING_EXPIRY};
use crate::transport::{Transport, TransportEvent, TransportStatus};

const MSG_ENDED_BY_LOCAL: &str = "You have ended the chat";
const MSG_ENDED_BY_REMOTE: &str = "Your partner ended the chat";
const MSG_REMATCH_REQUESTED: &str = "Your partner requested a rematch";
const MSG_CONNECTION_LOST: &str = "Connection lost";

// =============================================================================
// TYPES
// =============================================================================

/// Connection status as surfaced to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
}

/// Where the session is in its life. Transitions are one-directional: no
/// phase is re-entered once left (typing toggles are not phase transitions).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Live chat. The only phase in which frames may be sent.
    Active,
    /// The local user ended the chat.
    EndedByLocal,
    /// The remote participant ended the chat.
    EndedByRemote,
    /// The remote participant requested a rematch; awaiting local confirmation.
    RematchPending,
    /// Local confirmed; the transport is released and a replacement session
    /// takes over from here.
    Rematching,
}

/// Who ended the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    Local,
    Remote,
}

/// Domain events pulled by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message was appended to the log (local, remote, or system).
    MessageReceived(Message),
    /// The remote typing indicator turned on or off.
    TypingChanged(bool),
    ConnectionStatusChanged(ConnectionStatus),
    SessionEnded { reason: EndReason },
    /// The remote participant asked for a rematch; confirm or end.
    RematchRequested,
    /// Local confirmed the rematch; this session's transport is released.
    RematchConfirmed,
    /// A send was refused because no open connection is bound.
    TransportUnavailable,
}

/// User-initiated commands pushed in by the presentation layer.
#[derive(Clone, Debug)]
pub enum SessionCommand {
    SendMessage(String),
    /// Edge-triggered by the input going from empty to non-empty.
    NotifyTyping,
    EndChat,
    ConfirmRematch,
    SetBubbleColor(String),
    Teardown,
}

/// Capability handed in by the presentation layer: lock or release page
/// navigation on phase transitions. Replaces the ambient broadcast the
/// original UI used for the same purpose.
pub type NavigationHook = Box<dyn Fn(bool) + Send>;

// =============================================================================
// SESSION
// =============================================================================

/// The state machine for one chat, from connection open to end or rematch.
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    connection: ConnectionStatus,
    phase: LifecyclePhase,
    remote_typing: bool,
    presence: PresenceTimer,
    log: MessageLog,
    bubble_color: Option<String>,
    nav: Option<NavigationHook>,
    released: bool,
}

impl ChatSession {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            connection: ConnectionStatus::Connecting,
            phase: LifecyclePhase::Active,
            remote_typing: false,
            presence: PresenceTimer::new(),
            log: MessageLog::new(),
            bubble_color: None,
            nav: None,
            released: false,
        }
    }

    /// Set the initial bubble-color preference for LocalUser messages.
    #[must_use]
    pub fn with_bubble_color(mut self, color: impl Into<String>) -> Self {
        self.bubble_color = Some(color.into());
        self
    }

    /// Install the navigation capability. Invoked with `false` when the chat
    /// goes live and `true` when the session ends, loses its connection, or
    /// confirms a rematch.
    #[must_use]
    pub fn with_navigation_hook(mut self, hook: NavigationHook) -> Self {
        self.nav = Some(hook);
        self
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    #[must_use]
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    #[must_use]
    pub fn remote_typing(&self) -> bool {
        self.remote_typing
    }

    #[must_use]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    #[must_use]
    pub fn bubble_color(&self) -> Option<&str> {
        self.bubble_color.as_deref()
    }

    /// Snapshot of the typing-expiry timer, for the event loop to await.
    #[must_use]
    pub fn presence(&self) -> PresenceTimer {
        self.presence
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Apply one presentation-layer command.
    pub fn handle_command(&mut self, command: SessionCommand) -> Vec<SessionEvent> {
        match command {
            SessionCommand::SendMessage(text) => self.send_message(&text),
            SessionCommand::NotifyTyping => self.notify_typing(),
            SessionCommand::EndChat => self.end_chat(),
            SessionCommand::ConfirmRematch => self.confirm_rematch(),
            SessionCommand::SetBubbleColor(color) => self.set_bubble_color(&color),
            SessionCommand::Teardown => self.teardown(),
        }
    }

    fn send_message(&mut self, text: &str) -> Vec<SessionEvent> {
        // Whitespace-only input is a no-op, not an error.
        if text.trim().is_empty() {
            return Vec::new();
        }
        if self.phase != LifecyclePhase::Active {
            debug!(phase = ?self.phase, "session: send refused outside Active");
            return Vec::new();
        }
        if self.connection != ConnectionStatus::Open
            || self.transport.status() != TransportStatus::Open
        {
            debug!("session: send refused, connection not open");
            return vec![SessionEvent::TransportUnavailable];
        }

        self.transport.send(&Frame::Chat { message: text.to_owned() });

        let message = Message::local(text, self.bubble_color.as_deref());
        self.log.append(message.clone());
        vec![SessionEvent::MessageReceived(message)]
    }

    fn notify_typing(&mut self) -> Vec<SessionEvent> {
        // Fire-and-forget; no ack, no event. Never emitted outside Active.
        if self.phase == LifecyclePhase::Active
            && self.connection == ConnectionStatus::Open
            && self.transport.status() == TransportStatus::Open
        {
            self.transport.send(&Frame::Typing);
        }
        Vec::new()
    }

    fn end_chat(&mut self) -> Vec<SessionEvent> {
        if self.phase != LifecyclePhase::Active {
            return Vec::new();
        }
        if self.connection == ConnectionStatus::Open {
            self.transport.send(&Frame::EndChat);
        }
        info!("session: ended by local user");
        self.phase = LifecyclePhase::EndedByLocal;

        let mut events = self.clear_remote_typing();
        events.extend(self.append_system(MSG_ENDED_BY_LOCAL));
        events.push(SessionEvent::SessionEnded { reason: EndReason::Local });
        self.set_navigation(true);
        events
    }

    fn confirm_rematch(&mut self) -> Vec<SessionEvent> {
        if self.phase != LifecyclePhase::RematchPending {
            debug!(phase = ?self.phase, "session: confirm_rematch ignored");
            return Vec::new();
        }
        info!("session: rematch confirmed, releasing transport");
        self.phase = LifecyclePhase::Rematching;
        self.release_transport();
        self.set_navigation(true);
        vec![SessionEvent::RematchConfirmed]
    }

    fn set_bubble_color(&mut self, color: &str) -> Vec<SessionEvent> {
        // Pure local mutation: no frame, retroactive on prior local messages.
        self.bubble_color = Some(color.to_owned());
        self.log.recolor_local(color);
        Vec::new()
    }

    /// Cancel the presence timer and release the transport. Idempotent:
    /// calling twice closes the transport at most once.
    pub fn teardown(&mut self) -> Vec<SessionEvent> {
        self.presence.cancel();
        self.release_transport();
        Vec::new()
    }

    // ------------------------------------------------------------------
    // Transport events
    // ------------------------------------------------------------------

    /// Apply one inbound transport notification.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Vec<SessionEvent> {
        match event {
            TransportEvent::Opened => self.handle_opened(),
            TransportEvent::Frame(frame) => self.handle_frame(frame),
            TransportEvent::Closed => {
                info!("session: transport closed");
                self.handle_connection_down()
            }
            TransportEvent::Failed(reason) => {
                warn!(%reason, "session: transport failed");
                self.handle_connection_down()
            }
        }
    }

    fn handle_opened(&mut self) -> Vec<SessionEvent> {
        if self.connection != ConnectionStatus::Connecting {
            debug!(connection = ?self.connection, "session: spurious open ignored");
            return Vec::new();
        }
        info!("session: connection open");
        self.connection = ConnectionStatus::Open;
        self.set_navigation(false);
        vec![SessionEvent::ConnectionStatusChanged(ConnectionStatus::Open)]
    }

    fn handle_connection_down(&mut self) -> Vec<SessionEvent> {
        if self.connection == ConnectionStatus::Closed {
            return Vec::new();
        }
        self.connection = ConnectionStatus::Closed;

        let mut events =
            vec![SessionEvent::ConnectionStatusChanged(ConnectionStatus::Closed)];

        // A drop mid-chat is a connectivity notice, deliberately distinct
        // from EndedByLocal/EndedByRemote so the presentation layer can tell
        // "partner left" from "network dropped".
        if self.phase == LifecyclePhase::Active {
            events.extend(self.clear_remote_typing());
            events.extend(self.append_system(MSG_CONNECTION_LOST));
            self.set_navigation(true);
        }
        events
    }

    fn handle_frame(&mut self, frame: Frame) -> Vec<SessionEvent> {
        if self.phase != LifecyclePhase::Active {
            debug!(kind = frame.kind(), phase = ?self.phase, "session: frame ignored outside Active");
            return Vec::new();
        }

        match frame {
            Frame::Chat { message } => {
                let mut events = self.clear_remote_typing();
                let message = Message::remote(message);
                self.log.append(message.clone());
                events.push(SessionEvent::MessageReceived(message));
                events
            }
            Frame::Typing => {
                // Always refresh the deadline; emit only on an actual flip.
                self.presence.start(TYPING_EXPIRY);
                if self.remote_typing {
                    Vec::new()
                } else {
                    self.remote_typing = true;
                    vec![SessionEvent::TypingChanged(true)]
                }
            }
            Frame::MatchEnded => {
                info!("session: ended by remote");
                self.phase = LifecyclePhase::EndedByRemote;
                let mut events = self.clear_remote_typing();
                events.extend(self.append_system(MSG_ENDED_BY_REMOTE));
                events.push(SessionEvent::SessionEnded { reason: EndReason::Remote });
                self.set_navigation(true);
                events
            }
            Frame::RematchRequested => {
                info!("session: remote requested rematch");
                self.phase = LifecyclePhase::RematchPending;
                let mut events = self.clear_remote_typing();
                events.extend(self.append_system(MSG_REMATCH_REQUESTED));
                events.push(SessionEvent::RematchRequested);
                events
            }
            Frame::EndChat => {
                // Outbound-only kind; a relay echoing it back is a protocol
                // violation worth logging but not acting on.
                warn!("session: unexpected inbound endChat frame dropped");
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Presence expiry
    // ------------------------------------------------------------------

    /// The typing-expiry deadline elapsed with no refresh.
    pub fn handle_typing_expired(&mut self) -> Vec<SessionEvent> {
        self.clear_remote_typing()
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn clear_remote_typing(&mut self) -> Vec<SessionEvent> {
        self.presence.cancel();
        if self.remote_typing {
            self.remote_typing = false;
            vec![SessionEvent::TypingChanged(false)]
        } else {
            Vec::new()
        }
    }

    fn append_system(&mut self, content: &str) -> Vec<SessionEvent> {
        let message = Message::system(content);
        self.log.append(message.clone());
        vec![SessionEvent::MessageReceived(message)]
    }

    fn release_transport(&mut self) {
        if !self.released {
            self.released = true;
            self.transport.close();
        }
    }

    fn set_navigation(&self, enabled: bool) {
        if let Some(hook) = &self.nav {
            hook(enabled);
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
