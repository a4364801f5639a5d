//! Session driver — one serialized event queue per chat session.
//!
//! DESIGN
//! ======
//! The session's three input sources (local commands, inbound transport
//! notifications, and the presence-timer expiry) funnel through a single
//! `select!` loop, so all state mutation happens on one logical thread and
//! the session never races against itself. Transition methods return event
//! batches; this loop is the only place they are delivered from, which keeps
//! re-entrancy out of the state machine by construction.
//!
//! LIFECYCLE
//! =========
//! The loop exits on a `Teardown` command or when every command sender is
//! dropped. Either way the session tears down exactly once: presence timer
//! canceled, transport released if still open. A transport stream that ends
//! without a `Closed` notification is treated as closed.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::{ChatSession, SessionCommand, SessionEvent};
use crate::transport::TransportEvent;

// =============================================================================
// HANDLE
// =============================================================================

/// Command side of a running session. Dropping the handle (and every clone
/// of its sender) tears the session down.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn send_message(&self, text: impl Into<String>) {
        self.command(SessionCommand::SendMessage(text.into()));
    }

    /// Signal that the local user started composing. Edge-triggered: call on
    /// the input's empty → non-empty transition, not per keystroke.
    pub fn notify_typing(&self) {
        self.command(SessionCommand::NotifyTyping);
    }

    pub fn end_chat(&self) {
        self.command(SessionCommand::EndChat);
    }

    pub fn confirm_rematch(&self) {
        self.command(SessionCommand::ConfirmRematch);
    }

    pub fn set_bubble_color(&self, color: impl Into<String>) {
        self.command(SessionCommand::SetBubbleColor(color.into()));
    }

    /// Tear the session down. Idempotent from the caller's perspective.
    pub fn teardown(&self) {
        self.command(SessionCommand::Teardown);
    }

    /// Wait for the driver loop to finish (it exits after teardown).
    pub async fn join(self) {
        let _ = self.task.await;
    }

    fn command(&self, command: SessionCommand) {
        // A closed channel means the session already tore down; commands
        // against a dead session are defined as no-ops.
        if self.commands.send(command).is_err() {
            debug!("session handle: command dropped, session already down");
        }
    }
}

// =============================================================================
// DRIVER LOOP
// =============================================================================

/// Spawn the event loop for `session`, consuming `transport_rx`.
///
/// Returns the command handle and the presentation-facing event stream.
#[must_use]
pub fn spawn(
    session: ChatSession,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, transport_rx, command_rx, event_tx));
    (SessionHandle { commands: command_tx, task }, event_rx)
}

/// The serialized event loop. Runs until teardown.
async fn run(
    mut session: ChatSession,
    mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    // Set once the transport stream ends, so a dead stream does not spin the
    // loop with repeated `None` completions.
    let mut transport_live = true;

    loop {
        // Copy of the single-slot deadline; the handler re-arms or clears it.
        let presence = session.presence();

        let batch = tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(SessionCommand::Teardown) | None => {
                        deliver(&events, session.teardown());
                        break;
                    }
                    Some(command) => session.handle_command(command),
                }
            }
            event = transport_rx.recv(), if transport_live => {
                match event {
                    Some(event) => session.handle_transport_event(event),
                    None => {
                        // Adapter dropped its sender without a close event.
                        transport_live = false;
                        session.handle_transport_event(TransportEvent::Closed)
                    }
                }
            }
            () = presence.fired(), if presence.is_armed() => {
                session.handle_typing_expired()
            }
        };

        deliver(&events, batch);
    }

    debug!("session driver: loop exited");
}

fn deliver(events: &mpsc::UnboundedSender<SessionEvent>, batch: Vec<SessionEvent>) {
    for event in batch {
        // A dropped receiver means the presentation layer went away; the
        // session still winds down through its own teardown path.
        let _ = events.send(event);
    }
}
