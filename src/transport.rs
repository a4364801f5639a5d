//! Transport contract — the session's view of one relay connection.
//!
//! SYSTEM CONTEXT
//! ==============
//! Matchmaking happens elsewhere; by the time a session exists it has been
//! handed exactly one bidirectional connection. The session consumes that
//! connection through this contract: a non-blocking [`Transport`] handle for
//! outbound frames plus an [`TransportEvent`] stream for everything inbound.
//! The concrete WebSocket adapter lives in [`crate::ws`]; tests drive the
//! same contract with an in-memory channel transport.
//!
//! OWNERSHIP
//! =========
//! One session owns one transport at a time. Ownership transfers only by
//! full teardown and recreation, never by sharing a live handle.

use crate::frame::Frame;

/// Connection status as the session sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportStatus {
    Connecting,
    Open,
    Closed,
}

/// Inbound notifications from the transport, already decoded.
///
/// The frame codec sits inside the adapter: malformed wire payloads are
/// logged and dropped there and never reach the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection finished opening and can carry frames.
    Opened,
    /// One decoded inbound frame.
    Frame(Frame),
    /// The connection closed (graceful or remote-initiated).
    Closed,
    /// The connection failed. Collapses to `Closed` for state-machine
    /// purposes; the reason is for the diagnostic channel only.
    Failed(String),
}

/// Outbound half of one relay connection.
///
/// `send` is fire-and-forget: it never blocks and never awaits an
/// acknowledgment. An adapter that is not open logs and drops the frame;
/// the session checks [`status`](Transport::status) before sending and
/// treats a refused send as a local no-op.
pub trait Transport: Send + Sync {
    /// Current connection status.
    fn status(&self) -> TransportStatus;

    /// Queue one frame for delivery. Logs and drops if not open.
    fn send(&self, frame: &Frame);

    /// Release the connection. Idempotent; safe to call on a dead handle.
    fn close(&self);
}
