//! pairchat — client-side session core for a two-party relay chat.
//!
//! ARCHITECTURE
//! ============
//! A matched pair of participants shares one bidirectional relay connection.
//! This crate owns everything on the client with real state, timing, and
//! failure handling:
//!
//! - [`frame`] — the JSON wire codec
//! - [`transport`] — the connection contract the session consumes
//! - [`ws`] — the WebSocket adapter implementing that contract
//! - [`presence`] — the restartable typing-expiry timer
//! - [`session`] — the chat session state machine
//! - [`driver`] — the serialized event loop binding it all together
//!
//! The presentation layer (whatever renders bubbles and buttons) pushes
//! [`session::SessionCommand`]s in and pulls [`session::SessionEvent`]s out;
//! it holds no protocol state of its own.

pub mod driver;
pub mod frame;
pub mod message;
pub mod presence;
pub mod session;
pub mod transport;
pub mod ws;

pub use driver::{SessionHandle, spawn};
pub use frame::{CodecError, Frame};
pub use message::{Message, MessageLog, Sender};
pub use session::{
    ChatSession, ConnectionStatus, EndReason, LifecyclePhase, SessionCommand, SessionEvent,
};
pub use transport::{Transport, TransportEvent, TransportStatus};
pub use ws::WsTransport;
