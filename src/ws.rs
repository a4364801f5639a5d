//! WebSocket transport adapter over `tokio-tungstenite`.
//!
//! DESIGN
//! ======
//! Implements the [`Transport`] contract for a relay speaking the JSON frame
//! protocol over one WebSocket. Two tasks per connection:
//!
//! - **reader**: decodes inbound text frames and forwards them as
//!   [`TransportEvent`]s; malformed payloads are logged and dropped here so
//!   the session only ever sees well-formed frames.
//! - **writer**: drains an unbounded outbound queue, so [`Transport::send`]
//!   never blocks and never awaits an acknowledgment.
//!
//! Status is tracked atomically; `close` flips it before queueing the close
//! handshake, so a send racing a close is refused rather than queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::frame::{self, Frame};
use crate::transport::{Transport, TransportEvent, TransportStatus};

/// Error establishing a relay connection.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),
}

enum WsCommand {
    Frame(Frame),
    Close,
}

// =============================================================================
// STATUS CELL
// =============================================================================

const STATUS_CONNECTING: u8 = 0;
const STATUS_OPEN: u8 = 1;
const STATUS_CLOSED: u8 = 2;

#[derive(Debug)]
struct StatusCell(AtomicU8);

impl StatusCell {
    fn new(status: TransportStatus) -> Self {
        Self(AtomicU8::new(Self::encode(status)))
    }

    fn get(&self) -> TransportStatus {
        match self.0.load(Ordering::SeqCst) {
            STATUS_CONNECTING => TransportStatus::Connecting,
            STATUS_OPEN => TransportStatus::Open,
            _ => TransportStatus::Closed,
        }
    }

    fn set(&self, status: TransportStatus) {
        self.0.store(Self::encode(status), Ordering::SeqCst);
    }

    fn encode(status: TransportStatus) -> u8 {
        match status {
            TransportStatus::Connecting => STATUS_CONNECTING,
            TransportStatus::Open => STATUS_OPEN,
            TransportStatus::Closed => STATUS_CLOSED,
        }
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// One live WebSocket connection to the relay.
pub struct WsTransport {
    outbound: mpsc::UnboundedSender<WsCommand>,
    status: Arc<StatusCell>,
}

impl WsTransport {
    /// Connect to the relay and start the reader/writer tasks.
    ///
    /// The returned event stream starts with [`TransportEvent::Opened`] and
    /// ends with exactly one [`TransportEvent::Closed`] or
    /// [`TransportEvent::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Connect`] if the WebSocket handshake fails.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), WsError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| WsError::Connect(Box::new(e)))?;
        info!(%url, "ws: connected to relay");

        let status = Arc::new(StatusCell::new(TransportStatus::Open));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        // The session learns about the open transition through the same
        // stream as everything else, in order.
        let _ = event_tx.send(TransportEvent::Opened);

        let (write, read) = stream.split();
        tokio::spawn(write_loop(write, outbound_rx));
        tokio::spawn(read_loop(read, event_tx, status.clone()));

        Ok((Self { outbound: outbound_tx, status }, event_rx))
    }
}

impl Transport for WsTransport {
    fn status(&self) -> TransportStatus {
        self.status.get()
    }

    fn send(&self, frame: &Frame) {
        if self.status.get() != TransportStatus::Open {
            warn!(kind = frame.kind(), "ws: send dropped, connection not open");
            return;
        }
        if self.outbound.send(WsCommand::Frame(frame.clone())).is_err() {
            warn!(kind = frame.kind(), "ws: send dropped, writer gone");
        }
    }

    fn close(&self) {
        // Flip status first so racing sends are refused, then hand the close
        // handshake to the writer. Repeated calls are harmless no-ops.
        self.status.set(TransportStatus::Closed);
        let _ = self.outbound.send(WsCommand::Close);
    }
}

// =============================================================================
// TASKS
// =============================================================================

async fn write_loop<S>(mut write: S, mut outbound: mpsc::UnboundedReceiver<WsCommand>)
where
    S: SinkExt<Message> + Unpin,
{
    while let Some(command) = outbound.recv().await {
        match command {
            WsCommand::Frame(frame) => {
                let json = match frame::encode(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "ws: outbound frame dropped");
                        continue;
                    }
                };
                if write.send(Message::Text(json.into())).await.is_err() {
                    debug!("ws: write failed, stopping writer");
                    break;
                }
            }
            WsCommand::Close => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

async fn read_loop<S>(
    mut read: S,
    events: mpsc::UnboundedSender<TransportEvent>,
    status: Arc<StatusCell>,
) where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let terminal = loop {
        let Some(msg) = read.next().await else {
            break TransportEvent::Closed;
        };
        match msg {
            Ok(Message::Text(text)) => match frame::decode(text.as_str()) {
                Ok(frame) => {
                    if events.send(TransportEvent::Frame(frame)).is_err() {
                        break TransportEvent::Closed;
                    }
                }
                // Malformed inbound frames die here, quietly.
                Err(e) => warn!(error = %e, "ws: malformed inbound frame dropped"),
            },
            Ok(Message::Close(_)) => {
                info!("ws: relay closed the connection");
                break TransportEvent::Closed;
            }
            // Ping/pong handled by tungstenite; binary is not part of the protocol.
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "ws: read error");
                break TransportEvent::Failed(e.to_string());
            }
        }
    };

    status.set(TransportStatus::Closed);
    let _ = events.send(terminal);
}
