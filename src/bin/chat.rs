//! Line-oriented relay chat client.
//!
//! A thin stand-in for the real UI: stdin lines become session commands,
//! session events print to stdout. `/end`, `/rematch`, `/color <hex>`, and
//! `/quit` map to the corresponding commands; anything else is sent as a
//! chat message. The first character typed on an empty line would, in a real
//! UI, fire the typing notification — here each sent line is preceded by one.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use pairchat::session::{ChatSession, EndReason, SessionEvent};
use pairchat::ws::WsTransport;

#[derive(Parser, Debug)]
#[command(name = "pairchat", about = "Relay chat session client")]
struct Cli {
    /// WebSocket URL of the relay endpoint for an already-matched pair.
    #[arg(long, env = "PAIRCHAT_RELAY_URL", default_value = "ws://127.0.0.1:9090/chat")]
    relay_url: String,

    /// Initial bubble color for your messages.
    #[arg(long, env = "PAIRCHAT_BUBBLE_COLOR")]
    bubble_color: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let (transport, transport_rx) = match WsTransport::connect(&cli.relay_url).await {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("could not reach relay at {}: {e}", cli.relay_url);
            std::process::exit(1);
        }
    };

    let mut session = ChatSession::new(Arc::new(transport));
    if let Some(color) = &cli.bubble_color {
        session = session.with_bubble_color(color.as_str());
    }
    let (handle, mut events) = pairchat::driver::spawn(session, transport_rx);

    // Event printer.
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::MessageReceived(msg) => {
                    println!("[{:?}] {}", msg.sender, msg.content);
                }
                SessionEvent::TypingChanged(true) => println!("* partner is typing..."),
                SessionEvent::TypingChanged(false) => println!("* partner stopped typing"),
                SessionEvent::ConnectionStatusChanged(status) => {
                    println!("* connection: {status:?}");
                }
                SessionEvent::SessionEnded { reason: EndReason::Local } => {
                    println!("* chat ended");
                }
                SessionEvent::SessionEnded { reason: EndReason::Remote } => {
                    println!("* your partner left");
                }
                SessionEvent::RematchRequested => {
                    println!("* partner wants a rematch — type /rematch to accept");
                }
                SessionEvent::RematchConfirmed => {
                    println!("* rematch confirmed, finding a new match...");
                }
                SessionEvent::TransportUnavailable => {
                    println!("* not connected — message not sent");
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "/quit" => break,
            "/end" => handle.end_chat(),
            "/rematch" => handle.confirm_rematch(),
            "" => {}
            text => {
                if let Some(color) = text.strip_prefix("/color ") {
                    handle.set_bubble_color(color.trim());
                } else {
                    handle.notify_typing();
                    handle.send_message(text);
                }
            }
        }
    }

    handle.teardown();
    handle.join().await;
    printer.abort();
}
