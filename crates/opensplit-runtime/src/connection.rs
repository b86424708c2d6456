//! Connection Adapter
//!
//! One WebSocket connection per observer, driven by two pumps:
//! - the read pump forwards every decoded command to the hub and enforces a
//!   read deadline that only a pong from the peer pushes back;
//! - the write pump drains the observer's bounded outbound queue to the wire
//!   under a write deadline and pings the peer on a fixed period.
//!
//! Whichever pump stops first ends the connection, and the observer is
//! unregistered exactly once on the way out.

use crate::hub::HubHandle;
use crate::observer::{outbound_channel, ObserverId, OutboundReceiver};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use opensplit_core::{config::ConnectionConfig, decode_command};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;
type WsStream<S> = SplitStream<WebSocketStream<S>>;

/// Why a connection ended
#[derive(Debug, thiserror::Error)]
pub enum DisconnectReason {
    #[error("peer closed the connection")]
    Closed,
    #[error("no pong received within {0:?}")]
    ReadTimeout(Duration),
    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("dropped by the hub")]
    Evicted,
    #[error("hub is no longer running")]
    HubGone,
}

/// Serve one observer until its connection ends
pub async fn serve_observer<S>(
    ws: WebSocketStream<S>,
    hub: HubHandle,
    config: ConnectionConfig,
) -> DisconnectReason
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let id = ObserverId::new();
    let (outbound, outbound_receiver) = outbound_channel(config.send_buffer_size);
    if hub.register(id, outbound).await.is_err() {
        return DisconnectReason::HubGone;
    }
    info!(observer = %id, "Observer connected");

    let (sink, stream) = ws.split();
    let mut writer = tokio::spawn(write_pump(sink, outbound_receiver, config.clone()));

    let reason = tokio::select! {
        reason = read_pump(stream, &hub, id, &config) => {
            writer.abort();
            reason
        }
        joined = &mut writer => match joined {
            Ok(reason) => reason,
            Err(e) => {
                error!(observer = %id, "Write pump failed: {}", e);
                DisconnectReason::Closed
            }
        },
    };

    // A no-op when the hub already dropped this observer
    let _ = hub.unregister(id).await;
    info!(observer = %id, %reason, "Observer disconnected");
    reason
}

// ----------------------------------------------------------------------------
// Read Pump
// ----------------------------------------------------------------------------

async fn read_pump<S>(
    mut stream: WsStream<S>,
    hub: &HubHandle,
    id: ObserverId,
    config: &ConnectionConfig,
) -> DisconnectReason
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let pong_wait = config.pong_wait();
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let next = match time::timeout_at(deadline, stream.next()).await {
            Ok(next) => next,
            Err(_) => return DisconnectReason::ReadTimeout(pong_wait),
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => return classify_read_error(e),
            None => return DisconnectReason::Closed,
        };

        match message {
            Message::Text(text) => {
                if let Err(reason) = forward(hub, id, text.as_bytes()).await {
                    return reason;
                }
            }
            Message::Binary(bytes) => {
                if let Err(reason) = forward(hub, id, &bytes).await {
                    return reason;
                }
            }
            Message::Pong(_) => deadline = Instant::now() + pong_wait,
            // Pings are answered by tungstenite itself
            Message::Ping(_) | Message::Frame(_) => {}
            Message::Close(_) => return DisconnectReason::Closed,
        }
    }
}

fn classify_read_error(e: tungstenite::Error) -> DisconnectReason {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            DisconnectReason::Closed
        }
        other => DisconnectReason::WebSocket(other),
    }
}

/// Decode one frame and hand it to the hub; undecodable frames are dropped
async fn forward(hub: &HubHandle, id: ObserverId, frame: &[u8]) -> Result<(), DisconnectReason> {
    match decode_command(frame) {
        Ok(command) => hub
            .submit(Some(id), command)
            .await
            .map_err(|_| DisconnectReason::HubGone),
        Err(e) => {
            warn!(observer = %id, error = %e, "Discarding invalid frame");
            Ok(())
        }
    }
}

// ----------------------------------------------------------------------------
// Write Pump
// ----------------------------------------------------------------------------

async fn write_pump<S>(
    mut sink: WsSink<S>,
    mut outbound: OutboundReceiver,
    config: ConnectionConfig,
) -> DisconnectReason
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let write_wait = config.write_wait();
    let ping_period = config.ping_period();
    let mut ping = time::interval_at(Instant::now() + ping_period, ping_period);

    loop {
        tokio::select! {
            payload = outbound.recv() => match payload {
                Some(payload) => {
                    let message = Message::Text(payload.to_string());
                    if let Err(reason) = write(&mut sink, message, write_wait).await {
                        return reason;
                    }
                }
                None => {
                    // The hub closed the queue: say goodbye, best effort
                    let _ = write(&mut sink, Message::Close(None), write_wait).await;
                    return DisconnectReason::Evicted;
                }
            },
            _ = ping.tick() => {
                debug!("Sending keepalive ping");
                if let Err(reason) = write(&mut sink, Message::Ping(Vec::new()), write_wait).await {
                    return reason;
                }
            }
        }
    }
}

async fn write<S>(
    sink: &mut WsSink<S>,
    message: Message,
    write_wait: Duration,
) -> Result<(), DisconnectReason>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match time::timeout(write_wait, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(classify_read_error(e)),
        Err(_) => Err(DisconnectReason::WriteTimeout(write_wait)),
    }
}
