//! Message-framed transport to the relay server.
//!
//! A [`Connector`] opens a [`Link`]: a stream of [`TransportEvent`]s plus a
//! [`TransportHandle`] for sending. Outbound frames go through a single
//! latest-value slot, so a newer state frame replaces one the writer has not
//! flushed yet instead of queueing behind it.

use crate::networking::{NetworkError, NetworkResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

/// Connection lifecycle and inbound frames, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Error(String),
    Closed { reason: Option<String> },
}

/// Sending side of an open link.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    outbound: watch::Sender<Option<String>>,
}

impl TransportHandle {
    /// Replace the pending outbound frame. Fails once the writer has gone away.
    pub fn send(&self, frame: String) -> NetworkResult<()> {
        self.outbound
            .send(Some(frame))
            .map_err(|_| NetworkError::ConnectionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

pub struct Link {
    pub handle: TransportHandle,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Url) -> NetworkResult<Link>;
}

/// `ws://<host><path>`, the socket endpoint served next to the static client.
pub fn endpoint_url(host: &str, path: &str) -> NetworkResult<Url> {
    let path = if path.starts_with('/') { path.to_string() } else { format!("/{path}") };
    Url::parse(&format!("ws://{host}{path}")).map_err(|e| NetworkError::InvalidEndpoint {
        reason: format!("{host}{path}: {e}"),
    })
}

// =============================================================================
// In-memory link
// =============================================================================

/// Far end of an in-memory link, standing in for the server.
pub struct ServerEnd {
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: watch::Receiver<Option<String>>,
}

impl ServerEnd {
    pub fn open(&self) {
        let _ = self.events.send(TransportEvent::Opened);
    }

    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Message(frame.into()));
    }

    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Error(reason.into()));
    }

    pub fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed { reason: None });
    }

    /// Latest frame the client wrote, if one arrived since the last call.
    pub fn take_sent(&mut self) -> Option<String> {
        if !self.outbound.has_changed().unwrap_or(false) {
            return None;
        }
        self.outbound.borrow_and_update().clone()
    }

    /// Wait for the client to write a new frame.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.outbound.changed().await.ok()?;
        self.outbound.borrow_and_update().clone()
    }
}

pub fn memory_link() -> (Link, ServerEnd) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = watch::channel(None);
    (
        Link {
            handle: TransportHandle { outbound: out_tx },
            events: event_rx,
        },
        ServerEnd {
            events: event_tx,
            outbound: out_rx,
        },
    )
}

/// Hands every accepted in-memory link's [`ServerEnd`] to the owner of the
/// receiver. Each connection opens immediately.
pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { accepted: tx }, rx)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, endpoint: &Url) -> NetworkResult<Link> {
        let (link, server) = memory_link();
        server.open();
        self.accepted.send(server).map_err(|_| NetworkError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason: "no server listening".to_string(),
        })?;
        Ok(link)
    }
}

// =============================================================================
// WebSocket
// =============================================================================

/// WebSocket link carrying one JSON message per text frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Url) -> NetworkResult<Link> {
        let (stream, _response) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| NetworkError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        info!("WebSocket connected to {}", endpoint);

        let (mut sink, mut source) = stream.split();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = watch::channel(None::<String>);
        let _ = event_tx.send(TransportEvent::Opened);

        let inbound = event_tx.clone();
        tokio::spawn(async move {
            loop {
                match source.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if inbound.send(TransportEvent::Message(text)).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|frame| frame.reason.to_string())
                            .filter(|reason| !reason.is_empty());
                        let _ = inbound.send(TransportEvent::Closed { reason });
                        break;
                    }
                    Some(Ok(other)) => {
                        debug!("Ignoring non-text frame: {:?}", other);
                    }
                    Some(Err(e)) => {
                        let _ = inbound.send(TransportEvent::Error(e.to_string()));
                        let _ = inbound.send(TransportEvent::Closed {
                            reason: Some(e.to_string()),
                        });
                        break;
                    }
                    None => {
                        let _ = inbound.send(TransportEvent::Closed { reason: None });
                        break;
                    }
                }
            }
            debug!("WebSocket reader task exiting");
        });

        tokio::spawn(async move {
            while out_rx.changed().await.is_ok() {
                let frame = out_rx.borrow_and_update().clone();
                let Some(frame) = frame else { continue };
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    warn!("Failed to write frame: {}", e);
                    let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("WebSocket writer task exiting");
        });

        Ok(Link {
            handle: TransportHandle { outbound: out_tx },
            events: event_rx,
        })
    }
}
