//! Transport seam between the channel driver and the network.
//!
//! A [`Connector`] opens one duplex text link. The driver writes outbound
//! frames into [`TransportLink::outbound`] and reads [`TransportFrame`]s from
//! [`TransportLink::inbound`]. Dropping the outbound sender closes the link.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use estate_core::error::{AppError, ErrorKind};
use estate_core::result::AppResult;

/// What the link delivers to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    /// A text frame.
    Text(String),
    /// The link failed. [`TransportFrame::Closed`] follows.
    Error(String),
    /// The link closed. Nothing follows.
    Closed,
}

/// An open duplex link.
#[derive(Debug)]
pub struct TransportLink {
    /// Frames to send, in order.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Frames received.
    pub inbound: mpsc::UnboundedReceiver<TransportFrame>,
}

/// Opens transport links.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug + 'static {
    /// Opens a link to `url`.
    async fn connect(&self, url: &str) -> AppResult<TransportLink>;
}

/// WebSocket connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> AppResult<TransportLink> {
        let (ws_stream, _) = connect_async(url).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("WebSocket connect to {url} failed: {e}"),
                e,
            )
        })?;
        debug!(url, "WebSocket connected");

        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = write.send(Message::text(text)).await {
                    warn!(error = %e, "WebSocket send failed");
                    break;
                }
            }
            let _ = write.close().await;
            debug!("WebSocket writer ended");
        });

        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                let frame = match msg {
                    Ok(Message::Text(text)) => TransportFrame::Text(text.as_str().to_owned()),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = in_tx.send(TransportFrame::Error(e.to_string()));
                        break;
                    }
                };
                if in_tx.send(frame).is_err() {
                    break;
                }
            }
            let _ = in_tx.send(TransportFrame::Closed);
            debug!("WebSocket reader ended");
        });

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
