//! Persistent binary channel to the game server.
//!
//! One TCP connection carries bincode-encoded messages behind a u32
//! big-endian length prefix. A reader task decodes inbound frames and hands
//! them to the session's single tick loop over a channel, so event handling
//! never races with game logic; a writer task drains outbound operations so
//! `send` never blocks the caller.

use bincode::{deserialize, serialize};
use log::{info, warn};
use shared::protocol::{Event, Operation};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(3);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Frames larger than this are treated as a broken stream.
const MAX_FRAME_LEN: u32 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("not connected")]
    NotConnected,

    #[error("frame decode failed: {0}")]
    Decode(bincode::Error),
}

/// What the tick loop sees coming off the wire.
#[derive(Debug)]
pub enum TransportSignal {
    /// A decoded server event, delivered in arrival order.
    Event(Event),
    /// The connection dropped; the owner decides whether to reconnect.
    Closed,
}

/// Outbound seam between the sync manager and the wire. Lets tests record
/// operations without a live socket.
pub trait OperationSink {
    fn send_operation(&mut self, op: &Operation) -> Result<(), TransportError>;
}

pub struct Transport {
    addr: String,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    reconnect_attempts: u32,
    connected: Arc<AtomicBool>,
    closed: bool,
    inbound_tx: mpsc::UnboundedSender<TransportSignal>,
    inbound_rx: mpsc::UnboundedReceiver<TransportSignal>,
    outbound: Option<mpsc::UnboundedSender<Operation>>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl Transport {
    pub fn new(addr: &str) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            addr: addr.to_string(),
            reconnect_interval: RECONNECT_INTERVAL,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_attempts: 0,
            connected: Arc::new(AtomicBool::new(false)),
            closed: false,
            inbound_tx,
            inbound_rx,
            outbound: None,
            reader: None,
            writer: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Opens the connection and spawns the reader/writer tasks. Idempotent
    /// while the channel is already open, a no-op after `close`.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        if self.closed || self.is_connected() {
            return Ok(());
        }

        info!("Connecting to {}...", self.addr);
        let stream = match TcpStream::connect(&self.addr).await {
            Ok(stream) => stream,
            Err(e) => {
                self.reconnect_attempts += 1;
                return Err(TransportError::Connect(e));
            }
        };

        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        self.connected.store(true, Ordering::Release);
        self.reconnect_attempts = 0;
        self.outbound = Some(outbound_tx);
        self.reader = Some(tokio::spawn(read_loop(
            read_half,
            self.inbound_tx.clone(),
            self.connected.clone(),
        )));
        self.writer = Some(tokio::spawn(write_loop(
            write_half,
            outbound_rx,
            self.connected.clone(),
        )));

        info!("Connected to {}", self.addr);
        Ok(())
    }

    /// Next decoded event or a close notification. Single consumer: the
    /// session's tick loop.
    pub async fn recv(&mut self) -> TransportSignal {
        // The sender half lives in `self`, so the channel never closes
        // underneath us while the transport is alive.
        self.inbound_rx.recv().await.unwrap_or(TransportSignal::Closed)
    }

    /// How long to wait before the next reconnection attempt, or `None` once
    /// the budget is spent or the transport was explicitly closed.
    pub fn next_reconnect_delay(&self) -> Option<Duration> {
        if self.closed || self.reconnect_attempts >= self.max_reconnect_attempts {
            None
        } else {
            Some(self.reconnect_interval)
        }
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Tears the connection down and cancels any in-flight reconnection.
    pub fn close(&mut self) {
        self.closed = true;
        self.connected.store(false, Ordering::Release);
        self.outbound = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

impl OperationSink for Transport {
    /// Fire-and-forget: hands the operation to the writer task.
    fn send_operation(&mut self, op: &Operation) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        match &self.outbound {
            Some(tx) => tx.send(op.clone()).map_err(|_| TransportError::NotConnected),
            None => Err(TransportError::NotConnected),
        }
    }
}

async fn read_loop(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    inbound: mpsc::UnboundedSender<TransportSignal>,
    connected: Arc<AtomicBool>,
) {
    loop {
        let len = match read_half.read_u32().await {
            Ok(len) if len <= MAX_FRAME_LEN => len,
            Ok(len) => {
                warn!("Oversized frame ({} bytes), closing connection", len);
                break;
            }
            Err(_) => break,
        };

        let mut frame = vec![0u8; len as usize];
        if read_half.read_exact(&mut frame).await.is_err() {
            break;
        }

        match deserialize::<Event>(&frame) {
            Ok(event) => {
                if inbound.send(TransportSignal::Event(event)).is_err() {
                    return;
                }
            }
            // One bad frame must not take the channel down.
            Err(e) => warn!("{}", TransportError::Decode(e)),
        }
    }

    connected.store(false, Ordering::Release);
    let _ = inbound.send(TransportSignal::Closed);
}

async fn write_loop(
    mut write_half: tokio::net::tcp::OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Operation>,
    connected: Arc<AtomicBool>,
) {
    while let Some(op) = outbound.recv().await {
        let data = match serialize(&op) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to encode operation: {}", e);
                continue;
            }
        };

        if write_half.write_u32(data.len() as u32).await.is_err()
            || write_half.write_all(&data).await.is_err()
        {
            connected.store(false, Ordering::Release);
            break;
        }
    }
}
