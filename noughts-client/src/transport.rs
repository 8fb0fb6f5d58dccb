use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use noughts_protocol::{decode, DisconnectReason, Event};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};

/// Connection lifecycle. Only moves forward: `Idle -> Active -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Active = 1,
    Stopped = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Active,
            _ => Self::Stopped,
        }
    }
}

struct Lifecycle(AtomicU8);

impl Lifecycle {
    fn new() -> Self {
        Self(AtomicU8::new(SessionState::Idle as u8))
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Compare-and-set. Returns true only for the caller that made the move.
    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Owns one connected stream: a read loop task and a write loop task.
///
/// Decoded events go out on the channel handed to [`SessionTransport::start`].
/// That channel closes once the session stops, after at most one
/// `Disconnected` event.
pub(crate) struct SessionTransport {
    lifecycle: Lifecycle,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    events: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    shutdown: watch::Sender<bool>,
}

impl SessionTransport {
    /// Take ownership of a connected stream and spawn its read and write loops.
    pub(crate) fn start<S>(stream: S, events: mpsc::UnboundedSender<Event>) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let transport = Arc::new(Self {
            lifecycle: Lifecycle::new(),
            outbound: Mutex::new(Some(outbound_tx)),
            events: Mutex::new(Some(events)),
            shutdown: shutdown_tx,
        });

        transport
            .lifecycle
            .transition(SessionState::Idle, SessionState::Active);
        transport.forward(Event::ConnectionEstablished);

        tracing::debug!("Spawning read and write loops");
        tokio::spawn(read_loop(transport.clone(), read_half, shutdown_rx));
        tokio::spawn(write_loop(transport.clone(), write_half, outbound_rx));

        transport
    }

    pub(crate) fn state(&self) -> SessionState {
        self.lifecycle.get()
    }

    /// Queue one line for the server. A no-op, apart from a log line, when the
    /// session is not active.
    pub(crate) fn send(&self, line: String) {
        let state = self.state();
        if state != SessionState::Active {
            tracing::debug!("Dropping outbound {:?}: session is {:?}", line, state);
            return;
        }

        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        match outbound.as_ref() {
            Some(tx) => {
                if tx.send(line).is_err() {
                    tracing::debug!("Writer already exited, outbound line dropped");
                }
            }
            None => tracing::debug!("Dropping outbound {:?}: writer released", line),
        }
    }

    /// Stop the session on purpose. Idempotent; never reports `Disconnected`.
    pub(crate) fn close(&self) {
        let was_active = self
            .lifecycle
            .transition(SessionState::Active, SessionState::Stopped);
        let was_idle = self
            .lifecycle
            .transition(SessionState::Idle, SessionState::Stopped);
        if was_active || was_idle {
            tracing::info!("Closing session");
            self.release();
        }
    }

    /// Report a terminal transport condition. Only the first report of a
    /// session lifetime produces a `Disconnected` event.
    pub(crate) fn fail(&self, reason: DisconnectReason) {
        if !self
            .lifecycle
            .transition(SessionState::Active, SessionState::Stopped)
        {
            tracing::debug!("Ignoring '{}', session already stopped", reason);
            return;
        }

        tracing::warn!("Session lost: {}", reason);
        self.forward(Event::Disconnected { reason });
        self.release();
    }

    fn forward(&self, event: Event) {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        match events.as_ref() {
            Some(tx) => {
                if tx.send(event).is_err() {
                    tracing::debug!("Dispatcher gone, event dropped");
                }
            }
            None => tracing::debug!("Session stopped, dropping {}", event.kind()),
        }
    }

    /// Drop both channel ends and wake the read loop.
    fn release(&self) {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.shutdown.send_replace(true);
    }
}

async fn read_loop<R>(
    transport: Arc<SessionTransport>,
    read_half: R,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;

            _ = shutdown.changed() => {
                tracing::debug!("Read loop observed shutdown");
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => {
                transport.fail(DisconnectReason::EndOfStream);
                break;
            }
            Ok(_) => {
                // Bad bytes are replaced rather than ending the session.
                let line = String::from_utf8_lossy(&buf);
                tracing::trace!("<< {}", line.trim_end());
                match decode(&line) {
                    None => continue,
                    Some(Event::Disconnected { reason }) => {
                        transport.fail(reason);
                        break;
                    }
                    Some(event) => transport.forward(event),
                }
            }
            Err(e) => {
                tracing::error!("Error reading from server: {}", e);
                transport.fail(DisconnectReason::Io(e.to_string()));
                break;
            }
        }
    }
    tracing::info!("Read loop exiting");
}

async fn write_loop<W>(
    transport: Arc<SessionTransport>,
    mut write_half: W,
    mut outbound: mpsc::UnboundedReceiver<String>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outbound.recv().await {
        tracing::trace!(">> {}", line);
        if let Err(e) = write_line(&mut write_half, &line).await {
            tracing::error!("Failed to write to server: {}", e);
            transport.fail(DisconnectReason::Io(e.to_string()));
            break;
        }
    }

    if let Err(e) = write_half.shutdown().await {
        tracing::debug!("Write half shutdown failed: {}", e);
    }
    tracing::info!("Write loop exiting");
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
