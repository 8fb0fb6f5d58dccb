use std::fmt;
use std::sync::Arc;

use noughts_protocol::{encode, Command};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::dispatcher::EventDispatcher;
use crate::error::{ClientError, ClientResult};
use crate::registry::ListenerRegistry;
use crate::traits::{CommandSink, EventListener};
use crate::transport::{SessionState, SessionTransport};

/// Cheap, cloneable handle to one live connection.
///
/// Screens receive a clone when they are constructed and use it to attach
/// themselves as the listener and to send commands. The connection is closed
/// when [`close`](Self::close) is called or the last handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Arc<SessionTransport>,
    registry: Arc<ListenerRegistry>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.transport.close();
    }
}

impl SessionHandle {
    /// Connect to the server at `addr` (`host:port`).
    #[tracing::instrument(level = "info")]
    pub async fn connect(addr: &str) -> ClientResult<(Self, EventDispatcher)> {
        if addr.trim().is_empty() {
            return Err(ClientError::InvalidAddress(addr.to_string()));
        }

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not disable Nagle: {}", e);
        }

        tracing::info!("Connected to {}", addr);
        Ok(Self::from_stream(stream))
    }

    /// Start a session over an already connected stream. Must be called from
    /// within a tokio runtime.
    pub fn from_stream<S>(stream: S) -> (Self, EventDispatcher)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(ListenerRegistry::new());
        let transport = SessionTransport::start(stream, event_tx);
        let dispatcher = EventDispatcher::new(event_rx, registry.clone());

        let handle = Self {
            inner: Arc::new(SessionInner {
                transport,
                registry,
            }),
        };
        (handle, dispatcher)
    }

    /// Fire-and-forget. Dropped with a log line if the session is not active.
    pub fn send(&self, command: Command) {
        tracing::debug!("Sending {:?}", command);
        self.inner.transport.send(encode(&command));
    }

    pub fn set_listener<L>(&self, listener: &Arc<L>)
    where
        L: EventListener + 'static,
    {
        self.inner.registry.set(listener);
    }

    pub fn clear_listener(&self) {
        self.inner.registry.clear();
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.inner.registry
    }

    pub fn state(&self) -> SessionState {
        self.inner.transport.state()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn close(&self) {
        self.inner.transport.close();
    }
}

impl CommandSink for SessionHandle {
    fn send(&self, command: Command) {
        SessionHandle::send(self, command);
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noughts_protocol::{DisconnectReason, Event};
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Stream whose reads and writes all fail.
    struct BrokenStream {
        failures: Arc<AtomicUsize>,
    }

    impl BrokenStream {
        fn fail(&self, kind: io::ErrorKind) -> io::Error {
            self.failures.fetch_add(1, Ordering::SeqCst);
            io::Error::new(kind, "connection broken")
        }
    }

    impl AsyncRead for BrokenStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(self.fail(io::ErrorKind::ConnectionReset)))
        }
    }

    impl AsyncWrite for BrokenStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(self.fail(io::ErrorKind::BrokenPipe)))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[derive(Default)]
    struct Collector(Mutex<Vec<Event>>);

    impl EventListener for Collector {
        fn on_event(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn connect_rejects_empty_address() {
        let err = SessionHandle::connect("  ").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = SessionHandle::connect(&addr).await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }

    #[tokio::test]
    async fn broken_stream_delivers_one_disconnect() {
        let failures = Arc::new(AtomicUsize::new(0));
        let (session, mut dispatcher) = SessionHandle::from_stream(BrokenStream {
            failures: failures.clone(),
        });
        let collector = Arc::new(Collector::default());
        session.set_listener(&collector);

        for _ in 0..3 {
            session.send(Command::RequestList);
        }
        while dispatcher.dispatch_next().await {}
        session.close();

        let events = collector.0.lock().unwrap().clone();
        let disconnects: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::Disconnected { .. }))
            .collect();
        assert_eq!(
            disconnects,
            vec![&Event::Disconnected {
                reason: DisconnectReason::Io("connection broken".into())
            }]
        );
        assert!(failures.load(Ordering::SeqCst) >= 1);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn dropping_last_handle_closes_session() {
        let (client, _server) = tokio::io::duplex(256);
        let (handle, mut dispatcher) = SessionHandle::from_stream(client);
        let clone = handle.clone();
        drop(handle);
        assert!(clone.is_active());
        drop(clone);

        // ConnectionEstablished, then the channel closes without a disconnect.
        assert!(dispatcher.dispatch_next().await);
        assert!(!dispatcher.dispatch_next().await);
    }
}
