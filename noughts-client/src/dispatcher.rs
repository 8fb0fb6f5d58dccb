use std::fmt;
use std::sync::Arc;

use noughts_protocol::Event;
use tokio::sync::mpsc;

use crate::registry::ListenerRegistry;

/// Delivers decoded events, in arrival order, to the current listener.
///
/// Whichever task drives the dispatcher is the delivery context: every
/// listener callback runs there, one event at a time. A UI loop can host it by
/// calling [`dispatch_next`](Self::dispatch_next) from its own `select!`, or the
/// dispatcher can own a task through [`run`](Self::run).
pub struct EventDispatcher {
    events: mpsc::UnboundedReceiver<Event>,
    registry: Arc<ListenerRegistry>,
}

impl EventDispatcher {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<Event>,
        registry: Arc<ListenerRegistry>,
    ) -> Self {
        Self { events, registry }
    }

    /// Wait for the next event and deliver it. Returns false once the session
    /// has stopped and every pending event has been delivered.
    pub async fn dispatch_next(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.deliver(event);
                true
            }
            None => false,
        }
    }

    /// Deliver everything already queued without waiting (non-blocking).
    pub fn try_dispatch(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.events.try_recv() {
            self.deliver(event);
            delivered += 1;
        }
        delivered
    }

    pub async fn run(mut self) {
        while self.dispatch_next().await {}
        tracing::info!("Event dispatcher exiting");
    }

    fn deliver(&self, event: Event) {
        match self.registry.get() {
            Some(listener) => {
                tracing::trace!("Delivering {}", event.kind());
                listener.on_event(event);
            }
            None => tracing::debug!("No listener attached, dropping {}", event.kind()),
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listener_attached", &self.registry.get().is_some())
            .finish_non_exhaustive()
    }
}
