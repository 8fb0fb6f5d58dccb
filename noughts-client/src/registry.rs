use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::traits::EventListener;

/// Single swappable slot holding the current event listener.
///
/// The registry keeps a [`Weak`] reference: the screen that created a listener
/// owns it, and a dropped listener simply reads as "no listener".
#[derive(Default)]
pub struct ListenerRegistry {
    slot: RwLock<Option<Weak<dyn EventListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current listener.
    pub fn set<L>(&self, listener: &Arc<L>)
    where
        L: EventListener + 'static,
    {
        let listener: Arc<dyn EventListener> = listener.clone();
        let weak = Arc::downgrade(&listener);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(weak);
        tracing::debug!("Listener replaced");
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::debug!("Listener cleared");
    }

    /// Snapshot of the listener current at call time.
    pub fn get(&self) -> Option<Arc<dyn EventListener>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }
}
