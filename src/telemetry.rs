use std::sync::Arc;

/// Structured, in-process event hook for observability.
///
/// This crate is a library; emitting logs directly (e.g. `println!`) is not
/// acceptable for production. Callers can provide an implementation that
/// forwards these events to `tracing`, `log`, metrics, or custom sinks — the
/// demo binary installs one that narrates to stdout.
pub trait StoreEventListener: std::fmt::Debug + Send + Sync + 'static {
    fn on_event(&self, event: StoreEvent);
}

/// Structured events emitted by the store.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    TypeCreated { namespace: String, id: String },
    TypeDeleted { namespace: String, id: String },

    StreamCreated { namespace: String, id: String },
    StreamUpdated { namespace: String, id: String },
    StreamDeleted { namespace: String, id: String },

    BehaviorCreated { namespace: String, id: String },
    BehaviorDeleted { namespace: String, id: String },

    ViewCreated { namespace: String, id: String },
    ViewDeleted { namespace: String, id: String },

    ValuesWritten { namespace: String, stream: String, count: usize },
    ValuesRemoved { namespace: String, stream: String, count: usize },
}

#[derive(Debug)]
pub struct NoopEventListener;

impl StoreEventListener for NoopEventListener {
    #[inline]
    fn on_event(&self, _event: StoreEvent) {}
}

pub fn noop_event_listener() -> Arc<dyn StoreEventListener> {
    Arc::new(NoopEventListener)
}
