//! Destinations for sync events

use replisync_types::{EventKind, SyncEvent};
use std::sync::Mutex;
use tracing::{error, info};

/// Receives each event as soon as it happens
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn emit(&self, event: &SyncEvent);
}

/// Writes events through `tracing`
///
/// `Error` events go out at error level, everything else at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SyncEvent) {
        let kind = event.kind.to_string();
        let path = event.path.to_string();
        if event.kind == EventKind::Error {
            error!(kind = %kind, path = %path, "{}", event);
        } else {
            info!(kind = %kind, path = %path, "{}", event);
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
