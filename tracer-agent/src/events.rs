//! Lifecycle event notification.
//!
//! Observers are attached with `add_listener` and detached by the returned id.
//! Events are delivered synchronously on the thread that caused them, so
//! listeners should return quickly.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::alarm::WakePolicy;

/// How samples are being acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    Active,
    Passive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TracerEvent {
    ListeningStarted {
        mode: SamplingMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        active_request_interval_ms: Option<u64>,
    },
    ListeningStopped,
    ReportingStarted {
        interval_ms: u64,
        wake: WakePolicy,
    },
    ReportingStopped {
        flushed_remaining: bool,
    },
    Flushed {
        reported: usize,
        confirmed: usize,
        remaining: usize,
    },
    ActiveRequestIssued {
        provider: String,
    },
}

/// Passive observer of tracer lifecycle events.
pub trait TracerEventListener: Send + Sync {
    fn on_event(&self, event: &TracerEvent);
}

#[derive(Default)]
pub struct EventHub {
    listeners: DashMap<String, Arc<dyn TracerEventListener>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
        }
    }

    /// Attach a listener and return its id.
    pub fn add_listener(&self, listener: Arc<dyn TracerEventListener>) -> String {
        let id = Uuid::new_v4().to_string();
        self.listeners.insert(id.clone(), listener);
        log::debug!("[EVENTS] Listener {} added", id);
        id
    }

    /// Detach a listener. Returns false if the id was unknown.
    pub fn remove_listener(&self, id: &str) -> bool {
        let removed = self.listeners.remove(id).is_some();
        if removed {
            log::debug!("[EVENTS] Listener {} removed", id);
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&self, event: &TracerEvent) {
        // Clone out first so a listener may add/remove listeners without deadlocking
        let listeners: Vec<Arc<dyn TracerEventListener>> =
            self.listeners.iter().map(|entry| entry.value().clone()).collect();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}
