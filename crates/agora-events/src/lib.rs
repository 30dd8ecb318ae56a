//! Preference event bus for the Agora workspace.
//!
//! The bus carries save-lifecycle and edit notifications from the preference
//! store to whoever renders it. Events get sequential identifiers and a
//! timestamp; a bounded replay ring lets late subscribers catch up from a
//! known id. Internally it uses `tokio::broadcast`; when the channel overflows
//! the oldest events are dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Identifier assigned to each published event.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Notifications emitted by the preference store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreferenceEvent {
    /// A setter changed the in-memory snapshot.
    PreferenceEdited {
        /// Field that changed (e.g. `votes`, `sound`, `quiet_hours`, `locale`).
        field: String,
    },
    /// A save began for the given edit revision.
    SaveStarted { revision: u64 },
    /// The persistence collaborator accepted the snapshot.
    SaveSucceeded { revision: u64 },
    /// The persistence collaborator rejected or failed the snapshot.
    SaveFailed { revision: u64, reason: String },
    /// A save was requested while another one was in flight.
    SaveRejected,
    /// Local edits were discarded in favour of the committed baseline.
    RolledBack { revision: u64 },
    /// The snapshot was reset to account defaults.
    ResetToDefaults,
}

impl PreferenceEvent {
    /// Machine-friendly discriminator for consumers that filter by kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PreferenceEdited { .. } => "preference_edited",
            Self::SaveStarted { .. } => "save_started",
            Self::SaveSucceeded { .. } => "save_succeeded",
            Self::SaveFailed { .. } => "save_failed",
            Self::SaveRejected => "save_rejected",
            Self::RolledBack { .. } => "rolled_back",
            Self::ResetToDefaults => "reset_to_defaults",
        }
    }
}

/// Metadata wrapper around events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub event: PreferenceEvent,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// The broadcast channel and the replay ring share the capacity so dropped
    /// events affect both consistently. A zero capacity is bumped to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default replay size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish an event, assigning it the next sequential identifier.
    pub fn publish(&self, event: PreferenceEvent) -> EventId {
        // Id assignment, the ring push and the live send all happen under the
        // buffer lock, so `subscribe` sees each event either in its backlog or
        // on its receiver, never both.
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        if buffer.len() == self.replay_capacity {
            buffer.pop_front();
        }
        buffer.push_back(envelope.clone());

        // No live subscribers is not an error; the replay ring still has it.
        let _ = self.sender.send(envelope);
        drop(buffer);
        id
    }

    /// Subscribe to the bus, replaying buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        // Holding the lock excludes `publish`, so the backlog and the live
        // receiver split the sequence at a single id.
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(since) = since_id {
            backlog.extend(buffer.iter().filter(|item| item.id > since).cloned());
        }
        let receiver = self.sender.subscribe();
        drop(buffer);
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if anything has been published.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.back().map(|event| event.id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream that yields events from the replay backlog first, then live.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Return the next event if one is immediately available.
    pub fn try_next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }
}
