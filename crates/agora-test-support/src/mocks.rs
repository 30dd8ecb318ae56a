//! Scripted persistence double.
//!
//! `ScriptedPersistence` records every accepted snapshot, can be told to fail
//! the next saves, and can hold saves open until the test releases them so
//! in-flight behaviour is observable.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use agora_prefs::{PersistenceError, PreferencePersistence, SettingsSnapshot};
use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

/// In-memory persistence backend driven by the test.
#[derive(Default)]
pub struct ScriptedPersistence {
    stored_on_load: Mutex<Option<SettingsSnapshot>>,
    load_failure: Mutex<Option<PersistenceError>>,
    failures: Mutex<VecDeque<PersistenceError>>,
    accepted: Mutex<Vec<SettingsSnapshot>>,
    gate: Option<Semaphore>,
    started: Notify,
}

impl ScriptedPersistence {
    /// Backend that completes saves immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose saves block until [`Self::release`] is called.
    #[must_use]
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    /// Make `load` return `snapshot`.
    #[must_use]
    pub fn with_stored(self, snapshot: SettingsSnapshot) -> Self {
        *lock(&self.stored_on_load) = Some(snapshot);
        self
    }

    /// Make `load` fail with `failure`.
    #[must_use]
    pub fn with_load_failure(self, failure: PersistenceError) -> Self {
        *lock(&self.load_failure) = Some(failure);
        self
    }

    /// Fail the next save with `failure`; queued failures apply in order.
    pub fn fail_next(&self, failure: PersistenceError) {
        lock(&self.failures).push_back(failure);
    }

    /// Let one gated save proceed.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Wait until a save has reached the backend.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Snapshots accepted so far, oldest first.
    #[must_use]
    pub fn accepted(&self) -> Vec<SettingsSnapshot> {
        lock(&self.accepted).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl PreferencePersistence for ScriptedPersistence {
    async fn load(&self) -> Result<Option<SettingsSnapshot>, PersistenceError> {
        if let Some(failure) = lock(&self.load_failure).clone() {
            return Err(failure);
        }
        Ok(lock(&self.stored_on_load).clone())
    }

    async fn store(&self, snapshot: &SettingsSnapshot) -> Result<(), PersistenceError> {
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|err| PersistenceError::Storage {
                    detail: err.to_string(),
                })?
                .forget();
        }
        if let Some(failure) = lock(&self.failures).pop_front() {
            return Err(failure);
        }
        lock(&self.accepted).push(snapshot.clone());
        *lock(&self.stored_on_load) = Some(snapshot.clone());
        Ok(())
    }
}
