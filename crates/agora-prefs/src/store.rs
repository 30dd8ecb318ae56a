//! In-memory preference store with a single-flight save.
//!
//! # Design
//! - Setters apply immediately (optimistic UI) and bump an edit revision when
//!   the value actually changes; `is_dirty` compares it with the revision the
//!   last successful save captured.
//! - `save` captures the snapshot at call time, flips the status to `Saving`,
//!   and awaits the persistence collaborator. That await is the only
//!   suspension point; the state lock is never held across it.
//! - A second `save` during a flight is rejected, never queued.
//! - Edits made during a flight stay visible and dirty for the next save.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use agora_events::PreferenceEvent;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::{FailurePolicy, StoreConfig};
use crate::error::{PersistenceError, PrefsResult, SaveError};
use crate::locale::Locale;
use crate::model::{PreferenceKind, QuietHoursWindow, SettingsSnapshot, TimeOfDay};
use crate::persistence::{PreferencePersistence, SharedPersistence};

/// Save lifecycle state observed by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    /// No save is running; the save control is enabled.
    Idle,
    /// A save is in flight.
    Saving,
}

struct StoreState {
    current: SettingsSnapshot,
    baseline: SettingsSnapshot,
    revision: u64,
    saved_revision: u64,
    saving: bool,
}

struct StoreShared {
    state: Mutex<StoreState>,
    status: watch::Sender<SaveStatus>,
    persistence: SharedPersistence,
    config: StoreConfig,
}

impl StoreShared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: PreferenceEvent) {
        if let Some(bus) = &self.config.events {
            bus.publish(event);
        }
    }

    /// Claim the save slot and capture what this flight will persist.
    ///
    /// The status watch is always written under the state lock so it follows
    /// the `saving` flag in the same order across threads.
    fn begin_save(&self) -> Result<(SettingsSnapshot, u64), SaveError> {
        let captured = {
            let mut state = self.lock();
            if state.saving {
                None
            } else {
                state.saving = true;
                self.status.send_replace(SaveStatus::Saving);
                Some((state.current.clone(), state.revision))
            }
        };
        let Some((snapshot, revision)) = captured else {
            warn!("save rejected; another save is in flight");
            self.publish(PreferenceEvent::SaveRejected);
            return Err(SaveError::SaveInProgress);
        };
        self.publish(PreferenceEvent::SaveStarted { revision });
        debug!(revision, "save started");
        Ok((snapshot, revision))
    }

    fn finish_save(
        &self,
        snapshot: SettingsSnapshot,
        revision: u64,
        outcome: Result<(), PersistenceError>,
    ) -> Result<(), SaveError> {
        match outcome {
            Ok(()) => {
                let still_dirty = {
                    let mut state = self.lock();
                    state.saving = false;
                    state.baseline = snapshot;
                    state.saved_revision = revision;
                    self.status.send_replace(SaveStatus::Idle);
                    state.revision != revision
                };
                self.publish(PreferenceEvent::SaveSucceeded { revision });
                info!(revision, still_dirty, "preferences saved");
                Ok(())
            }
            Err(reason) => {
                let rolled_back = {
                    let mut state = self.lock();
                    state.saving = false;
                    self.status.send_replace(SaveStatus::Idle);
                    match self.config.failure_policy {
                        FailurePolicy::KeepEdits => false,
                        FailurePolicy::RollbackToBaseline => {
                            state.current = state.baseline.clone();
                            state.saved_revision = state.revision;
                            true
                        }
                    }
                };
                self.publish(PreferenceEvent::SaveFailed {
                    revision,
                    reason: reason.to_string(),
                });
                if rolled_back {
                    self.publish(PreferenceEvent::RolledBack { revision });
                }
                warn!(revision, error = %reason, rolled_back, "preferences save failed");
                Err(SaveError::SaveFailed { reason })
            }
        }
    }
}

/// Releases the save slot if a flight ends without reaching `finish_save`
/// (for example when the `save` future is dropped mid-await).
struct FlightGuard {
    shared: Weak<StoreShared>,
    armed: bool,
}

impl FlightGuard {
    fn new(shared: &Arc<StoreShared>) -> Self {
        Self {
            shared: Arc::downgrade(shared),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            let mut state = shared.lock();
            state.saving = false;
            shared.status.send_replace(SaveStatus::Idle);
            drop(state);
            warn!("save abandoned before completion");
        }
    }
}

async fn persist(
    persistence: &dyn PreferencePersistence,
    snapshot: &SettingsSnapshot,
    timeout: Option<Duration>,
) -> Result<(), PersistenceError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, persistence.store(snapshot))
            .await
            .unwrap_or(Err(PersistenceError::Timeout)),
        None => persistence.store(snapshot).await,
    }
}

/// Owned preference state for one signed-in user.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct PreferenceStore {
    shared: Arc<StoreShared>,
}

impl PreferenceStore {
    /// Store seeded with account defaults for the configured device locale.
    #[must_use]
    pub fn new(persistence: SharedPersistence, config: StoreConfig) -> Self {
        let snapshot = SettingsSnapshot::defaults(config.locale.device());
        Self::with_snapshot(snapshot, persistence, config)
    }

    /// Store whose current state and committed baseline are `snapshot`.
    #[must_use]
    pub fn with_snapshot(
        snapshot: SettingsSnapshot,
        persistence: SharedPersistence,
        config: StoreConfig,
    ) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        let state = StoreState {
            baseline: snapshot.clone(),
            current: snapshot,
            revision: 0,
            saved_revision: 0,
            saving: false,
        };
        Self {
            shared: Arc::new(StoreShared {
                state: Mutex::new(state),
                status,
                persistence,
                config,
            }),
        }
    }

    /// Build a store from the persisted copy, falling back to defaults when
    /// nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's failure when the stored copy cannot be read.
    #[instrument(name = "preference_store.hydrate", skip_all)]
    pub async fn hydrate(
        persistence: SharedPersistence,
        config: StoreConfig,
    ) -> Result<Self, PersistenceError> {
        let snapshot = match persistence.load().await? {
            Some(snapshot) => {
                info!("loaded stored preferences");
                snapshot
            }
            None => {
                info!(locale = %config.locale.device(), "no stored preferences; using defaults");
                SettingsSnapshot::defaults(config.locale.device())
            }
        };
        Ok(Self::with_snapshot(snapshot, persistence, config))
    }

    /// Current in-memory state.
    #[must_use]
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.shared.lock().current.clone()
    }

    /// Snapshot committed by the last successful save (or the initial state).
    #[must_use]
    pub fn baseline(&self) -> SettingsSnapshot {
        self.shared.lock().baseline.clone()
    }

    /// Whether edits exist that no successful save has covered.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let state = self.shared.lock();
        state.revision != state.saved_revision
    }

    /// Current save lifecycle state.
    #[must_use]
    pub fn status(&self) -> SaveStatus {
        *self.shared.status.borrow()
    }

    /// Watch the save lifecycle state.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.shared.status.subscribe()
    }

    /// Locale the rendering layer should use.
    #[must_use]
    pub fn locale(&self) -> Locale {
        self.shared.lock().current.locale.selected
    }

    /// Locales a picker may offer.
    #[must_use]
    pub fn supported_locales(&self) -> &'static [Locale] {
        self.shared.config.locale.supported()
    }

    fn apply(&self, field: &str, edit: impl FnOnce(&mut SettingsSnapshot) -> bool) -> bool {
        let changed = {
            let mut state = self.shared.lock();
            let changed = edit(&mut state.current);
            if changed {
                state.revision += 1;
            }
            changed
        };
        if changed {
            debug!(field, "preference edited");
            self.shared.publish(PreferenceEvent::PreferenceEdited {
                field: field.to_string(),
            });
        }
        changed
    }

    /// Toggle one notification kind; returns whether the snapshot changed.
    pub fn set_preference_enabled(&self, id: PreferenceKind, enabled: bool) -> bool {
        self.apply(id.as_str(), |snapshot| {
            snapshot.notifications.set(id, enabled)
        })
    }

    /// Toggle a notification kind by wire identifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PrefsError::UnknownPreferenceId`] for identifiers outside
    /// the six known kinds; the snapshot is left untouched.
    pub fn set_preference_enabled_by_id(&self, id: &str, enabled: bool) -> PrefsResult<bool> {
        let kind = id.parse::<PreferenceKind>().inspect_err(|_| {
            debug!(id, "ignoring edit for unknown preference id");
        })?;
        Ok(self.set_preference_enabled(kind, enabled))
    }

    /// Toggle audible alerts; returns whether the snapshot changed.
    pub fn set_sound_enabled(&self, enabled: bool) -> bool {
        self.apply("sound", |snapshot| {
            let changed = snapshot.sound.enabled != enabled;
            snapshot.sound.enabled = enabled;
            changed
        })
    }

    /// Replace the quiet-hours window; returns whether the snapshot changed.
    pub fn set_quiet_hours(&self, enabled: bool, start: TimeOfDay, end: TimeOfDay) -> bool {
        let window = QuietHoursWindow {
            enabled,
            start,
            end,
        };
        self.apply("quiet_hours", |snapshot| {
            let changed = snapshot.quiet_hours != window;
            snapshot.quiet_hours = window;
            changed
        })
    }

    /// Select the UI locale; returns whether the snapshot changed.
    pub fn set_locale(&self, locale: Locale) -> bool {
        self.apply("locale", |snapshot| {
            let changed = snapshot.locale.selected != locale;
            snapshot.locale.selected = locale;
            changed
        })
    }

    /// Replace the snapshot with account defaults; returns whether it changed.
    pub fn reset_to_defaults(&self) -> bool {
        let defaults = SettingsSnapshot::defaults(self.shared.config.locale.device());
        let changed = self.apply("all", |snapshot| {
            let changed = *snapshot != defaults;
            *snapshot = defaults;
            changed
        });
        if changed {
            self.shared.publish(PreferenceEvent::ResetToDefaults);
        }
        changed
    }

    /// Persist the current snapshot.
    ///
    /// The snapshot is captured when this is called; edits made while the
    /// save is in flight go into the next save.
    ///
    /// # Errors
    ///
    /// - [`SaveError::SaveInProgress`] if another save is in flight.
    /// - [`SaveError::SaveFailed`] if the persistence collaborator fails; local
    ///   edits are kept unless the store uses [`FailurePolicy::RollbackToBaseline`].
    #[instrument(name = "preference_store.save", skip(self))]
    pub async fn save(&self) -> Result<(), SaveError> {
        let (snapshot, revision) = self.shared.begin_save()?;
        let guard = FlightGuard::new(&self.shared);
        let outcome = persist(
            self.shared.persistence.as_ref(),
            &snapshot,
            self.shared.config.save_timeout,
        )
        .await;
        guard.disarm();
        self.shared.finish_save(snapshot, revision, outcome)
    }

    /// Run a save on a detached task that does not keep the store alive.
    ///
    /// The flight is claimed before this returns. If every store handle is
    /// dropped before the collaborator answers, the result is discarded and
    /// the task yields [`SaveError::StoreClosed`].
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::SaveInProgress`] if another save is in flight.
    pub fn spawn_save(&self) -> Result<JoinHandle<Result<(), SaveError>>, SaveError> {
        let (snapshot, revision) = self.shared.begin_save()?;
        let guard = FlightGuard::new(&self.shared);
        let shared = Arc::downgrade(&self.shared);
        let persistence = Arc::clone(&self.shared.persistence);
        let timeout = self.shared.config.save_timeout;

        Ok(tokio::spawn(async move {
            let outcome = persist(persistence.as_ref(), &snapshot, timeout).await;
            guard.disarm();
            match shared.upgrade() {
                Some(shared) => shared.finish_save(snapshot, revision, outcome),
                None => {
                    info!(revision, "preference store closed; discarding save result");
                    Err(SaveError::StoreClosed)
                }
            }
        }))
    }
}
