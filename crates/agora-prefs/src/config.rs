//! Store configuration.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use agora_events::EventBus;
use serde::{Deserialize, Serialize};

use crate::locale::LocaleContext;

/// What happens to local edits when a save fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep edits visible and dirty so the caller can retry.
    #[default]
    KeepEdits,
    /// Restore the last committed baseline and discard local edits.
    RollbackToBaseline,
}

/// Knobs and collaborators for a [`crate::PreferenceStore`].
#[derive(Clone, Default)]
pub struct StoreConfig {
    /// Policy applied after a failed save.
    pub failure_policy: FailurePolicy,
    /// Upper bound on a single persistence call; `None` waits indefinitely.
    pub save_timeout: Option<Duration>,
    /// Device locale used for default snapshots.
    pub locale: LocaleContext,
    /// Optional bus receiving edit and save lifecycle events.
    pub events: Option<EventBus>,
}

impl StoreConfig {
    /// Replace the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Bound each persistence call by `timeout`.
    #[must_use]
    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout = Some(timeout);
        self
    }

    /// Use the given locale context for defaults.
    #[must_use]
    pub fn with_locale(mut self, locale: LocaleContext) -> Self {
        self.locale = locale;
        self
    }

    /// Publish store events to `bus`.
    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }
}

impl Debug for StoreConfig {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StoreConfig")
            .field("failure_policy", &self.failure_policy)
            .field("save_timeout", &self.save_timeout)
            .field("locale", &self.locale)
            .field("events", &self.events.is_some())
            .finish()
    }
}
