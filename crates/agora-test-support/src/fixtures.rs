//! Small builders for preference values.

use agora_prefs::{
    Locale, NotificationPreference, NotificationSet, PreferenceKind, SettingsSnapshot, TimeOfDay,
};

/// Build a time of day, panicking on out-of-range input.
///
/// # Panics
///
/// Panics when `hour > 23` or `minute > 59`.
#[must_use]
pub fn hm(hour: u8, minute: u8) -> TimeOfDay {
    match TimeOfDay::new(hour, minute) {
        Ok(time) => time,
        Err(err) => panic!("invalid fixture time {hour}:{minute}: {err}"),
    }
}

/// Defaults for an English-speaking account.
#[must_use]
pub fn english_defaults() -> SettingsSnapshot {
    SettingsSnapshot::defaults(Locale::English)
}

/// A snapshot that differs from defaults in every section: comments off,
/// weekly digest on, sound off, quiet hours 23:00-06:30, French.
///
/// # Panics
///
/// Never in practice; the notification list always covers every kind.
#[must_use]
pub fn customized_snapshot() -> SettingsSnapshot {
    let notifications: Vec<_> = PreferenceKind::ALL
        .into_iter()
        .map(|id| NotificationPreference {
            id,
            enabled: id != PreferenceKind::Comments,
        })
        .collect();
    let notifications = match NotificationSet::try_from(notifications) {
        Ok(set) => set,
        Err(err) => panic!("fixture notification set invalid: {err}"),
    };

    let mut snapshot = english_defaults();
    snapshot.notifications = notifications;
    snapshot.sound.enabled = false;
    snapshot.quiet_hours.enabled = true;
    snapshot.quiet_hours.start = hm(23, 0);
    snapshot.quiet_hours.end = hm(6, 30);
    snapshot.locale.selected = Locale::French;
    snapshot
}
