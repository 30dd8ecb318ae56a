//! Typed preference models.
//!
//! # Design
//! - Pure data carriers; the store owns mutation and dirty tracking.
//! - The notification set always holds the six known kinds in canonical order,
//!   and deserialization refuses payloads that break that.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{PrefsError, PrefsResult};
use crate::locale::Locale;

/// Notification categories a user can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceKind {
    /// Votes on the user's submissions.
    Votes,
    /// Comments on the user's submissions.
    Comments,
    /// Status changes of followed items.
    StatusChanges,
    /// Reminders the user scheduled.
    Reminders,
    /// Upcoming deadlines.
    Deadlines,
    /// Weekly summary email.
    WeeklyDigest,
}

impl PreferenceKind {
    /// Every kind in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Votes,
        Self::Comments,
        Self::StatusChanges,
        Self::Reminders,
        Self::Deadlines,
        Self::WeeklyDigest,
    ];

    /// Stable identifier used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Votes => "votes",
            Self::Comments => "comments",
            Self::StatusChanges => "status_changes",
            Self::Reminders => "reminders",
            Self::Deadlines => "deadlines",
            Self::WeeklyDigest => "weekly_digest",
        }
    }

    /// Whether a fresh account receives this kind.
    #[must_use]
    pub const fn enabled_by_default(self) -> bool {
        !matches!(self, Self::WeeklyDigest)
    }
}

impl Display for PreferenceKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for PreferenceKind {
    type Err = PrefsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| PrefsError::UnknownPreferenceId {
                id: value.to_string(),
            })
    }
}

/// A single notification toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    /// Which notification kind this toggle controls.
    pub id: PreferenceKind,
    /// Whether notifications of this kind are delivered.
    pub enabled: bool,
}

/// The fixed set of notification toggles, one per [`PreferenceKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<NotificationPreference>",
    into = "Vec<NotificationPreference>"
)]
pub struct NotificationSet(Vec<NotificationPreference>);

impl NotificationSet {
    fn defaults() -> Self {
        Self(
            PreferenceKind::ALL
                .into_iter()
                .map(|id| NotificationPreference {
                    id,
                    enabled: id.enabled_by_default(),
                })
                .collect(),
        )
    }

    /// Toggles in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &NotificationPreference> {
        self.0.iter()
    }

    /// Whether the given kind is enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: PreferenceKind) -> bool {
        self.0
            .iter()
            .any(|preference| preference.id == kind && preference.enabled)
    }

    /// Update one toggle; returns whether the value changed.
    pub(crate) fn set(&mut self, kind: PreferenceKind, enabled: bool) -> bool {
        match self.0.iter_mut().find(|preference| preference.id == kind) {
            Some(preference) if preference.enabled != enabled => {
                preference.enabled = enabled;
                true
            }
            _ => false,
        }
    }
}

impl TryFrom<Vec<NotificationPreference>> for NotificationSet {
    type Error = PrefsError;

    fn try_from(mut preferences: Vec<NotificationPreference>) -> PrefsResult<Self> {
        preferences.sort_by_key(|preference| preference.id);
        if let Some(pair) = preferences.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(PrefsError::InvalidNotificationSet {
                detail: format!("duplicate id '{}'", pair[0].id),
            });
        }
        if let Some(missing) = PreferenceKind::ALL
            .into_iter()
            .find(|kind| !preferences.iter().any(|preference| preference.id == *kind))
        {
            return Err(PrefsError::InvalidNotificationSet {
                detail: format!("missing id '{missing}'"),
            });
        }
        Ok(Self(preferences))
    }
}

impl From<NotificationSet> for Vec<NotificationPreference> {
    fn from(set: NotificationSet) -> Self {
        set.0
    }
}

/// Local time of day with minute precision and no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Build a time of day, rejecting out-of-range components.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::InvalidTimeOfDay`] when `hour > 23` or `minute > 59`.
    pub fn new(hour: u8, minute: u8) -> PrefsResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(PrefsError::InvalidTimeOfDay {
                value: format!("{hour}:{minute:02}"),
            });
        }
        Ok(Self { hour, minute })
    }

    const fn raw(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    /// Hour component (0-23).
    #[must_use]
    pub const fn hour(self) -> u8 {
        self.hour
    }

    /// Minute component (0-59).
    #[must_use]
    pub const fn minute(self) -> u8 {
        self.minute
    }

    /// Minutes elapsed since midnight.
    #[must_use]
    pub const fn minutes_since_midnight(self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        // chrono guarantees hour < 24 and minute < 60.
        Self::raw(time.hour() as u8, time.minute() as u8)
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = PrefsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || PrefsError::InvalidTimeOfDay {
            value: value.to_string(),
        };
        let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
        if minute.len() != 2 {
            return Err(invalid());
        }
        let hour = hour.parse::<u8>().map_err(|_| invalid())?;
        let minute = minute.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = PrefsError;

    fn try_from(value: String) -> PrefsResult<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// Window during which notifications are silenced.
///
/// `start` and `end` are independent; an `end` before `start` wraps past
/// midnight and `start == end` is an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHoursWindow {
    /// Whether the window is active.
    pub enabled: bool,
    /// Inclusive start of the window.
    pub start: TimeOfDay,
    /// Exclusive end of the window.
    pub end: TimeOfDay,
}

impl QuietHoursWindow {
    /// Default window start (22:00).
    pub const DEFAULT_START: TimeOfDay = TimeOfDay::raw(22, 0);
    /// Default window end (07:00).
    pub const DEFAULT_END: TimeOfDay = TimeOfDay::raw(7, 0);

    /// Whether the window is active and covers `at`.
    #[must_use]
    pub const fn contains(&self, at: TimeOfDay) -> bool {
        if !self.enabled {
            return false;
        }
        let start = self.start.minutes_since_midnight();
        let end = self.end.minutes_since_midnight();
        let at = at.minutes_since_midnight();
        if start <= end {
            start <= at && at < end
        } else {
            at >= start || at < end
        }
    }

    /// Whether the window crosses midnight.
    #[must_use]
    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }
}

impl Default for QuietHoursWindow {
    fn default() -> Self {
        Self {
            enabled: false,
            start: Self::DEFAULT_START,
            end: Self::DEFAULT_END,
        }
    }
}

/// Global toggle for audible alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundSetting {
    /// Whether notifications play a sound.
    pub enabled: bool,
}

impl Default for SoundSetting {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Selected UI locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocaleSelection {
    /// The single selected locale.
    pub selected: Locale,
}

/// Complete settings state at a point in time; saved as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// Notification toggles in canonical order.
    pub notifications: NotificationSet,
    /// Audible alert toggle.
    pub sound: SoundSetting,
    /// Quiet-hours window.
    pub quiet_hours: QuietHoursWindow,
    /// Selected locale.
    pub locale: LocaleSelection,
}

impl SettingsSnapshot {
    /// Defaults for a freshly created account.
    #[must_use]
    pub fn defaults(locale: Locale) -> Self {
        Self {
            notifications: NotificationSet::defaults(),
            sound: SoundSetting::default(),
            quiet_hours: QuietHoursWindow::default(),
            locale: LocaleSelection { selected: locale },
        }
    }

    /// Whether the given notification kind is enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: PreferenceKind) -> bool {
        self.notifications.is_enabled(kind)
    }
}
