#![forbid(unsafe_code)]
#![deny(
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! User preference state for the Agora app.
//!
//! Layout: `model.rs` (snapshot types and defaults), `locale.rs` (locale
//! selection and device detection), `error.rs` (edit/save/persistence errors),
//! `persistence.rs` (collaborator trait plus no-op and JSON file backends),
//! `config.rs` (store configuration), `store.rs` (`PreferenceStore` with the
//! single-flight save).

pub mod config;
pub mod error;
pub mod locale;
pub mod model;
pub mod persistence;
pub mod store;

pub use config::{FailurePolicy, StoreConfig};
pub use error::{PersistenceError, PrefsError, PrefsResult, SaveError};
pub use locale::{DEFAULT_LOCALE, Locale, LocaleContext};
pub use model::{
    LocaleSelection, NotificationPreference, NotificationSet, PreferenceKind, QuietHoursWindow,
    SettingsSnapshot, SoundSetting, TimeOfDay,
};
pub use persistence::{
    DelayedNoopPersistence, JsonFilePersistence, PreferencePersistence, SharedPersistence,
};
pub use store::{PreferenceStore, SaveStatus};
