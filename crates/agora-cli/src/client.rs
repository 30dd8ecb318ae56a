//! CLI error type and persistence backend wiring.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use agora_client::HttpPreferencePersistence;
use agora_prefs::{
    DelayedNoopPersistence, FailurePolicy, JsonFilePersistence, LocaleContext, PreferenceStore,
    SaveError, SharedPersistence, StoreConfig,
};
use anyhow::anyhow;
use clap::ValueEnum;

use crate::cli::Cli;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<SaveError> for CliError {
    fn from(err: SaveError) -> Self {
        Self::failure(anyhow::Error::new(err).context("failed to save preferences"))
    }
}

/// Where preferences are loaded from and saved to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackendKind {
    /// Local JSON file.
    #[default]
    File,
    /// Agora API over HTTP.
    Http,
    /// Accept saves after a short delay without storing anything.
    Noop,
}

/// Dependencies shared by every command handler.
pub(crate) struct AppContext {
    pub(crate) persistence: SharedPersistence,
    pub(crate) config: StoreConfig,
}

impl AppContext {
    /// Build the persistence backend and store configuration from CLI flags.
    pub(crate) fn from_cli(cli: &Cli) -> CliResult<Self> {
        let timeout = Duration::from_secs(cli.timeout);
        let persistence: SharedPersistence = match cli.backend {
            BackendKind::File => Arc::new(JsonFilePersistence::new(&cli.prefs_file)),
            BackendKind::Http => Arc::new(
                HttpPreferencePersistence::new(&cli.api_url, cli.api_key.clone(), timeout)
                    .map_err(|err| CliError::failure(anyhow!(err)))?,
            ),
            BackendKind::Noop => Arc::new(DelayedNoopPersistence::default()),
        };

        let policy = if cli.rollback_on_failure {
            FailurePolicy::RollbackToBaseline
        } else {
            FailurePolicy::KeepEdits
        };
        let config = StoreConfig::default()
            .with_failure_policy(policy)
            .with_save_timeout(timeout)
            .with_locale(LocaleContext::from_env());

        Ok(Self {
            persistence,
            config,
        })
    }

    /// Load the stored preferences into a fresh store.
    pub(crate) async fn hydrate(&self) -> CliResult<PreferenceStore> {
        PreferenceStore::hydrate(Arc::clone(&self.persistence), self.config.clone())
            .await
            .map_err(|err| {
                CliError::failure(anyhow::Error::new(err).context("failed to load preferences"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_prefs::PersistenceError;
    use clap::Parser;

    #[test]
    fn exit_codes_distinguish_validation_from_failure() {
        assert_eq!(CliError::validation("bad kind").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn save_errors_render_their_cause_chain() {
        let err = CliError::from(SaveError::SaveFailed {
            reason: PersistenceError::Timeout,
        });
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.display_message(),
            "failed to save preferences: save failed: persistence timed out"
        );
    }

    #[test]
    fn rollback_flag_selects_rollback_policy() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["agora", "--backend", "noop", "--rollback-on-failure", "reset"])?;
        let ctx = AppContext::from_cli(&cli).map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(ctx.config.failure_policy, FailurePolicy::RollbackToBaseline);
        assert_eq!(ctx.config.save_timeout, Some(Duration::from_secs(10)));
        Ok(())
    }
}
