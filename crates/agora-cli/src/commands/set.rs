use std::io::Write;

use agora_prefs::{PreferenceKind, PreferenceStore, PrefsError};
use tracing::{info, instrument};

use crate::cli::SetArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::write_line;

#[instrument(name = "cli.set", skip_all)]
pub(crate) async fn handle_set(
    ctx: &AppContext,
    args: SetArgs,
    out: &mut impl Write,
) -> CliResult<()> {
    let store = ctx.hydrate().await?;
    apply_edits(&store, &args)?;

    if !store.is_dirty() {
        return write_line(out, "Nothing to save.");
    }
    store.save().await?;
    info!("preferences saved");
    write_line(out, "Preferences saved.")
}

/// Apply every requested edit through the store setters.
///
/// Unknown kinds are rejected before any edit lands.
pub(crate) fn apply_edits(store: &PreferenceStore, args: &SetArgs) -> CliResult<()> {
    for id in args.enable.iter().chain(&args.disable) {
        id.parse::<PreferenceKind>().map_err(invalid_kind)?;
    }
    for id in &args.enable {
        store
            .set_preference_enabled_by_id(id, true)
            .map_err(invalid_kind)?;
    }
    for id in &args.disable {
        store
            .set_preference_enabled_by_id(id, false)
            .map_err(invalid_kind)?;
    }

    if let Some(sound) = args.sound {
        store.set_sound_enabled(sound.enabled());
    }

    if args.quiet_hours.is_some() || args.quiet_start.is_some() || args.quiet_end.is_some() {
        let current = store.snapshot().quiet_hours;
        store.set_quiet_hours(
            args.quiet_hours.map_or(current.enabled, |toggle| toggle.enabled()),
            args.quiet_start.unwrap_or(current.start),
            args.quiet_end.unwrap_or(current.end),
        );
    }

    if let Some(locale) = args.locale {
        store.set_locale(locale);
    }
    Ok(())
}

fn invalid_kind(err: PrefsError) -> CliError {
    let known: Vec<_> = PreferenceKind::ALL.iter().map(|kind| kind.as_str()).collect();
    let subject = match err {
        PrefsError::UnknownPreferenceId { id } => format!("unknown notification kind '{id}'"),
        other => other.to_string(),
    };
    CliError::validation(format!("{subject}; known kinds: {}", known.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_prefs::Locale;
    use agora_test_support::fixtures::hm;

    use crate::cli::Toggle;
    use crate::commands::test_support::file_context;

    #[tokio::test]
    async fn set_persists_edits_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = file_context(&dir.path().join("prefs.json"));

        handle_set(
            &ctx,
            SetArgs {
                enable: vec!["weekly_digest".into()],
                quiet_hours: Some(Toggle::On),
                quiet_start: Some(hm(23, 0)),
                quiet_end: Some(hm(6, 30)),
                ..SetArgs::default()
            },
            &mut Vec::new(),
        )
        .await
        .expect("set should succeed");

        let stored = ctx
            .persistence
            .load()
            .await
            .expect("load")
            .expect("file written");
        assert!(stored.is_enabled(PreferenceKind::WeeklyDigest));
        assert!(stored.quiet_hours.enabled);
        assert_eq!(stored.quiet_hours.start, hm(23, 0));
        assert_eq!(stored.quiet_hours.end, hm(6, 30));
        assert_eq!(stored.locale.selected, Locale::English);
    }

    #[tokio::test]
    async fn partial_quiet_hours_edit_keeps_other_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = file_context(&dir.path().join("prefs.json"));
        let store = ctx.hydrate().await.expect("hydrate");

        apply_edits(
            &store,
            &SetArgs {
                quiet_end: Some(hm(8, 15)),
                ..SetArgs::default()
            },
        )
        .expect("edits apply");

        let window = store.snapshot().quiet_hours;
        assert!(!window.enabled);
        assert_eq!(window.start, hm(22, 0));
        assert_eq!(window.end, hm(8, 15));
    }

    #[tokio::test]
    async fn unknown_kind_is_a_validation_error_and_nothing_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        let ctx = file_context(&path);

        let err = handle_set(
            &ctx,
            SetArgs {
                enable: vec!["votes".into()],
                disable: vec!["marketing".into()],
                sound: Some(Toggle::Off),
                ..SetArgs::default()
            },
            &mut Vec::new(),
        )
        .await
        .expect_err("unknown kind");
        assert_eq!(err.exit_code(), 2);
        let message = err.display_message();
        assert!(message.contains("marketing"));
        assert!(message.contains("known kinds: votes, comments"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn no_op_edits_skip_the_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");

        let mut out = Vec::new();
        handle_set(
            &file_context(&path),
            SetArgs {
                enable: vec!["votes".into()],
                sound: Some(Toggle::On),
                locale: Some(Locale::English),
                ..SetArgs::default()
            },
            &mut out,
        )
        .await
        .expect("set should succeed");
        assert_eq!(out, b"Nothing to save.\n");
        assert!(!path.exists());
    }
}
