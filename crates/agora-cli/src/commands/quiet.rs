use std::io::Write;

use agora_prefs::TimeOfDay;
use chrono::Local;
use tracing::instrument;

use crate::cli::QuietNowArgs;
use crate::client::{AppContext, CliResult};
use crate::output::{quiet_status_line, write_line};

#[instrument(name = "cli.quiet_now", skip_all)]
pub(crate) async fn handle_quiet_now(
    ctx: &AppContext,
    args: QuietNowArgs,
    out: &mut impl Write,
) -> CliResult<()> {
    let store = ctx.hydrate().await?;
    let at = args
        .at
        .unwrap_or_else(|| TimeOfDay::from(Local::now().time()));
    write_line(out, &quiet_status_line(&store.snapshot().quiet_hours, at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_test_support::fixtures::{customized_snapshot, hm};

    use crate::commands::test_support::file_context;

    #[tokio::test]
    async fn quiet_now_checks_the_stored_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = file_context(&dir.path().join("prefs.json"));
        ctx.persistence
            .store(&customized_snapshot())
            .await
            .expect("seed file");

        let mut out = Vec::new();
        handle_quiet_now(&ctx, QuietNowArgs { at: Some(hm(2, 0)) }, &mut out)
            .await
            .expect("quiet-now should succeed");
        handle_quiet_now(&ctx, QuietNowArgs { at: Some(hm(12, 0)) }, &mut out)
            .await
            .expect("quiet-now should succeed");

        let text = String::from_utf8(out).expect("utf-8 output");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "quiet hours in effect at 02:00 (23:00-06:30)",
                "notifications allowed at 12:00 (quiet hours 23:00-06:30)",
            ]
        );
    }

    #[tokio::test]
    async fn quiet_now_defaults_to_local_time() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = file_context(&dir.path().join("prefs.json"));

        let mut out = Vec::new();
        handle_quiet_now(&ctx, QuietNowArgs::default(), &mut out)
            .await
            .expect("quiet-now with local time should succeed");
        let text = String::from_utf8(out).expect("utf-8 output");
        assert!(text.starts_with("quiet hours disabled; notifications allowed at "));
    }
}
