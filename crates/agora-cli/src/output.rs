//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;
use std::io::Write;

use agora_prefs::{QuietHoursWindow, SettingsSnapshot, TimeOfDay};
use anyhow::anyhow;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_snapshot(
    out: &mut impl Write,
    snapshot: &SettingsSnapshot,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(snapshot)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            write_line(out, &text)
        }
        OutputFormat::Table => out
            .write_all(snapshot_table(snapshot).as_bytes())
            .map_err(output_failure),
    }
}

/// Write `line` plus a newline to the command output.
pub(crate) fn write_line(out: &mut impl Write, line: &str) -> CliResult<()> {
    writeln!(out, "{line}").map_err(output_failure)
}

fn output_failure(err: std::io::Error) -> CliError {
    CliError::failure(anyhow!("failed to write output: {err}"))
}

pub(crate) fn snapshot_table(snapshot: &SettingsSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} ENABLED", "NOTIFICATION");
    for preference in snapshot.notifications.iter() {
        let _ = writeln!(
            out,
            "{:<16} {}",
            preference.id.as_str(),
            yes_no(preference.enabled)
        );
    }
    let _ = writeln!(out, "sound: {}", on_off(snapshot.sound.enabled));
    let _ = writeln!(out, "quiet hours: {}", window_label(&snapshot.quiet_hours));
    let _ = writeln!(out, "locale: {}", snapshot.locale.selected);
    out
}

pub(crate) fn quiet_status_line(window: &QuietHoursWindow, at: TimeOfDay) -> String {
    if !window.enabled {
        return format!("quiet hours disabled; notifications allowed at {at}");
    }
    let range = format!("{}-{}", window.start, window.end);
    if window.contains(at) {
        format!("quiet hours in effect at {at} ({range})")
    } else {
        format!("notifications allowed at {at} (quiet hours {range})")
    }
}

fn window_label(window: &QuietHoursWindow) -> String {
    format!(
        "{} ({}-{})",
        on_off(window.enabled),
        window.start,
        window.end
    )
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

const fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
