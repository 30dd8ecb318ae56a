//! Argument parsing and command dispatch.

use std::path::PathBuf;

use agora_prefs::{Locale, TimeOfDay};
use agora_telemetry::{LogFormat, LoggingConfig, init_logging};
use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::client::{AppContext, BackendKind, CliResult};
use crate::commands::quiet::handle_quiet_now;
use crate::commands::reset::handle_reset;
use crate::commands::set::handle_set;
use crate::commands::show::handle_show;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub(crate) const DEFAULT_API_URL: &str = "http://127.0.0.1:7070";
pub(crate) const DEFAULT_PREFS_FILE: &str = "agora-preferences.json";
pub(crate) const DEFAULT_CLI_LOG_LEVEL: &str = "warn";

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format,
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("error: failed to initialise logging: {err}");
        return 3;
    }

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

pub(crate) async fn dispatch(cli: Cli) -> CliResult<()> {
    let ctx = AppContext::from_cli(&cli)?;
    tracing::debug!(backend = ?cli.backend, "dispatching command");

    let mut out = std::io::stdout();
    match cli.command {
        Command::Show(args) => handle_show(&ctx, args, &mut out).await,
        Command::Set(args) => handle_set(&ctx, args, &mut out).await,
        Command::Reset => handle_reset(&ctx, &mut out).await,
        Command::QuietNow(args) => handle_quiet_now(&ctx, args, &mut out).await,
    }
}

#[derive(Parser)]
#[command(name = "agora", about = "Manage Agora notification preferences")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "AGORA_BACKEND",
        value_enum,
        default_value_t = BackendKind::File
    )]
    pub(crate) backend: BackendKind,
    #[arg(
        long,
        global = true,
        env = "AGORA_PREFS_FILE",
        default_value = DEFAULT_PREFS_FILE
    )]
    pub(crate) prefs_file: PathBuf,
    #[arg(
        long,
        global = true,
        env = "AGORA_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(long, global = true, env = "AGORA_API_KEY")]
    pub(crate) api_key: Option<String>,
    #[arg(
        long,
        global = true,
        env = "AGORA_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "AGORA_LOG_LEVEL",
        default_value = DEFAULT_CLI_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        value_parser = parse_log_format,
        default_value = "auto",
        help = "Log output format: json, pretty or auto"
    )]
    pub(crate) log_format: LogFormat,
    #[arg(
        long,
        global = true,
        help = "Restore the last saved preferences when a save fails"
    )]
    pub(crate) rollback_on_failure: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the stored preferences.
    Show(ShowArgs),
    /// Edit preferences and save them.
    Set(SetArgs),
    /// Restore account defaults and save them.
    Reset,
    /// Report whether quiet hours are in effect.
    QuietNow(QuietNowArgs),
}

#[derive(Args, Default)]
pub(crate) struct ShowArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Default)]
pub(crate) struct SetArgs {
    #[arg(long = "enable", value_name = "KIND", help = "Enable a notification kind")]
    pub(crate) enable: Vec<String>,
    #[arg(long = "disable", value_name = "KIND", help = "Disable a notification kind")]
    pub(crate) disable: Vec<String>,
    #[arg(long, value_enum)]
    pub(crate) sound: Option<Toggle>,
    #[arg(long = "quiet-hours", value_enum)]
    pub(crate) quiet_hours: Option<Toggle>,
    #[arg(long, value_name = "HH:MM", value_parser = parse_time)]
    pub(crate) quiet_start: Option<TimeOfDay>,
    #[arg(long, value_name = "HH:MM", value_parser = parse_time)]
    pub(crate) quiet_end: Option<TimeOfDay>,
    #[arg(long, value_parser = parse_locale)]
    pub(crate) locale: Option<Locale>,
}

#[derive(Args, Default)]
pub(crate) struct QuietNowArgs {
    #[arg(
        long,
        value_name = "HH:MM",
        value_parser = parse_time,
        help = "Time to check instead of the current local time"
    )]
    pub(crate) at: Option<TimeOfDay>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub(crate) const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub(crate) fn parse_url(value: &str) -> Result<Url, String> {
    Url::parse(value).map_err(|err| format!("invalid URL '{value}': {err}"))
}

pub(crate) fn parse_time(value: &str) -> Result<TimeOfDay, String> {
    value.parse().map_err(|err| format!("{err}; expected HH:MM"))
}

pub(crate) fn parse_locale(value: &str) -> Result<Locale, String> {
    value.parse().map_err(|err| {
        let supported: Vec<_> = Locale::ALL.iter().map(|locale| locale.as_str()).collect();
        format!("{err}; supported: {}", supported.join(", "))
    })
}

pub(crate) fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse().map_err(|err| format!("{err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use httpmock::prelude::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn set_accepts_repeated_kinds_and_window() {
        let cli = Cli::try_parse_from([
            "agora",
            "set",
            "--enable",
            "weekly_digest",
            "--disable",
            "comments",
            "--disable",
            "votes",
            "--quiet-hours",
            "on",
            "--quiet-start",
            "23:00",
            "--quiet-end",
            "06:30",
            "--locale",
            "french",
        ])
        .expect("arguments should parse");

        let Command::Set(args) = cli.command else {
            panic!("expected set command");
        };
        assert_eq!(args.enable, vec!["weekly_digest"]);
        assert_eq!(args.disable, vec!["comments", "votes"]);
        assert_eq!(args.quiet_hours, Some(Toggle::On));
        assert_eq!(args.quiet_start.map(|t| t.to_string()).as_deref(), Some("23:00"));
        assert_eq!(args.quiet_end.map(|t| t.to_string()).as_deref(), Some("06:30"));
        assert_eq!(args.locale, Some(Locale::French));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "agora",
            "show",
            "--backend",
            "noop",
            "--format",
            "json",
            "--rollback-on-failure",
        ])
        .expect("arguments should parse");
        assert_eq!(cli.backend, BackendKind::Noop);
        assert!(cli.rollback_on_failure);
        let Command::Show(args) = cli.command else {
            panic!("expected show command");
        };
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn timeout_must_be_at_least_one_second() {
        assert!(Cli::try_parse_from(["agora", "--timeout", "0", "show"]).is_err());
        let cli = Cli::try_parse_from(["agora", "--timeout", "5", "show"])
            .expect("arguments should parse");
        assert_eq!(cli.timeout, 5);
    }

    #[test]
    fn parse_time_rejects_out_of_range_values() {
        let err = parse_time("24:00").expect_err("hour out of range");
        assert!(err.contains("expected HH:MM"));
        assert!(parse_time("7:5").is_err());
        assert!(parse_time("07:05").is_ok());
    }

    #[test]
    fn parse_locale_lists_supported_values() {
        assert_eq!(parse_locale("es_ES.UTF-8"), Ok(Locale::Spanish));
        let err = parse_locale("klingon").expect_err("unsupported locale");
        assert!(err.contains("english, french, spanish"));
    }

    #[tokio::test]
    async fn set_over_http_puts_snapshot_with_api_key() {
        let server = MockServer::start_async().await;
        let base_url = server.base_url();
        let load = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/preferences")
                .header("x-agora-api-key", "secret");
            then.status(404);
        });
        let store = server.mock(|when, then| {
            when.method(httpmock::Method::PUT)
                .path("/v1/preferences")
                .header("x-agora-api-key", "secret")
                .body_includes(r#"{"id":"weekly_digest","enabled":true}"#);
            then.status(204);
        });

        let cli = Cli::try_parse_from([
            "agora",
            "--backend",
            "http",
            "--api-url",
            base_url.as_str(),
            "--api-key",
            "secret",
            "set",
            "--enable",
            "weekly_digest",
        ])
        .expect("arguments should parse");
        dispatch(cli).await.expect("set should succeed");
        load.assert();
        store.assert();
    }

    #[tokio::test]
    async fn http_save_failure_exits_with_failure_code() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v1/preferences");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(httpmock::Method::PUT).path("/v1/preferences");
            then.status(500);
        });
        let base_url = server.base_url();

        let cli = Cli::try_parse_from([
            "agora",
            "--backend",
            "http",
            "--api-url",
            base_url.as_str(),
            "set",
            "--sound",
            "off",
        ])
        .expect("arguments should parse");
        let err = dispatch(cli).await.expect_err("server failure");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.display_message(),
            "failed to save preferences: save failed: server rejected the request"
        );
    }

    #[test]
    fn parse_url_rejects_invalid_input() {
        let err = parse_url("not-a-url").expect_err("invalid URL should fail");
        assert!(err.contains("invalid URL"));
    }
}
