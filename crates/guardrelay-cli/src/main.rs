//! guardrelay CLI entry point.
//!
//! Every argument is forwarded to SteamCMD; guardrelay has no flags of its
//! own. Configuration comes from `config.json` (or `$GUARDRELAY_CONFIG`),
//! logging from `RUST_LOG`.

use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};

use guardrelay_core::{Relay, RunOutcome, RunReport};
use guardrelay_mailbox::GmailMailbox;
use guardrelay_oauth2::{Authenticator, TokenStore};
use guardrelay_platform::config_loader;
use guardrelay_platform::env::NativeEnvironment;
use guardrelay_platform::NativeProcessSpawner;

/// Arguments for SteamCMD: everything after the program name, unchanged.
///
/// No argument parser sits in front of this, so `--`, `--help` and the like
/// reach SteamCMD exactly as typed.
fn steamcmd_args<I>(argv: I) -> Vec<String>
where
    I: IntoIterator<Item = OsString>,
{
    argv.into_iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = steamcmd_args(std::env::args_os());

    // SteamCMD output goes to stdout; keep logs on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let report = run(args).await?;
    let code = report.exit_code();
    match report.outcome {
        RunOutcome::Succeeded => info!(invocations = report.invocations, "done"),
        RunOutcome::Failed { exit_code } => {
            error!(exit_code, "SteamCMD failed for a reason other than Steam Guard")
        }
        RunOutcome::Exhausted => error!(
            invocations = report.invocations,
            polls = report.mailbox_polls,
            "gave up: Steam Guard still required after the last allowed run"
        ),
    }
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

async fn run(args: Vec<String>) -> anyhow::Result<RunReport> {
    let config_path = config_loader::discover_config_path(&NativeEnvironment);
    let config = config_loader::load_or_create(&config_path)
        .await
        .with_context(|| format!("loading {}", config_path.display()))?;

    let auth = Authenticator::from_credentials_file(
        &config.credentials_path,
        TokenStore::new(&config.token_path),
        &config.callback_addr,
        config.callback_timeout(),
    )
    .context("loading Google client credentials")?;
    let mailbox = GmailMailbox::new(auth, &config.mailbox)?;

    let relay = Relay::from_config(NativeProcessSpawner::new(), mailbox, &config);
    let report = relay
        .authenticate_and_run(args)
        .await
        .context("relay aborted")?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Vec<String> {
        let argv = std::iter::once("guardrelay")
            .chain(args.iter().copied())
            .map(OsString::from);
        steamcmd_args(argv)
    }

    #[test]
    fn forwards_arguments_verbatim() {
        assert_eq!(
            parse(&["+login", "bob", "hunter2", "+app_update", "740", "validate"]),
            vec!["+login", "bob", "hunter2", "+app_update", "740", "validate"]
        );
    }

    #[test]
    fn forwards_hyphenated_arguments() {
        assert_eq!(
            parse(&["-dev", "--help", "-V", "+quit"]),
            vec!["-dev", "--help", "-V", "+quit"]
        );
    }

    #[test]
    fn leading_double_dash_is_forwarded() {
        assert_eq!(parse(&["--", "+login"]), vec!["--", "+login"]);
        assert_eq!(
            parse(&["+login", "bob", "--", "x"]),
            vec!["+login", "bob", "--", "x"]
        );
    }

    #[test]
    fn no_arguments_is_fine() {
        assert!(parse(&[]).is_empty());
    }
}
