//! The relay loop.
//!
//! Each iteration runs SteamCMD with the current arguments plus `+quit`.
//! A successful exit ends the run. A failure that mentions Steam Guard
//! starts a poll phase against the [`Mailbox`]; a fetched code is written
//! into the arguments and SteamCMD is run again. Any other failure ends the
//! run immediately. The number of SteamCMD invocations is capped by
//! `max_invocations`.

use guardrelay_platform::ProcessSpawner;
use guardrelay_types::{PollPolicy, RelayConfig, RelayError, Result};
use tracing::{debug, info, warn};

use crate::args::{apply_guard_code, invocation_args, normalize_args};
use crate::classify::{Outcome, classify};
use crate::mailbox::Mailbox;

/// How a relay run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// SteamCMD exited successfully.
    Succeeded,
    /// SteamCMD failed for a reason other than Steam Guard.
    Failed { exit_code: i32 },
    /// Every allowed invocation was blocked by Steam Guard.
    Exhausted,
}

/// Summary of one relay run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// SteamCMD processes started.
    pub invocations: u32,
    /// `fetch_auth_code` calls made.
    pub mailbox_polls: u32,
    /// Arguments of the last invocation, without the trailing `+quit`.
    pub args: Vec<String>,
}

impl RunReport {
    /// Process exit code for guardrelay itself.
    ///
    /// The child's own code is passed through for plain failures; a child
    /// killed by a signal (or exiting 0 while classified as failed, which
    /// cannot happen) maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Succeeded => 0,
            RunOutcome::Failed { exit_code } if exit_code > 0 => exit_code,
            RunOutcome::Failed { .. } | RunOutcome::Exhausted => 1,
        }
    }
}

/// Runs SteamCMD through `S`, polling `M` for Steam Guard codes.
pub struct Relay<S, M> {
    spawner: S,
    mailbox: M,
    exec_path: String,
    poll: PollPolicy,
    max_invocations: u32,
}

impl<S: ProcessSpawner, M: Mailbox> Relay<S, M> {
    pub fn new(
        spawner: S,
        mailbox: M,
        exec_path: impl Into<String>,
        poll: PollPolicy,
        max_invocations: u32,
    ) -> Self {
        Self {
            spawner,
            mailbox,
            exec_path: exec_path.into(),
            poll,
            max_invocations,
        }
    }

    pub fn from_config(spawner: S, mailbox: M, config: &RelayConfig) -> Self {
        Self::new(
            spawner,
            mailbox,
            config.steamcmd_path.clone(),
            config.poll,
            config.max_invocations,
        )
    }

    /// Authenticate with the mailbox, then [`run`](Self::run).
    pub async fn authenticate_and_run<I, A>(&self, initial_args: I) -> Result<RunReport>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let handle = self.mailbox.authenticate().await?;
        self.run(initial_args, &handle).await
    }

    /// Drive SteamCMD until it succeeds, fails for a non Steam Guard reason,
    /// or `max_invocations` runs have all been blocked by Steam Guard.
    ///
    /// Errors are reserved for conditions that abort the whole run: SteamCMD
    /// could not be started, or the mailbox query failed.
    pub async fn run<I, A>(&self, initial_args: I, handle: &M::Handle) -> Result<RunReport>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut args = normalize_args(initial_args);
        let mut mailbox_polls = 0;

        for invocation in 1..=self.max_invocations {
            let argv = invocation_args(&args);
            info!(
                program = %self.exec_path,
                invocation,
                max = self.max_invocations,
                "running SteamCMD"
            );
            debug!(args = ?argv, "SteamCMD arguments");

            let output = self
                .spawner
                .run(&self.exec_path, &argv)
                .await
                .map_err(|e| RelayError::Process {
                    program: self.exec_path.clone(),
                    reason: e.to_string(),
                })?;

            let report = |outcome: RunOutcome| RunReport {
                outcome,
                invocations: invocation,
                mailbox_polls,
                args: args.clone(),
            };

            match classify(&output) {
                Outcome::Success => {
                    info!(invocation, "SteamCMD finished successfully");
                    return Ok(report(RunOutcome::Succeeded));
                }
                Outcome::Failed => {
                    warn!(exit_code = output.exit_code, "SteamCMD failed");
                    return Ok(report(RunOutcome::Failed {
                        exit_code: output.exit_code,
                    }));
                }
                Outcome::GuardRequired if invocation == self.max_invocations => {
                    warn!(
                        invocations = invocation,
                        "Steam Guard still required and no invocations left"
                    );
                }
                Outcome::GuardRequired => {
                    info!("Steam Guard code required, polling mailbox");
                    let (code, polls) = self.poll_for_code(handle).await?;
                    mailbox_polls += polls;
                    match code {
                        Some(code) => {
                            info!(%code, "fetched Steam Guard code");
                            args = apply_guard_code(&args, &code);
                        }
                        None => warn!(
                            attempts = polls,
                            "no Steam Guard code arrived, retrying with unchanged arguments"
                        ),
                    }
                }
            }
        }

        Ok(RunReport {
            outcome: RunOutcome::Exhausted,
            invocations: self.max_invocations,
            mailbox_polls,
            args,
        })
    }

    /// Up to `max_poll_attempts` fetches, sleeping `poll_interval` after
    /// each empty one except the last. Returns the code (if any) and the
    /// number of fetches made.
    async fn poll_for_code(&self, handle: &M::Handle) -> Result<(Option<String>, u32)> {
        let attempts = self.poll.max_poll_attempts;
        for attempt in 1..=attempts {
            if let Some(code) = self.mailbox.fetch_auth_code(handle).await? {
                return Ok((Some(code), attempt));
            }
            debug!(attempt, attempts, "no Steam Guard mail yet");
            if attempt < attempts {
                tokio::time::sleep(self.poll.poll_interval()).await;
            }
        }
        Ok((None, attempts))
    }
}
