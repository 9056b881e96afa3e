//! Failure classification for a finished SteamCMD run.

use guardrelay_platform::ProcessOutput;

/// Printed by SteamCMD when the login needs a Steam Guard code. Matched
/// case-sensitively.
pub const STEAM_GUARD_SIGNATURE: &str =
    "This computer has not been authenticated for your account using Steam Guard";

/// What the relay should do after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit status zero.
    Success,
    /// Failed, and the output asks for a Steam Guard code. Recoverable.
    GuardRequired,
    /// Failed for any other reason.
    Failed,
}

/// Classify a run by exit status, then by the Steam Guard signature on
/// either stream.
pub fn classify(output: &ProcessOutput) -> Outcome {
    if output.success() {
        Outcome::Success
    } else if output.stdout.contains(STEAM_GUARD_SIGNATURE)
        || output.stderr.contains(STEAM_GUARD_SIGNATURE)
    {
        Outcome::GuardRequired
    } else {
        Outcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn zero_exit_is_success() {
        assert_eq!(classify(&output(0, "Success! App '740' fully installed.", "")), Outcome::Success);
    }

    #[test]
    fn signature_on_stdout_is_recoverable() {
        let stdout = format!("Logging in user 'bob' to Steam Public...\n{STEAM_GUARD_SIGNATURE}.\nFAILED (Account Logon Denied)");
        assert_eq!(classify(&output(5, &stdout, "")), Outcome::GuardRequired);
    }

    #[test]
    fn signature_on_stderr_is_recoverable() {
        let stderr = format!("ERROR! {STEAM_GUARD_SIGNATURE}");
        assert_eq!(classify(&output(1, "", &stderr)), Outcome::GuardRequired);
    }

    #[test]
    fn other_failures_are_not_recoverable() {
        assert_eq!(
            classify(&output(1, "FAILED (Invalid Password)", "")),
            Outcome::Failed
        );
    }

    #[test]
    fn signature_match_is_case_sensitive() {
        let lowered = STEAM_GUARD_SIGNATURE.to_lowercase();
        assert_eq!(classify(&output(1, &lowered, "")), Outcome::Failed);
    }

    #[test]
    fn success_wins_over_signature() {
        assert_eq!(
            classify(&output(0, STEAM_GUARD_SIGNATURE, "")),
            Outcome::Success
        );
    }
}
