//! CLI integration tests for the `guardrelay` binary.
//!
//! Each test runs the compiled binary inside a fresh temp directory with a
//! shell script standing in for SteamCMD, a pre-authorized `token.json` and
//! `GUARDRELAY_CONFIG` pointing at a config written by the test. The fake
//! SteamCMD appends its arguments to `calls.log`, one line per run.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const GUARD_MESSAGE: &str =
    "This computer has not been authenticated for your account using Steam Guard.";

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            dir: tempfile::tempdir().expect("tempdir"),
        };
        sandbox.write(
            "credentials.json",
            r#"{"installed": {"client_id": "client-1", "client_secret": "shh", "token_uri": "http://127.0.0.1:9/token"}}"#,
        );
        sandbox.write(
            "token.json",
            r#"{"access_token": "ya29.test", "token_type": "Bearer", "refresh_token": "1//r", "expiry": "2099-01-01T00:00:00Z"}"#,
        );
        sandbox
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) {
        fs::write(self.path(name), contents).expect("write fixture");
    }

    /// Install a fake SteamCMD whose behaviour is `body` (POSIX sh).
    fn steamcmd(&self, body: &str) -> PathBuf {
        let path = self.path("steamcmd.sh");
        let log = self.path("calls.log");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n{body}\n",
            log.display()
        );
        fs::write(&path, script).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn config(&self, steamcmd: &Path, api_base: &str) {
        let config = serde_json::json!({
            "steamcmd_path": steamcmd,
            "credentials_path": self.path("credentials.json"),
            "token_path": self.path("token.json"),
            "poll": { "max_poll_attempts": 2, "poll_interval_secs": 0 },
            "max_invocations": 3,
            "callback_addr": "127.0.0.1:0",
            "callback_timeout_secs": 1,
            "mailbox": { "api_base": api_base }
        });
        self.write("config.json", &config.to_string());
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.path("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_guardrelay"))
            .args(args)
            .current_dir(self.dir.path())
            .env("GUARDRELAY_CONFIG", self.path("config.json"))
            // Keep tracing quiet so assertions only see program output.
            .env("RUST_LOG", "off")
            .output()
            .expect("failed to run guardrelay")
    }
}

#[test]
fn forwards_arguments_and_appends_quit() {
    let sandbox = Sandbox::new();
    let steamcmd = sandbox.steamcmd("echo 'Success! App 740 fully installed.'\nexit 0");
    sandbox.config(&steamcmd, "http://127.0.0.1:9");

    let output = sandbox.run(&["+quit", "+login", "anonymous", "+app_update", "740"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(sandbox.calls(), vec!["+login anonymous +app_update 740 +quit"]);
    // SteamCMD's stdout is echoed live.
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Success! App 740 fully installed."), "stdout: {stdout}");
}

#[test]
fn leading_double_dash_reaches_steamcmd() {
    let sandbox = Sandbox::new();
    let steamcmd = sandbox.steamcmd("exit 0");
    sandbox.config(&steamcmd, "http://127.0.0.1:9");

    let output = sandbox.run(&["--", "+login", "anonymous"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(sandbox.calls(), vec!["-- +login anonymous +quit"]);
}

#[test]
fn non_guard_failure_passes_exit_code_through() {
    let sandbox = Sandbox::new();
    let steamcmd = sandbox.steamcmd("echo 'FAILED (Invalid Password)'\nexit 3");
    sandbox.config(&steamcmd, "http://127.0.0.1:9");

    let output = sandbox.run(&["+login", "bob", "wrong"]);

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(sandbox.calls().len(), 1);
}

#[test]
fn steam_guard_code_is_fetched_and_injected() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/gmail/v1/users/me/messages")
        .match_query(mockito::Matcher::Any)
        .match_header("authorization", "Bearer ya29.test")
        .with_status(200)
        .with_body(r#"{"messages": [{"id": "m1", "threadId": "t1"}]}"#)
        .create();
    // "Login Code XYZ987" in URL-safe base64.
    server
        .mock("GET", "/gmail/v1/users/me/messages/m1")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": "m1", "payload": {"mimeType": "text/plain", "body": {"data": "TG9naW4gQ29kZSBYWVo5ODc"}}}"#)
        .create();

    let sandbox = Sandbox::new();
    let steamcmd = sandbox.steamcmd(&format!(
        "case \"$*\" in\n  *+set_steam_guard_code*) echo 'Logged in OK'; exit 0 ;;\n  *) echo '{GUARD_MESSAGE}' >&2; exit 5 ;;\nesac"
    ));
    sandbox.config(&steamcmd, &server.url());

    let output = sandbox.run(&["+login", "bob", "hunter2"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        sandbox.calls(),
        vec![
            "+login bob hunter2 +quit",
            "+login bob hunter2 +set_steam_guard_code XYZ987 +quit",
        ]
    );
}

#[test]
fn gives_up_after_max_invocations() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/gmail/v1/users/me/messages")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"resultSizeEstimate": 0}"#)
        .create();

    let sandbox = Sandbox::new();
    let steamcmd = sandbox.steamcmd(&format!("echo '{GUARD_MESSAGE}'\nexit 5"));
    sandbox.config(&steamcmd, &server.url());

    let output = sandbox.run(&["+login", "bob", "hunter2"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(sandbox.calls().len(), 3);
}

#[test]
fn missing_credentials_is_fatal() {
    let sandbox = Sandbox::new();
    let steamcmd = sandbox.steamcmd("exit 0");
    sandbox.config(&steamcmd, "http://127.0.0.1:9");
    fs::remove_file(sandbox.path("credentials.json")).unwrap();

    let output = sandbox.run(&["+login", "anonymous"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("credentials"), "stderr: {stderr}");
    assert!(sandbox.calls().is_empty(), "SteamCMD must not run");
}

#[test]
fn missing_config_is_created_with_defaults() {
    let sandbox = Sandbox::new();
    fs::remove_file(sandbox.path("credentials.json")).unwrap();

    let output = sandbox.run(&["+login", "anonymous"]);

    // No credentials.json next to the default config, so the run fails
    // after the config has been written.
    assert!(!output.status.success());
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(sandbox.path("config.json")).unwrap()).unwrap();
    assert_eq!(written["steamcmd_path"], "./steamcmd/steamcmd.exe");
    assert_eq!(written["poll"]["max_poll_attempts"], 12);
}

#[test]
fn invalid_config_is_fatal() {
    let sandbox = Sandbox::new();
    sandbox.write("config.json", r#"{"steamcmd_path": "", "max_invocations": 0}"#);

    let output = sandbox.run(&["+login", "anonymous"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"), "stderr: {stderr}");
}
