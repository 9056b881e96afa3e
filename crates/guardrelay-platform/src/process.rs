//! Process spawning with live echo and capture.
//!
//! [`ProcessSpawner`] is the seam the relay loop runs SteamCMD through. The
//! native implementation pipes the child's stdout and stderr, writes each
//! chunk to the matching terminal stream as it arrives and keeps a copy in
//! memory, so the operator sees SteamCMD live while the loop can still
//! inspect the full output afterwards.

use std::io::{self, Write};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::tee::TeeWriter;

/// Exit status and captured output of one process run.
///
/// Buffers are fresh for every run; nothing carries over between
/// invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or -1 when the process was terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external executable to completion.
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    /// Run `command` with `args`, wait for it to exit and return what it
    /// printed.
    ///
    /// A non-zero exit is not an error; only failing to start the process
    /// or to read its output is.
    async fn run(
        &self,
        command: &str,
        args: &[String],
    ) -> Result<ProcessOutput, Box<dyn std::error::Error + Send + Sync>>;
}

/// [`ProcessSpawner`] backed by [`tokio::process`].
#[derive(Debug, Clone, Copy)]
pub struct NativeProcessSpawner {
    mirror_console: bool,
}

impl NativeProcessSpawner {
    /// Spawner that echoes child output to this process's stdout/stderr.
    pub fn new() -> Self {
        Self {
            mirror_console: true,
        }
    }

    /// Spawner that only captures.
    pub fn quiet() -> Self {
        Self {
            mirror_console: false,
        }
    }
}

impl Default for NativeProcessSpawner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessSpawner for NativeProcessSpawner {
    async fn run(
        &self,
        command: &str,
        args: &[String],
    ) -> Result<ProcessOutput, Box<dyn std::error::Error + Send + Sync>> {
        run_captured(
            command,
            args,
            Console::Stdout.sink(self.mirror_console),
            Console::Stderr.sink(self.mirror_console),
        )
        .await
    }
}

/// Run `command`, copying its stdout and stderr into the given sinks and
/// into memory. The child is killed if capturing fails before it exits.
async fn run_captured(
    command: &str,
    args: &[String],
    stdout_sink: Box<dyn Write + Send>,
    stderr_sink: Box<dyn Write + Send>,
) -> Result<ProcessOutput, Box<dyn std::error::Error + Send + Sync>> {
    let mut child = tokio::process::Command::new(command)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take().ok_or("child stdout was not captured")?;
    let stderr = child.stderr.take().ok_or("child stderr was not captured")?;

    // Both pipes are drained while waiting so the child never blocks on
    // a full pipe buffer.
    let (stdout, stderr, status) = tokio::try_join!(
        capture(stdout, stdout_sink),
        capture(stderr, stderr_sink),
        child.wait(),
    )?;

    let exit_code = status.code().unwrap_or(-1);
    debug!(
        command,
        exit_code,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "process exited"
    );

    Ok(ProcessOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

#[derive(Clone, Copy)]
enum Console {
    Stdout,
    Stderr,
}

impl Console {
    fn sink(self, mirror: bool) -> Box<dyn Write + Send> {
        match (mirror, self) {
            (false, _) => Box::new(io::sink()),
            (true, Console::Stdout) => Box::new(io::stdout()),
            (true, Console::Stderr) => Box::new(io::stderr()),
        }
    }
}

async fn capture<R>(mut reader: R, sink: Box<dyn Write + Send>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut tee = TeeWriter::new(sink, &mut buffer);
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        tee.write_all(&chunk[..n])?;
        tee.flush()?;
    }
    drop(tee);
    Ok(buffer)
}
