//! Shell subprocess runner - buffers stdout/stderr until the child exits

use crate::execution::cancel::CancelSignal;
use std::io::{self, Write};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::trace;

/// Exit code and buffered output of a finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code; `-N` when the child was killed by signal `N`
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// How a cancellable wait on a child ended
#[derive(Debug)]
pub enum ShellOutcome {
    Exited(CapturedOutput),
    /// Cancellation arrived first; the child was killed
    Cancelled,
}

/// A single shell-interpreted command line
#[derive(Debug, Clone)]
pub struct ShellCommand {
    command: String,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Each shell leads its own process group so cancellation reaches its children
    #[cfg(unix)]
    fn build(&self) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.command).process_group(0);
        cmd
    }

    #[cfg(windows)]
    fn build(&self) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(&self.command);
        cmd
    }

    fn spawn(&self) -> io::Result<tokio::process::Child> {
        trace!("Spawning shell: {}", self.command);
        self.build()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }

    /// Run to completion
    pub async fn output(&self) -> io::Result<CapturedOutput> {
        let output = self.spawn()?.wait_with_output().await?;
        Ok(CapturedOutput::from(output))
    }

    /// Run until the child exits or `cancel` is raised, whichever comes first
    pub async fn output_until_cancelled(&self, cancel: &mut CancelSignal) -> io::Result<ShellOutcome> {
        let child = self.spawn()?;
        let pid = child.id();

        tokio::select! {
            biased;
            output = child.wait_with_output() => Ok(ShellOutcome::Exited(CapturedOutput::from(output?))),
            _ = cancel.cancelled() => {
                trace!("Cancelled while waiting on: {}", self.command);
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                Ok(ShellOutcome::Cancelled)
            }
        }
    }
}

impl From<std::process::Output> for CapturedOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: exit_code(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

impl CapturedOutput {
    /// Stdout decoded as text; invalid UTF-8 is replaced
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Write stdout then stderr verbatim to this process's stderr
    pub fn echo_to_stderr(&self) -> io::Result<()> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(&self.stdout)?;
        stderr.write_all(&self.stderr)?;
        stderr.flush()
    }
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = i32::try_from(pid) else { return };
    // SAFETY: kill(2) takes no pointers; a negative pid addresses the process group
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        trace!("Process group {} already gone: {}", pgid, io::Error::last_os_error());
    }
}

/// Only the direct child is killed, on drop
#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
