//! Build invocation: run `lake update` (or a configured replacement) in a
//! directory with a hard timeout.
//!
//! Every outcome is a value; nothing here aborts a run. The invoker is a trait
//! so localization can be exercised without spawning processes.
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_BUILD_COMMAND: &str = "lake update";
pub const BUILD_COMMAND_ENV: &str = "CRUCIBLE_BUILD_COMMAND";
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 60;

const MAX_STDERR_BYTES: usize = 4 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildOutcome {
    Succeeded,
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        stderr: String,
    },
    TimedOut {
        timeout_ms: u64,
    },
    /// The command could not be started at all.
    Unavailable {
        detail: String,
    },
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, BuildOutcome::Succeeded)
    }

    pub fn describe(&self) -> String {
        match self {
            BuildOutcome::Succeeded => "succeeded".to_string(),
            BuildOutcome::Failed {
                exit_code: Some(code),
                ..
            } => format!("failed (exit {code})"),
            BuildOutcome::Failed { exit_code: None, .. } => "failed (killed by signal)".to_string(),
            BuildOutcome::TimedOut { timeout_ms } => format!("timed out after {timeout_ms}ms"),
            BuildOutcome::Unavailable { detail } => format!("could not start: {detail}"),
        }
    }
}

pub trait BuildInvoker {
    /// Run the build command in `dir`. `label` names the target in logs.
    fn invoke(&self, dir: &Path, label: &str) -> BuildOutcome;
}

/// Build command precedence: explicit flag, then `CRUCIBLE_BUILD_COMMAND`,
/// then `lake update`.
pub fn resolve_build_command(flag: Option<&str>) -> String {
    flag.map(str::to_string)
        .or_else(|| std::env::var(BUILD_COMMAND_ENV).ok())
        .map(|command| command.trim().to_string())
        .filter(|command| !command.is_empty())
        .unwrap_or_else(|| DEFAULT_BUILD_COMMAND.to_string())
}

/// Runs an external command as the build step.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandInvoker {
    pub fn new(command_line: &str, timeout: Duration) -> Result<Self> {
        let mut words = shell_words::split(command_line)
            .with_context(|| format!("parse build command: {command_line}"))?;
        if words.is_empty() {
            return Err(anyhow!("build command is empty"));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            timeout,
        })
    }

    pub fn command_line(&self) -> String {
        let mut words = vec![self.program.as_str()];
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }

    fn run(&self, program: &Path, dir: &Path) -> Result<BuildOutcome> {
        let mut cmd = Command::new(program);
        cmd.args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn {}", program.display()))?;
        let stdout = drain_in_background(child.stdout.take());
        let stderr = drain_in_background(child.stderr.take());

        let timed_out = wait_or_kill(&mut child, start, self.timeout, Child::try_wait)
            .context("check build status")?;
        let status = child.wait().context("wait for build command")?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        let elapsed_ms = start.elapsed().as_millis();
        tracing::debug!(
            elapsed_ms,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            timed_out,
            "build command finished"
        );

        if timed_out {
            let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            return Ok(BuildOutcome::TimedOut { timeout_ms });
        }
        if status.success() {
            return Ok(BuildOutcome::Succeeded);
        }
        Ok(BuildOutcome::Failed {
            exit_code: status.code(),
            stderr: stderr_excerpt(&stderr),
        })
    }
}

impl BuildInvoker for CommandInvoker {
    fn invoke(&self, dir: &Path, label: &str) -> BuildOutcome {
        tracing::info!(
            target_dir = %dir.display(),
            command = %self.command_line(),
            "running build in {label}"
        );
        let outcome = match resolve_program(&self.program) {
            Ok(program) => self
                .run(&program, dir)
                .unwrap_or_else(|err| BuildOutcome::Unavailable {
                    detail: format!("{err:#}"),
                }),
            Err(detail) => BuildOutcome::Unavailable { detail },
        };
        match &outcome {
            BuildOutcome::Succeeded => tracing::info!("build completed successfully in {label}"),
            BuildOutcome::Failed { stderr, .. } => {
                tracing::error!(stderr = %stderr, "build {} in {label}", outcome.describe())
            }
            _ => tracing::error!("build {} in {label}", outcome.describe()),
        }
        outcome
    }
}

fn resolve_program(program: &str) -> std::result::Result<PathBuf, String> {
    which::which(program).map_err(|err| format!("{program}: {err}"))
}

/// Poll until the child exits or `timeout` passes. Returns whether it timed
/// out. The process group is killed on timeout and on a failed poll.
fn wait_or_kill(
    child: &mut Child,
    start: Instant,
    timeout: Duration,
    mut poll: impl FnMut(&mut Child) -> io::Result<Option<ExitStatus>>,
) -> io::Result<bool> {
    loop {
        match poll(child) {
            Ok(Some(_)) => return Ok(false),
            Ok(None) => {}
            Err(err) => {
                kill_process_tree(child);
                return Err(err);
            }
        }
        if start.elapsed() > timeout {
            kill_process_tree(child);
            return Ok(true);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Leading `MAX_STDERR_BYTES` of trimmed stderr, cut on a char boundary.
fn stderr_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    let mut end = text.len().min(MAX_STDERR_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].trim_end().to_string()
}

fn drain_in_background<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut bytes);
        }
        bytes
    })
}

/// Kill the child and, on Unix, every process in its group.
fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: kill(2) with a negative pid only signals the child's own
            // process group, created by `process_group(0)` at spawn.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}
