use log::debug;
use std::ffi::{OsStr, OsString};
use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{GitvendError, Result};
use crate::settings::Settings;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Version-control family whose executable should be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Git,
    Svn,
}

impl Tool {
    fn program(self) -> &'static str {
        match self {
            Tool::Git => "git",
            Tool::Svn => "svn",
        }
    }
}

/// Shared flag that aborts running and future invocations once set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Output of a process that ran to completion.
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Runs version-control executables with an explicit argument vector and
/// working directory, returning captured standard output.
///
/// The process-wide working directory is never changed; each invocation
/// gets its own `current_dir`.
#[derive(Debug, Clone)]
pub struct Invoker {
    git_dir: PathBuf,
    svn_dir: PathBuf,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl Invoker {
    pub fn new(settings: &Settings) -> Self {
        Self {
            git_dir: settings.git_dir.clone(),
            svn_dir: settings.svn_dir.clone(),
            timeout: settings.timeout,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Full path of the executable for `tool`.
    pub fn executable(&self, tool: Tool) -> PathBuf {
        let dir = match tool {
            Tool::Git => &self.git_dir,
            Tool::Svn => &self.svn_dir,
        };
        dir.join(tool.program())
    }

    /// Run `tool` with `args` inside `cwd`.
    ///
    /// # Errors
    /// - [`GitvendError::Directory`] if `cwd` does not exist.
    /// - [`GitvendError::Execution`] if the executable cannot be launched,
    ///   exits non-zero, times out or is cancelled.
    pub fn run<I, S>(&self, tool: Tool, args: I, cwd: &Path) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (cmd, rendered) = self.command(tool, args);
        self.spawn_and_wait(cmd, rendered, cwd)
    }

    /// Like [`Invoker::run`], but a non-zero exit is returned to the caller
    /// instead of being turned into an error.
    pub fn capture<I, S>(&self, tool: Tool, args: I, cwd: &Path) -> Result<Captured>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (mut cmd, rendered) = self.command(tool, args);
        self.capture_command(&mut cmd, &rendered, cwd)
    }

    fn command<I, S>(&self, tool: Tool, args: I) -> (Command, String)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let rendered = render(tool.program(), &args);
        let mut cmd = Command::new(self.executable(tool));
        cmd.args(&args).env("GIT_TERMINAL_PROMPT", "0");
        (cmd, rendered)
    }

    /// Run an arbitrary command line through `sh -c` inside `cwd`.
    ///
    /// TRUSTED INPUT ONLY: `command` is interpreted by the shell verbatim.
    /// This exists solely for the user-supplied `command` operation; never
    /// pass text that originates from a repository or a remote.
    pub fn run_shell(&self, command: &str, cwd: &Path) -> Result<String> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        self.spawn_and_wait(cmd, command.to_string(), cwd)
    }

    fn spawn_and_wait(&self, mut cmd: Command, rendered: String, cwd: &Path) -> Result<String> {
        let captured = self.capture_command(&mut cmd, &rendered, cwd)?;
        if !captured.status.success() {
            let detail = if captured.stderr.trim().is_empty() {
                captured.stdout.trim()
            } else {
                captured.stderr.trim()
            };
            let code = captured
                .status
                .code()
                .map(|c| format!("exit status {}", c))
                .unwrap_or_else(|| "terminated by signal".to_string());
            let reason = if detail.is_empty() {
                code
            } else {
                format!("{}: {}", code, detail)
            };
            return Err(GitvendError::execution(rendered, reason));
        }
        Ok(captured.stdout)
    }

    /// Launch `cmd` in its own process group and collect both pipes.
    ///
    /// The deadline and the cancel token cover the whole lifetime of the
    /// pipes, not just the direct child: a background descendant that keeps
    /// stdout open is killed together with its group.
    fn capture_command(&self, cmd: &mut Command, rendered: &str, cwd: &Path) -> Result<Captured> {
        if !cwd.is_dir() {
            return Err(GitvendError::Directory {
                path: cwd.to_path_buf(),
            });
        }
        if self.cancel.is_cancelled() {
            return Err(GitvendError::execution(rendered, "cancelled"));
        }

        debug!("running `{}` in {}", rendered, cwd.display());
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);
        let mut child = cmd
            .spawn()
            .map_err(|e| GitvendError::execution(rendered, format!("could not launch: {}", e)))?;

        let (tx, rx) = mpsc::channel();
        drain(child.stdout.take(), Stream::Out, tx.clone());
        drain(child.stderr.take(), Stream::Err, tx);
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let status = match self.wait(&mut child, deadline) {
            Ok(status) => status,
            Err(reason) => {
                kill_group(child.id());
                let _ = child.kill();
                let _ = child.wait();
                return Err(GitvendError::execution(rendered, reason));
            }
        };
        let (stdout, stderr) = match self.collect(&rx, deadline) {
            Ok(pipes) => pipes,
            Err(reason) => {
                kill_group(child.id());
                return Err(GitvendError::execution(rendered, reason));
            }
        };
        Ok(Captured {
            status,
            stdout,
            stderr,
        })
    }

    /// Poll the child until it exits, the deadline passes or the token fires.
    fn wait(
        &self,
        child: &mut Child,
        deadline: Option<Instant>,
    ) -> std::result::Result<ExitStatus, String> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => return Err(format!("wait failed: {}", e)),
            }
            self.check_limits(deadline)?;
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Receive both pipe contents under the same deadline as the child.
    fn collect(
        &self,
        rx: &Receiver<(Stream, String)>,
        deadline: Option<Instant>,
    ) -> std::result::Result<(String, String), String> {
        let (mut out, mut err) = (None, None);
        while out.is_none() || err.is_none() {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok((Stream::Out, text)) => out = Some(text),
                Ok((Stream::Err, text)) => err = Some(text),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => self.check_limits(deadline)?,
            }
        }
        Ok((out.unwrap_or_default(), err.unwrap_or_default()))
    }

    fn check_limits(&self, deadline: Option<Instant>) -> std::result::Result<(), String> {
        if self.cancel.is_cancelled() {
            return Err("cancelled".to_string());
        }
        if let (Some(deadline), Some(limit)) = (deadline, self.timeout)
            && Instant::now() >= deadline
        {
            return Err(format!("timed out after {:?}", limit));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Out,
    Err,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>, stream: Stream, tx: Sender<(Stream, String)>) {
    if let Some(mut r) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
        });
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) {
    // a negative pid addresses the process group
    unsafe {
        libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

fn render(program: &str, args: &[OsString]) -> String {
    let mut s = program.to_string();
    for a in args {
        s.push(' ');
        s.push_str(&a.to_string_lossy());
    }
    s
}
