//! # External Processes
//!
//! Every gpg and git call goes through a [`Runner`]. The default
//! [`SystemRunner`] spawns a real child process; tests swap in scripted runners.
//!
//! A non-zero exit status is returned as data in [`ProcessOutput`]. Only a failure
//! to start the program at all is an error ([`PassError::Launch`]).
//!
//! [`Executor`] adds the two calling modes used by the store:
//!
//! - **blocking**: [`Executor::run_blocking`] waits for the child and returns its output
//! - **fire-and-forget**: [`Executor::spawn`] runs the child on a worker thread and
//!   delivers a [`Completion`] tagged with an [`OpTag`] on the completion channel

use crate::error::{PassError, Result};
use flume::Sender;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

/// A single program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        let arg = path.to_string_lossy().into_owned();
        self.arg(arg)
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program name as shown in logs and errors.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `-1` when the child was terminated by a signal.
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs an [`Invocation`] to completion.
pub trait Runner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// Spawns real child processes with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| PassError::Launch {
            program: invocation.program_name(),
            source,
        })?;

        // A child that exits without reading all of stdin closes the pipe;
        // that outcome is carried by its exit status.
        let stdin = child.stdin.take().zip(invocation.stdin.as_deref());
        let output = thread::scope(|scope| {
            let writer = stdin.map(|(mut pipe, input)| scope.spawn(move || pipe.write_all(input)));
            let output = child.wait_with_output();
            match writer.map(|handle| handle.join()) {
                Some(Ok(Err(err))) if err.kind() != io::ErrorKind::BrokenPipe => Err(err),
                _ => output,
            }
        })?;
        Ok(ProcessOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Identifies which operation an asynchronous completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpTag {
    GitInit,
    GitPull,
    GitPush,
    GitAdd,
    GitRm,
    GitCommit,
    Show,
    Insert,
}

/// Result of a fire-and-forget invocation.
#[derive(Debug)]
pub struct Completion {
    pub tag: OpTag,
    pub result: Result<ProcessOutput>,
}

/// Blocking and fire-and-forget execution over a shared [`Runner`].
#[derive(Clone)]
pub struct Executor {
    runner: Arc<dyn Runner>,
    completions: Option<Sender<Completion>>,
}

impl Executor {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        Self {
            runner,
            completions: None,
        }
    }

    /// Deliver fire-and-forget results on `completions`.
    pub fn with_completions(mut self, completions: Sender<Completion>) -> Self {
        self.completions = Some(completions);
        self
    }

    pub fn run_blocking(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        tracing::debug!(
            program = %invocation.program.display(),
            args = ?invocation.args,
            "running"
        );
        self.runner.run(invocation)
    }

    /// Run `invocation` on a worker thread. The caller is not told when it ends
    /// unless a completion channel is attached.
    pub fn spawn(&self, tag: OpTag, invocation: Invocation) {
        let runner = Arc::clone(&self.runner);
        let completions = self.completions.clone();
        tracing::debug!(
            ?tag,
            program = %invocation.program.display(),
            args = ?invocation.args,
            "spawning"
        );
        thread::spawn(move || {
            let result = runner.run(&invocation);
            match &result {
                Ok(output) if !output.success() => {
                    tracing::warn!(?tag, status = output.status, stderr = %output.stderr_str(), "background command failed")
                }
                Err(err) => tracing::warn!(?tag, error = %err, "background command failed"),
                _ => {}
            }
            if let Some(tx) = completions {
                let _ = tx.send(Completion { tag, result });
            }
        });
    }

    pub fn runner(&self) -> &Arc<dyn Runner> {
        &self.runner
    }
}

/// `true` when `program` refers to the same executable name as `name`.
pub fn is_program(program: &Path, name: &str) -> bool {
    program == Path::new(name) || program.file_name().is_some_and(|f| f == name)
}
