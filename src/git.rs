use crate::error::Result;
use crate::process::{Executor, Invocation, OpTag, ProcessOutput};
use git2::Repository;
use std::path::{Path, PathBuf};

/// Suffix of every commit message the store writes.
pub const COMMIT_SUFFIX: &str = "using pass-imitate.";

/// `true` when `path` is inside a git work tree.
pub fn is_repository(path: impl AsRef<Path>) -> bool {
    Repository::discover(path).is_ok()
}

/// Build a commit message such as `Add for mail/work using pass-imitate.`
pub fn commit_message(action: &str, name: &str) -> String {
    format!("{action} for {name} {COMMIT_SUFFIX}")
}

/// git command line, run from the store root.
#[derive(Clone)]
pub struct Git {
    executor: Executor,
    program: PathBuf,
    workdir: PathBuf,
}

impl Git {
    pub fn new(executor: Executor, program: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(&self.program, args).current_dir(&self.workdir)
    }

    fn run<I, S>(&self, args: I) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_invocation(self.invocation(args))
    }

    fn run_invocation(&self, invocation: Invocation) -> Result<ProcessOutput> {
        let output = self.executor.run_blocking(&invocation)?;
        if !output.success() {
            tracing::warn!(
                args = ?invocation.args,
                status = output.status,
                stderr = %output.stderr_str().trim(),
                "git exited with an error"
            );
        }
        Ok(output)
    }

    /// Create a repository at the store root.
    pub fn init(&self) -> Result<ProcessOutput> {
        let root = self.workdir.to_string_lossy().into_owned();
        self.run(["init".to_string(), root])
    }

    pub fn pull_blocking(&self) -> Result<ProcessOutput> {
        self.run(["pull"])
    }

    pub fn pull(&self) {
        self.executor.spawn(OpTag::GitPull, self.invocation(["pull"]));
    }

    pub fn push(&self) {
        self.executor.spawn(OpTag::GitPush, self.invocation(["push"]));
    }

    pub fn add(&self, path: &Path) -> Result<ProcessOutput> {
        self.run_invocation(self.invocation(["add", "--"]).arg_path(path))
    }

    /// Tracked delete of `path`, recursive for directories.
    pub fn rm(&self, path: &Path, recursive: bool) -> Result<ProcessOutput> {
        let flag = if recursive { "-rf" } else { "-f" };
        self.run_invocation(self.invocation(["rm", flag]).arg_path(path))
    }

    /// Commit only `paths` with `message`.
    pub fn commit(&self, paths: &[&Path], message: &str) -> Result<ProcessOutput> {
        let mut invocation = self.invocation(["commit", "-m", message, "--"]);
        for path in paths {
            invocation = invocation.arg_path(path);
        }
        self.run_invocation(invocation)
    }
}
