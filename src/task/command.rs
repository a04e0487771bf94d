//! Blocking subprocess invocation.
//!
//! Operations never talk to `std::process` directly; they go through a
//! [`CommandRunner`] so a batch can be exercised without touching the system.

use itertools::Itertools;

use std::ffi::OsString;
use std::io;
use std::process::{Command, Output, Stdio};

/// Fully captured result of one finished child process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

pub trait CommandRunner {
    /// Runs `program` with `args`, waits for it to exit and returns both streams.
    ///
    /// Arguments are passed to the child byte for byte, so paths that are not
    /// valid UTF-8 reach it intact. An `Err` means the process could not be
    /// started at all.
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Spawns real child processes. No timeout: a hung child blocks the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<CommandOutput> {
        tracing::debug!(
            "Running {} {}",
            program,
            args.iter().map(|arg| arg.to_string_lossy()).join(" ")
        );
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map(CommandOutput::from)
    }
}
