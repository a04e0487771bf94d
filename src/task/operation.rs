//! One external side effect per target.
//!
//! The executor is best effort: whatever the child process does, the outcome is
//! logged and returned as an [`OperationResult`], never propagated as an error.
//! A failed target must not keep the batch from reaching the next one.

use crate::task::command::{CommandOutput, CommandRunner};
use crate::task::result_error::error::Error;

use bon::Builder;
use derive_more::Display;
use getset::{CopyGetters, Getters};
use walkdir::{DirEntry, WalkDir};

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

pub static DEFAULT_SYNC_PROGRAM: &str = "rsync";
pub static DEFAULT_DELETE_PROGRAM: &str = "rm";

/// Archive, compress, verbose, and delete destination entries missing from the source.
static SYNC_FLAGS: [&str; 2] = ["-azv", "--delete"];
/// Recursive, forced, verbose.
static DELETE_FLAGS: [&str; 1] = ["-rfv"];

/// What to do with each target of a batch.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum OperationKind {
    /// Mirror the target to `destination`.
    #[display("sync to {destination}")]
    Sync { destination: String },
    /// Delete every immediate child of the target, keeping the target itself.
    #[display("delete contents")]
    DeleteContents { include_hidden: bool },
}

#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct OperationResult {
    #[getset(get = "pub")]
    target: PathBuf,
    #[getset(get = "pub")]
    program: String,
    #[getset(get = "pub")]
    standard_output: String,
    #[getset(get = "pub")]
    standard_error: String,
    /// `None` when the process never started or was killed by a signal.
    #[getset(get_copy = "pub")]
    exit_code: Option<i32>,
    #[getset(get_copy = "pub")]
    succeeded: bool,
}

impl OperationResult {
    fn from_output<P: Into<String>, T: Into<PathBuf>>(
        program: P,
        target: T,
        output: CommandOutput,
    ) -> Self {
        Self {
            target: target.into(),
            program: program.into(),
            succeeded: output.success && output.stderr.is_empty(),
            exit_code: output.exit_code,
            standard_output: output.stdout,
            standard_error: output.stderr,
        }
    }

    fn spawn_failed<P: Into<String>, T: Into<PathBuf>>(program: P, target: T, e: &io::Error) -> Self {
        Self {
            target: target.into(),
            program: program.into(),
            standard_output: String::new(),
            standard_error: e.to_string(),
            exit_code: None,
            succeeded: false,
        }
    }

    /// The failure of this operation as an [`Error::Operation`], if it failed.
    pub fn to_error(&self) -> Option<Error> {
        if self.succeeded {
            return None;
        }

        let reason = match (self.standard_error.trim(), self.exit_code) {
            ("", Some(code)) => format!("exit code {code}"),
            ("", None) => "terminated without exit code".to_string(),
            (stderr, _) => stderr.to_string(),
        };
        Some(Error::Operation {
            program: self.program.clone(),
            target: self.target.display().to_string(),
            reason,
        })
    }
}

#[derive(Builder)]
pub struct OperationExecutor<R: CommandRunner> {
    runner: R,
    #[builder(default = DEFAULT_SYNC_PROGRAM.to_string(), into)]
    sync_program: String,
    #[builder(default = DEFAULT_DELETE_PROGRAM.to_string(), into)]
    delete_program: String,
}

impl<R: CommandRunner> OperationExecutor<R> {
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Applies `kind` to one resolved target and returns one result per
    /// external invocation issued.
    pub fn execute(&self, target: &str, kind: &OperationKind) -> Vec<OperationResult> {
        match kind {
            OperationKind::Sync { destination } => vec![self.sync_target(target, destination)],
            OperationKind::DeleteContents { include_hidden } => {
                self.delete_contents_of_target(target, *include_hidden)
            }
        }
    }

    pub fn sync_target(&self, source: &str, destination: &str) -> OperationResult {
        tracing::info!(
            "Backing up source directory {} to server {}",
            source,
            destination
        );
        let args = SYNC_FLAGS
            .iter()
            .map(OsString::from)
            .chain([OsString::from(source), OsString::from(destination)])
            .collect::<Vec<_>>();
        self.invoke(&self.sync_program, Path::new(source), &args)
    }

    /// Deletes each immediate child of `target` with its own invocation. A
    /// target without children (or one that cannot be listed) issues nothing.
    pub fn delete_contents_of_target(
        &self,
        target: &str,
        include_hidden: bool,
    ) -> Vec<OperationResult> {
        tracing::info!("deleting files in {}", target);

        list_children(target, include_hidden)
            .into_iter()
            .map(|child| {
                tracing::info!("deleting {} from {}...", child.display(), target);
                let args = DELETE_FLAGS
                    .iter()
                    .map(OsString::from)
                    .chain(std::iter::once(child.clone().into_os_string()))
                    .collect::<Vec<_>>();
                self.invoke(&self.delete_program, &child, &args)
            })
            .collect()
    }

    fn invoke(&self, program: &str, target: &Path, args: &[OsString]) -> OperationResult {
        let result = match self.runner.run(program, args) {
            Ok(output) => OperationResult::from_output(program, target, output),
            Err(e) => {
                tracing::error!("Failed to start {} for {}: {}", program, target.display(), e);
                return OperationResult::spawn_failed(program, target, &e);
            }
        };

        tracing::info!("{}", result.standard_output.trim_end_matches('\n'));
        if !result.standard_error.is_empty() {
            tracing::error!("{}", result.standard_error.trim_end_matches('\n'));
        } else if !result.succeeded {
            match result.exit_code {
                Some(code) => tracing::error!(
                    "{} exited with code {} for {}",
                    program,
                    code,
                    target.display()
                ),
                None => tracing::error!(
                    "{} was terminated by a signal for {}",
                    program,
                    target.display()
                ),
            }
        }

        result
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Immediate children of `target` in file name order.
fn list_children(target: &str, include_hidden: bool) -> Vec<PathBuf> {
    WalkDir::new(target)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|res| match res {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", target, e);
                None
            }
        })
        .filter(|entry| include_hidden || !is_hidden(entry))
        .map(DirEntry::into_path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::command::testing::RecordingRunner;
    use crate::task::logging::LogContext;
    use crate::task::settings::Settings;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn executor(runner: RecordingRunner) -> OperationExecutor<RecordingRunner> {
        OperationExecutor::builder().runner(runner).build()
    }

    fn path_str(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Runs `f` with a logging context installed and returns its log file content.
    fn with_log_file<T, F: FnOnce() -> T>(f: F) -> (T, String) {
        let log_dir = TempDir::new().unwrap();
        let settings = Settings::builder().log_dir(log_dir.path()).build();
        let (value, log_file) = {
            let ctx = LogContext::init(&settings, "clean_temp_directories").unwrap();
            (f(), ctx.log_file().clone())
        };
        (value, std::fs::read_to_string(log_file).unwrap())
    }

    #[test]
    fn test_sync_target_issues_mirror_command() {
        let executor = executor(RecordingRunner::default());
        let result = executor.sync_target("/data/a", "backup@host:/bak");

        assert!(result.succeeded());
        assert_eq!(result.target(), Path::new("/data/a"));
        assert_eq!(result.program(), "rsync");
        assert_eq!(
            executor.runner().calls(),
            vec![(
                "rsync".to_string(),
                vec![
                    "-azv".to_string(),
                    "--delete".to_string(),
                    "/data/a".to_string(),
                    "backup@host:/bak".to_string()
                ]
            )]
        );
    }

    #[test]
    fn test_sync_target_failure_is_captured_not_raised() {
        let executor = executor(RecordingRunner::failing_on(["backup@host:/bak"]));
        let result = executor.sync_target("/data/a", "backup@host:/bak");

        assert!(!result.succeeded());
        assert_eq!(result.exit_code(), Some(1));
        assert!(result.standard_error().contains("Permission denied"));
        match result.to_error() {
            Some(Error::Operation { program, target, .. }) => {
                assert_eq!(program, "rsync");
                assert_eq!(target, "/data/a");
            }
            other => panic!("Expected Operation error, got {other:?}"),
        }
    }

    #[test]
    fn test_spawn_failure_becomes_failed_result() {
        let runner = RecordingRunner {
            unspawnable: true,
            ..RecordingRunner::default()
        };
        let executor = executor(runner);
        let result = executor.sync_target("/data/a", "/bak");

        assert!(!result.succeeded());
        assert_eq!(result.exit_code(), None);
        assert!(result.standard_error().contains("command not found"));
    }

    #[test]
    fn test_delete_contents_issues_one_delete_per_child() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("x"), "x").unwrap();
        std::fs::create_dir(temp_dir.path().join("y")).unwrap();
        std::fs::write(temp_dir.path().join("y/nested"), "nested").unwrap();

        let target = path_str(temp_dir.path());
        let executor = executor(RecordingRunner::default());
        let results = executor.delete_contents_of_target(&target, false);

        assert_eq!(results.len(), 2);
        let deleted: HashSet<_> = executor.runner().last_args().into_iter().collect();
        let expected: HashSet<_> = [format!("{target}/x"), format!("{target}/y")]
            .into_iter()
            .collect();
        assert_eq!(deleted, expected);
        assert!(executor
            .runner()
            .calls()
            .iter()
            .all(|(program, args)| program == "rm" && args[0] == "-rfv"));
    }

    #[test]
    fn test_delete_contents_of_empty_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let target = path_str(temp_dir.path());
        let executor = executor(RecordingRunner::default());

        let (results, log) = with_log_file(|| executor.delete_contents_of_target(&target, false));

        assert!(results.is_empty());
        assert!(executor.runner().calls().is_empty());
        let announce = format!("\tdeleting files in {target}");
        assert_eq!(log.lines().filter(|l| l.ends_with(&announce)).count(), 1);
        assert!(!log
            .lines()
            .any(|l| l.contains("\tdeleting ") && l.contains(" from ")));
    }

    #[test]
    fn test_delete_contents_of_missing_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let missing = path_str(&temp_dir.path().join("missing"));
        let executor = executor(RecordingRunner::default());

        assert!(executor.delete_contents_of_target(&missing, false).is_empty());
        assert!(executor.runner().calls().is_empty());
    }

    #[test]
    fn test_delete_contents_skips_hidden_unless_asked() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(".keep"), "").unwrap();
        std::fs::write(temp_dir.path().join("cache.bin"), "").unwrap();
        let target = path_str(temp_dir.path());

        let executor = executor(RecordingRunner::default());
        assert_eq!(executor.delete_contents_of_target(&target, false).len(), 1);
        assert_eq!(executor.delete_contents_of_target(&target, true).len(), 2);
    }

    #[test]
    fn test_delete_failure_does_not_stop_siblings() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            std::fs::write(temp_dir.path().join(name), name).unwrap();
        }
        let target = path_str(temp_dir.path());

        let executor = executor(RecordingRunner::failing_on([format!("{target}/a")]));
        let results = executor.delete_contents_of_target(&target, false);

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.succeeded()).count(), 2);
    }

    #[test]
    fn test_output_streams_are_logged_per_level() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a", "b"] {
            std::fs::write(temp_dir.path().join(name), name).unwrap();
        }
        let target = path_str(temp_dir.path());
        let executor = executor(RecordingRunner::failing_on([format!("{target}/a")]));

        let (results, log) = with_log_file(|| executor.delete_contents_of_target(&target, false));

        assert_eq!(results.len(), 2);
        assert!(log.lines().any(|l| l.starts_with("[ERROR]")
            && l.ends_with(&format!("cannot process {target}/a: Permission denied"))));
        assert!(log
            .lines()
            .any(|l| l.starts_with("[INFO]") && l.ends_with(&format!("\tprocessed {target}/b"))));
        assert!(!log
            .lines()
            .any(|l| l.starts_with("[ERROR]") && l.contains(&format!("{target}/b"))));
        assert!(!log.contains("\n\n"));
    }

    #[test]
    fn test_execute_dispatches_on_kind() {
        let executor = executor(RecordingRunner::default());
        let kind = OperationKind::Sync {
            destination: "/bak".to_string(),
        };
        assert_eq!(executor.execute("/data/a", &kind).len(), 1);
        assert_eq!(kind.to_string(), "sync to /bak");
    }

    #[test]
    fn test_custom_program_names() {
        let executor = OperationExecutor::builder()
            .runner(RecordingRunner::default())
            .sync_program("/usr/local/bin/rsync")
            .build();
        executor.sync_target("/data/a", "/bak");

        assert_eq!(executor.runner().calls()[0].0, "/usr/local/bin/rsync");
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_contents_with_real_rm() {
        use crate::task::command::SystemCommandRunner;

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("x"), "x").unwrap();
        std::fs::create_dir_all(temp_dir.path().join("y/deeper")).unwrap();
        std::fs::write(temp_dir.path().join("y/deeper/z"), "z").unwrap();

        let executor = OperationExecutor::builder()
            .runner(SystemCommandRunner)
            .build();
        let results = executor.delete_contents_of_target(&path_str(temp_dir.path()), false);

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(OperationResult::succeeded));
        assert!(temp_dir.path().is_dir());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_contents_removes_non_utf8_names() {
        use crate::task::command::SystemCommandRunner;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"bad\xffname");
        std::fs::write(temp_dir.path().join(name), "x").unwrap();

        let executor = OperationExecutor::builder()
            .runner(SystemCommandRunner)
            .build();
        let results = executor.delete_contents_of_target(&path_str(temp_dir.path()), false);

        assert_eq!(results.len(), 1);
        assert!(results[0].succeeded());
        assert_eq!(results[0].target(), &temp_dir.path().join(name));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
