//! # sys_admin
//!
//! Configuration-driven maintenance tasks for a single host.
//!
//! ## Tasks
//!
//! - **backup**: mirrors each configured source directory to a backup
//!   destination with `rsync -azv --delete`
//! - **clean**: empties each configured temporary directory, deleting every
//!   immediate child with `rm -rfv`
//!
//! Both tasks read the same kind of JSON document, resolve their targets below
//! `homeDirectory` and run one target after another. A failing target is
//! logged and recorded in the [`BatchReport`](task::batch::BatchReport); it
//! never stops the rest of the batch.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sys_admin::task::batch::run_configured_task;
//! use sys_admin::task::command::SystemCommandRunner;
//! use sys_admin::task::logging::LogContext;
//! use sys_admin::task::operation::OperationExecutor;
//! use sys_admin::task::settings::Settings;
//! use sys_admin::task::task_config::{BackupConfig, TaskConfig};
//!
//! let settings = Settings::builder().log_dir("/var/log/sys_admin").build();
//! let _log = LogContext::init(&settings, BackupConfig::TASK_NAME)?;
//! let executor = OperationExecutor::builder().runner(SystemCommandRunner).build();
//! let report = run_configured_task::<BackupConfig, _>(&settings, executor)?;
//! println!("{} of {} succeeded", report.succeeded_count(), report.total());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod task;
