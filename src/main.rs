use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::exit;
use sys_admin::task::batch::run_configured_task;
use sys_admin::task::command::SystemCommandRunner;
use sys_admin::task::logging::LogContext;
use sys_admin::task::operation::OperationExecutor;
use sys_admin::task::settings::{RunMode, Settings, DEFAULT_CONFIG_PATH};
use sys_admin::task::task_config::{BackupConfig, CleanupConfig, TaskConfig};
use tracing::{error, info};

/// Mirror source directories to a backup host, or empty temporary directories
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory for the dated log file (required)
    #[arg(long, env = "BACKUP_DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// Log verbosity: dev logs debug lines, prod starts at info
    #[arg(long, env = "RUN_STATE", value_enum, ignore_case = true, default_value_t, global = true)]
    run_state: RunMode,

    /// Location of the JSON task document
    #[arg(short, long, env = "BACKUP_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Exit with status 1 when any operation of the batch failed
    #[arg(long, env = "SYS_ADMIN_STRICT", global = true)]
    strict: bool,

    #[command(subcommand)]
    task: Task,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Task {
    /// Mirror every source directory to the backup destination
    Backup,
    /// Delete the contents of every temporary directory
    Clean,
}

fn main() {
    let args = Args::parse();

    let settings = match Settings::try_new(args.log_dir, args.run_state, args.config, args.strict) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };

    let code = match args.task {
        Task::Backup => run::<BackupConfig>(&settings),
        Task::Clean => run::<CleanupConfig>(&settings),
    };
    exit(code);
}

fn run<C: TaskConfig>(settings: &Settings) -> i32 {
    let log = match LogContext::init(settings, C::TASK_NAME) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };
    info!("Initialized logging!");

    let executor = OperationExecutor::builder()
        .runner(SystemCommandRunner)
        .build();
    let code = match run_configured_task::<C, _>(settings, executor) {
        Ok(report) if settings.strict() => match report.into_result() {
            Ok(()) => 0,
            Err(e) => {
                error!("{e}");
                1
            }
        },
        Ok(_) => 0,
        Err(e) => {
            error!("{e}");
            1
        }
    };

    drop(log);
    code
}
