//! Logging context for one process run.
//!
//! A [`LogContext`] owns the subscriber writing to the console and to the dated
//! log file. It is installed as the default dispatcher for as long as the
//! context lives, so every component logging through `tracing` during a run
//! ends up in the same two sinks.

use crate::task::result_error::error::Error;
use crate::task::result_error::result::Result;
use crate::task::result_error::WithMsg;
use crate::task::settings::Settings;

use chrono::{Local, NaiveDate};
use getset::Getters;
use tracing::dispatcher::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub static LOG_FILE_SUFFIX: &str = "sys_admin.log";
static LOG_FILE_DATE_FORMAT: &str = "[%m-%d-%Y]";
static LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Name of the log file written on `date`, e.g. `[02-28-2018]-sys_admin.log`.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}-{}", date.format(LOG_FILE_DATE_FORMAT), LOG_FILE_SUFFIX)
}

/// `[LEVEL]\t-\t[timestamp]\t-\t<logger name>\t<message>`
#[derive(Clone, Debug)]
pub struct LineFormat {
    logger_name: Arc<str>,
}

impl LineFormat {
    pub fn new<S: Into<Arc<str>>>(logger_name: S) -> Self {
        Self {
            logger_name: logger_name.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(
            writer,
            "[{}]\t-\t[{}]\t-\t{}\t",
            event.metadata().level(),
            Local::now().format(LINE_TIME_FORMAT),
            self.logger_name
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[derive(Getters)]
#[getset(get = "pub")]
pub struct LogContext {
    log_file: PathBuf,
    #[getset(skip)]
    _guard: DefaultGuard,
}

impl LogContext {
    /// Opens today's log file under the configured log directory and installs
    /// the console + file subscriber until the returned context is dropped.
    pub fn init<S: Into<Arc<str>>>(settings: &Settings, logger_name: S) -> Result<LogContext> {
        let logger_name = logger_name.into();
        let log_file = settings
            .log_dir()
            .join(log_file_name(Local::now().date_naive()));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(Error::from)
            .with_msg(format!("Failed to open log file {:?}", log_file))?;

        let format = LineFormat::new(logger_name);
        let subscriber = tracing_subscriber::registry()
            .with(settings.run_mode().level_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(format.clone())
                    .with_writer(std::io::stderr),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(format)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            );
        let guard = tracing::subscriber::set_default(subscriber);

        tracing::info!("Successfully initialized logger!");
        tracing::info!("Backup Logs Directory: {}", settings.log_dir().display());

        Ok(LogContext {
            log_file,
            _guard: guard,
        })
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        tracing::debug!("Closing log file {:?}", self.log_file);
    }
}
