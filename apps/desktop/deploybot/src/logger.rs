//! Colored stdout plus `deploybot.log` in the app's log directory.

use crate::error::DeployBotError;

use common::ErrorLocation;

use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::{Dispatch, FormatCallback};
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

const LOG_FILE_NAME: &str = "deploybot.log";

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// The WebSocket stack logs every frame at debug; the bridge logs what matters.
const QUIET_MODULES: [&str; 2] = ["tungstenite", "tokio_tungstenite"];

/// Install the global logger writing to stdout and `{log_dir}/deploybot.log`.
///
/// The log file is opened on every call, so an unusable directory is always
/// reported. Only the first successful call installs the logger; later calls
/// warn and return `Ok`.
///
/// # Errors
///
/// Returns [`DeployBotError::DeployBot`] if the log file can't be opened or a
/// logger is already installed by someone else.
pub fn initialize(log_dir: &Path) -> Result<(), DeployBotError> {
    let log_file = open_log_file(log_dir)?;

    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());
    INIT_LOGGER_ONCE.call_once(|| {
        result = install(log_file);
        if result.is_ok() {
            info!("Logging at {LOG_LEVEL:?} to {}", log_dir.join(LOG_FILE_NAME).display());
        }
    });
    result
}

#[track_caller]
fn open_log_file(log_dir: &Path) -> Result<File, DeployBotError> {
    fern::log_file(log_dir.join(LOG_FILE_NAME)).map_err(|e| DeployBotError::DeployBot {
        message: format!("Failed to create log file: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

fn write_line(
    out: FormatCallback<'_>,
    message: &Arguments<'_>,
    record: &Record<'_>,
    level: impl Display,
) {
    out.finish(format_args!(
        "[{} - {level}] {message} [{}:{}]",
        format_rfc3339(SystemTime::now()),
        record.file().unwrap_or("unknown"),
        record.line().unwrap_or(0),
    ))
}

#[track_caller]
fn install(log_file: File) -> Result<(), DeployBotError> {
    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let console = Dispatch::new()
        .format(move |out, message, record| {
            write_line(out, message, record, colors.color(record.level()))
        })
        .chain(stdout());

    let file = Dispatch::new()
        .format(|out, message, record| write_line(out, message, record, record.level()))
        .chain(log_file);

    QUIET_MODULES
        .iter()
        .fold(Dispatch::new().level(LOG_LEVEL), |dispatch, module| {
            dispatch.level_for(*module, LevelFilter::Warn)
        })
        .chain(console)
        .chain(file)
        .apply()
        .map_err(|e| DeployBotError::DeployBot {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
