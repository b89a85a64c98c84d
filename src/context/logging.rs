//! Logging bootstrap.
//!
//! Reads `<res>/config/logging.yaml`, points its file handler at the chosen
//! log file and installs an `env_logger` backend. Nothing here is fatal: any
//! problem leaves logging as a no-op and startup carries on.
//!
//! # Example `logging.yaml`
//!
//! ```yaml
//! root:
//!   level: INFO
//! format:
//!   timestamp: "%Y-%m-%d %H:%M:%S"
//! handlers:
//!   file_handler:
//!     filename: logs/lumos.log   # replaced at startup
//!     append: true
//!   console_handler:
//!     enabled: true
//! ```

use env_logger::{Builder, Target};
use log::LevelFilter;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::common::config::replace;

/// Location of the logging configuration inside the resource directory.
pub const LOG_CONFIG_SUBDIR: &str = "config";
pub const LOG_CONFIG_FILENAME: &str = "logging.yaml";

/// Key overwritten with the resolved log destination.
const FILE_HANDLER_FILENAME: &str = "handlers.file_handler.filename";

/// Outcome of [`setup_logging`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoggingSetup {
    /// `--log none`
    Disabled,
    /// Setup failed; logging is a no-op.
    Fallback(String),
    Configured { level: LevelFilter, filename: PathBuf },
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("malformed logging config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("logging config has no handlers.file_handler.filename: {0}")]
    MissingFileHandler(String),

    #[error("unknown log level '{0}'")]
    Level(String),

    #[error("cannot open log file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("a logger is already installed")]
    AlreadyInstalled(#[from] log::SetLoggerError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub root: RootSection,
    #[serde(default)]
    pub format: FormatSection,
    pub handlers: HandlersSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RootSection {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for RootSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatSection {
    #[serde(default = "default_timestamp")]
    pub timestamp: String,
}

impl Default for FormatSection {
    fn default() -> Self {
        Self {
            timestamp: default_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandlersSection {
    pub file_handler: FileHandlerSection,
    #[serde(default)]
    pub console_handler: ConsoleHandlerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileHandlerSection {
    pub filename: PathBuf,
    #[serde(default = "default_true")]
    pub append: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsoleHandlerSection {
    #[serde(default)]
    pub enabled: bool,
}

fn default_level() -> String {
    "INFO".to_string()
}

fn default_timestamp() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

fn default_true() -> bool {
    true
}

/// Configure process-wide logging.
///
/// - `log_file == "none"`: logging is turned off.
/// - `log_file == "auto"`: log to `default_log_file`.
/// - anything else: log to that path.
pub fn setup_logging(
    log_file: &str,
    debug: bool,
    res_path: &Path,
    default_log_file: &Path,
) -> LoggingSetup {
    if log_file == "none" {
        if debug {
            eprintln!("No logging requested; logging disabled");
        }
        log::set_max_level(LevelFilter::Off);
        return LoggingSetup::Disabled;
    }

    let config_path = res_path.join(LOG_CONFIG_SUBDIR).join(LOG_CONFIG_FILENAME);
    if debug {
        eprintln!("Log config file: {}", config_path.display());
    }
    let target = match log_file {
        "auto" => default_log_file.to_path_buf(),
        path => PathBuf::from(path),
    };

    match install(&config_path, &target, debug) {
        Ok(setup) => setup,
        Err(e) => {
            // No logger is installed on this path, so `log` macros stay no-ops.
            eprintln!("Logging setup failed; logging disabled: {}", e);
            LoggingSetup::Fallback(e.to_string())
        }
    }
}

fn install(config_path: &Path, target: &Path, debug: bool) -> Result<LoggingSetup, LoggingError> {
    let config = load_logging_config(config_path, target)?;
    if debug {
        eprintln!("Log config: {:#?}", config);
    }
    let level = effective_level(parse_level(&config.root.level)?, debug);
    let writer = LogWriter::open(&config.handlers)?;
    let timestamp = config.format.timestamp.clone();

    Builder::new()
        .format(move |buf, record| {
            writeln!(
                buf,
                "[{}] [{}] [{}] {}",
                chrono::Local::now().format(&timestamp),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(level)
        .target(Target::Pipe(Box::new(writer)))
        .try_init()?;

    Ok(LoggingSetup::Configured {
        level,
        filename: config.handlers.file_handler.filename,
    })
}

/// Read the logging config and substitute the file handler's filename.
pub fn load_logging_config(path: &Path, filename: &Path) -> Result<LoggingConfig, LoggingError> {
    let content = fs::read_to_string(path).map_err(|source| LoggingError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut tree: Value = serde_yaml::from_str(&content)?;
    let filename = Value::from(filename.to_string_lossy().into_owned());
    replace(&mut tree, FILE_HANDLER_FILENAME, filename).map_err(LoggingError::MissingFileHandler)?;
    Ok(serde_yaml::from_value(tree)?)
}

/// Map a level name (Python-style names accepted) to a filter.
pub fn parse_level(name: &str) -> Result<LevelFilter, LoggingError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "NOTSET" => Ok(LevelFilter::Trace),
        "DEBUG" => Ok(LevelFilter::Debug),
        "INFO" => Ok(LevelFilter::Info),
        "WARN" | "WARNING" => Ok(LevelFilter::Warn),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(LevelFilter::Error),
        "OFF" => Ok(LevelFilter::Off),
        _ => Err(LoggingError::Level(name.to_string())),
    }
}

/// Debug runs log at least at DEBUG; other runs never log below INFO.
pub fn effective_level(configured: LevelFilter, debug: bool) -> LevelFilter {
    if debug && configured < LevelFilter::Debug {
        LevelFilter::Debug
    } else if !debug && configured >= LevelFilter::Debug {
        LevelFilter::Info
    } else {
        configured
    }
}

/// Log file, optionally mirrored to stderr.
struct LogWriter {
    file: File,
    console: bool,
}

impl LogWriter {
    fn open(handlers: &HandlersSection) -> Result<Self, LoggingError> {
        let path = &handlers.file_handler.filename;
        let open = || -> io::Result<File> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let append = handlers.file_handler.append;
            OpenOptions::new()
                .create(true)
                .write(true)
                .append(append)
                .truncate(!append)
                .open(path)
        };
        let file = open().map_err(|source| LoggingError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            file,
            console: handlers.console_handler.enabled,
        })
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.console {
            let _ = io::stderr().write_all(buf);
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
