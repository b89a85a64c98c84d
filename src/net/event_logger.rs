//! # Event Logger
//!
//! Collects timestamped events from remote processes into one flat file.
//! Each `EventLogger.log(tag, message)` call appends
//!
//! ```text
//! <tag><sep><unix time, seconds><sep><message>
//! ```
//!
//! Timestamps are absolute wall-clock time taken when the call arrives, so
//! events from several producers share one time base.

use anyhow::Context as _;
use chrono::{DateTime, Local, Utc};
use log::{error, info, warn};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::common::messages::Payload;
use crate::context::Context;
use crate::rpc::{Export, Handler, Registry, RpcServer};

pub const DEFAULT_PORT: u16 = 62626;
pub const DEFAULT_SEP: &str = "\t";
/// Used to build default filenames.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone)]
pub struct EventLoggerOptions {
    /// Output file; `logs/events_<timestamp>.log` when `None`.
    pub filename: Option<PathBuf>,
    pub sep: String,
    pub port: u16,
    /// Make `EventLogger.log` callable remotely.
    pub rpc_export: bool,
    /// Serve the export from a dedicated server on `port`. Otherwise it is
    /// exported onto the context's `--rpc` server, if there is one.
    pub start_server: bool,
}

impl Default for EventLoggerOptions {
    fn default() -> Self {
        Self {
            filename: None,
            sep: DEFAULT_SEP.to_string(),
            port: DEFAULT_PORT,
            rpc_export: true,
            start_server: true,
        }
    }
}

/// Output stream shared with the RPC handler.
struct Sink {
    out: Mutex<Option<BufWriter<File>>>,
    sep: String,
}

impl Sink {
    fn out(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, tag: &str, message: &str) -> io::Result<()> {
        let now = Utc::now();
        let timestamp = format!("{:.6}", now.timestamp_micros() as f64 / 1_000_000.0);
        match self.out().as_mut() {
            Some(out) => writeln!(out, "{}{sep}{}{sep}{}", tag, timestamp, message, sep = self.sep),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "event log is not open")),
        }
    }

    fn close(&self) -> io::Result<()> {
        match self.out().take() {
            Some(mut out) => out.flush(),
            None => Ok(()),
        }
    }
}

pub struct EventLogger {
    filename: PathBuf,
    init_time: DateTime<Local>,
    sink: Arc<Sink>,
    server: Option<RpcServer>,
    /// Shared registry `EventLogger.log` was exported onto, if any.
    exported: Option<Registry>,
}

impl EventLogger {
    /// Open the output file and, if requested, start serving `EventLogger.log`.
    ///
    /// Failures are logged, not returned: the logger is still created, and
    /// [`EventLogger::log`] reports errors if the file could not be opened.
    pub fn new(options: EventLoggerOptions) -> Self {
        let init_time = Local::now();
        let filename = options
            .filename
            .clone()
            .unwrap_or_else(|| default_filename(init_time));

        let mut logger = Self {
            filename,
            init_time,
            sink: Arc::new(Sink {
                out: Mutex::new(None),
                sep: options.sep.clone(),
            }),
            server: None,
            exported: None,
        };

        match logger.open_and_serve(&options) {
            Ok(()) => info!(
                "Logger successfully initialized; filename: {}",
                logger.filename.display()
            ),
            Err(e) => error!("Error opening log file or starting RPC server: {:#}", e),
        }
        logger
    }

    fn open_and_serve(&mut self, options: &EventLoggerOptions) -> anyhow::Result<()> {
        if let Some(parent) = self.filename.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let file = File::create(&self.filename)
            .with_context(|| format!("cannot open {}", self.filename.display()))?;
        *self.sink.out() = Some(BufWriter::new(file));

        if !options.rpc_export {
            return Ok(());
        }
        if options.start_server {
            let registry = Registry::new();
            registry.export(&*self);
            self.server = Some(RpcServer::start(options.port, registry)?);
        } else {
            match Context::get_instance().ok().and_then(Context::rpc_server) {
                Some(server) => {
                    server.export(&*self);
                    self.exported = Some(server.registry().clone());
                }
                None => warn!("No RPC server running; EventLogger.log is not exported"),
            }
        }
        Ok(())
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn init_time(&self) -> DateTime<Local> {
        self.init_time
    }

    pub fn server_started(&self) -> bool {
        self.server.is_some()
    }

    /// Port of this logger's own RPC server, if it started one.
    pub fn port(&self) -> Option<u16> {
        self.server.as_ref().map(RpcServer::port)
    }

    /// Append one event line.
    pub fn log(&self, tag: &str, message: &str) -> io::Result<()> {
        self.sink.log(tag, message)
    }

    /// Flush and close the file and stop the logger's own server.
    pub fn stop(&mut self) {
        if let Err(e) = self.sink.close() {
            error!("Error closing event log {}: {}", self.filename.display(), e);
        }
        if let Some(registry) = self.exported.take() {
            registry.unexport(<Self as Export>::CLASS_NAME);
        }
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
        info!("Logger stopped");
    }
}

impl Export for EventLogger {
    const CLASS_NAME: &'static str = "EventLogger";

    fn handlers(&self) -> Vec<(&'static str, Handler)> {
        let sink = Arc::clone(&self.sink);
        let log: Handler = Arc::new(move |args: Vec<Value>| {
            let mut args = args.into_iter().map(value_text);
            let (Some(tag), Some(message)) = (args.next(), args.next()) else {
                return Payload::Error("usage: EventLogger.log(tag, message)".to_string());
            };
            match sink.log(&tag, &message) {
                Ok(()) => Payload::Empty,
                Err(e) => Payload::Error(e.to_string()),
            }
        });
        vec![("log", log)]
    }
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        if self.server.is_some() || self.exported.is_some() || self.sink.out().is_some() {
            self.stop();
        }
    }
}

fn default_filename(init_time: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("logs/events_{}.log", init_time.format(TIMESTAMP_FORMAT)))
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_logger(path: &Path, sep: &str) -> EventLogger {
        EventLogger::new(EventLoggerOptions {
            filename: Some(path.to_path_buf()),
            sep: sep.to_string(),
            rpc_export: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let mut logger = local_logger(&path, DEFAULT_SEP);
        assert!(!logger.server_started());

        let before = Utc::now().timestamp() as f64;
        logger.log("cam0", "frame dropped").unwrap();
        logger.log("cam1", "started").unwrap();
        logger.stop();
        let after = Utc::now().timestamp() as f64 + 1.0;

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields[0], "cam0");
        let stamp: f64 = fields[1].parse().unwrap();
        assert!(stamp >= before && stamp <= after, "timestamp {}", stamp);
        assert_eq!(fields[2], "frame dropped");
        assert!(lines[1].starts_with("cam1\t"));
    }

    #[test]
    fn test_custom_separator_and_handler() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("events.csv");
        let mut logger = local_logger(&path, ",");

        let registry = Registry::new();
        registry.export(&logger);
        let reply = registry.dispatch("EventLogger.log", vec![Value::from("t"), Value::from(42)]);
        assert_eq!(reply, Payload::Empty);
        let bad = registry.dispatch("EventLogger.log", vec![Value::from("only tag")]);
        assert!(matches!(bad, Payload::Error(_)));
        logger.stop();

        let content = fs::read_to_string(&path).unwrap();
        let fields: Vec<&str> = content.trim_end().split(',').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!((fields[0], fields[2]), ("t", "42"));
    }

    #[test]
    fn test_unopenable_file_leaves_degraded_logger() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();

        let logger = local_logger(&blocker.join("events.log"), DEFAULT_SEP);
        assert!(logger.log("tag", "lost").is_err());
    }

    #[test]
    fn test_log_after_stop_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = local_logger(&dir.path().join("e.log"), DEFAULT_SEP);
        logger.stop();
        assert!(logger.log("late", "event").is_err());
    }

    #[test]
    fn test_default_filename_uses_timestamp() {
        let at = Local::now();
        let name = default_filename(at);
        assert_eq!(
            name,
            PathBuf::from(format!("logs/events_{}.log", at.format("%Y-%m-%d_%H-%M-%S")))
        );
    }
}
