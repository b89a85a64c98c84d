//! # Application Context
//!
//! Process-wide state every lumos program starts with:
//! - resolved command-line [`Options`]
//! - the YAML configuration mapping
//! - the absolute resource path
//! - logging, configured once
//! - classification of the input source
//! - application time with pause/resume
//! - an optional background RPC server (`--rpc`)
//!
//! ## Lifecycle
//!
//! At most one `Context` is ever constructed per process. Programs normally
//! build it once in `main` and pass `&Context` down:
//!
//! ```ignore
//! let context = Context::new(Options::parse())?;
//! run(&context)?;
//! ```
//!
//! Code that cannot receive the context explicitly may use
//! [`Context::create_instance`] / [`Context::get_instance`] instead.

pub mod input_source;
pub mod logging;
pub mod options;
pub mod timeline;

use chrono::{DateTime, Local};
use log::{error, info, warn};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use crate::common::clock::{Clock, SystemClock};
use crate::common::config::{load_config, lookup, lookup_port};
use crate::error::ContextError;
use crate::rpc::{Registry, RpcServer, DEFAULT_PORT};

pub use input_source::{classify_input_source, Endpoint, InputSource};
pub use logging::LoggingSetup;
pub use options::Options;
pub use timeline::Timeline;

/// Set by the first construction attempt that gets past the singleton check.
static CONSTRUCTED: AtomicBool = AtomicBool::new(false);
static INSTANCE: OnceLock<Context> = OnceLock::new();
/// Serializes construct-if-absent in `create_instance`.
static CREATE_LOCK: Mutex<()> = Mutex::new(());

pub struct Context {
    options: Options,
    config: Mapping,
    res_path: PathBuf,
    logging: LoggingSetup,
    input: InputSource,
    timeline: Mutex<Timeline>,
    rpc_server: Option<RpcServer>,
}

impl Context {
    /// Build the process context.
    ///
    /// # Errors
    /// - `SingletonViolation` if a context was already built in this process
    /// - `ConfigLoad` / `ConfigFormat` if the configuration file is unusable
    ///
    /// Logging, input source and RPC problems are logged and never fail
    /// construction.
    pub fn new(options: Options) -> Result<Self, ContextError> {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    /// Like [`Context::new`], with an explicit time source for the timeline.
    pub fn with_clock(options: Options, clock: Arc<dyn Clock>) -> Result<Self, ContextError> {
        if CONSTRUCTED.swap(true, Ordering::SeqCst) {
            return Err(ContextError::SingletonViolation);
        }
        let built = Self::build(options, clock);
        if built.is_err() {
            // A failed startup does not count as the process's context.
            CONSTRUCTED.store(false, Ordering::SeqCst);
        }
        built
    }

    /// Return the global context, constructing it on first use.
    ///
    /// Unlike [`Context::new`], a second call is not an error: it logs a
    /// warning and returns the existing instance (`options` are ignored).
    pub fn create_instance(options: Options) -> Result<&'static Context, ContextError> {
        let _guard = CREATE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = INSTANCE.get() {
            warn!("Context already created");
            return Ok(existing);
        }
        let context = Self::new(options)?;
        Ok(INSTANCE.get_or_init(|| context))
    }

    /// The global context created by [`Context::create_instance`].
    pub fn get_instance() -> Result<&'static Context, ContextError> {
        INSTANCE.get().ok_or(ContextError::NotInitialized)
    }

    fn build(mut options: Options, clock: Arc<dyn Clock>) -> Result<Self, ContextError> {
        let debug = options.debug;
        if debug {
            eprintln!("Options: {:#?}", options);
        }

        let config = load_config(&options.config_file)?;
        if debug {
            eprintln!("Loaded configuration: {:#?}", config);
        }

        let res_path = input_source::absolute_path(&options.res_path);
        if debug {
            eprintln!("Resource path: {}", res_path.display());
        }

        // Before anything else that logs.
        let logging = logging::setup_logging(
            &options.log_file,
            debug,
            &res_path,
            Path::new(options::DEFAULT_LOG_FILE),
        );

        options.resolve_delay();

        let input = classify_input_source(&options.input_source);
        info!("Input source: {:?}", input);

        let rpc_server = options.rpc_port.and_then(|port| {
            let port = port.unwrap_or(DEFAULT_PORT);
            match RpcServer::start(port, Registry::new()) {
                Ok(server) => Some(server),
                Err(e) => {
                    error!("RPC server not started: {}", e);
                    None
                }
            }
        });

        let mut timeline = Timeline::new(clock);
        timeline.reset();

        Ok(Self {
            options,
            config,
            res_path,
            logging,
            input,
            timeline: Mutex::new(timeline),
            rpc_server,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn config(&self) -> &Mapping {
        &self.config
    }

    /// Look up a dotted path such as `"camera.width"` in the configuration.
    pub fn config_value(&self, dotted_path: &str) -> Option<&Value> {
        lookup(&self.config, dotted_path)
    }

    /// Port configured at `dotted_path`, or `default` when absent or invalid.
    pub fn config_port(&self, dotted_path: &str, default: u16) -> u16 {
        lookup_port(&self.config, dotted_path).unwrap_or(default)
    }

    pub fn res_path(&self) -> &Path {
        &self.res_path
    }

    /// Absolute path of `<res_path>/<subdir>/<filename>`.
    pub fn get_resource_path(&self, subdir: &str, filename: &str) -> PathBuf {
        self.res_path.join(subdir).join(filename)
    }

    pub fn logging(&self) -> &LoggingSetup {
        &self.logging
    }

    pub fn debug(&self) -> bool {
        self.options.debug
    }

    pub fn gui(&self) -> bool {
        self.options.gui_enabled()
    }

    /// Update-loop delay: `--delay`, or 10 ms in GUI mode.
    pub fn delay(&self) -> Option<Duration> {
        self.options.delay_duration()
    }

    pub fn input_source(&self) -> &InputSource {
        &self.input
    }

    pub fn is_dir(&self) -> bool {
        self.input.is_dir()
    }

    pub fn is_image(&self) -> bool {
        self.input.is_image()
    }

    pub fn is_video(&self) -> bool {
        self.input.is_video()
    }

    pub fn is_remote(&self) -> bool {
        self.input.is_remote()
    }

    pub fn remote_endpoint(&self) -> Option<&Endpoint> {
        self.input.remote_endpoint()
    }

    /// Background RPC server started by `--rpc`, if any. Objects exported
    /// onto it become callable immediately.
    pub fn rpc_server(&self) -> Option<&RpcServer> {
        self.rpc_server.as_ref()
    }

    pub fn is_rpc_enabled(&self) -> bool {
        self.rpc_server.is_some()
    }

    fn timeline(&self) -> MutexGuard<'_, Timeline> {
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset_time(&self) {
        self.timeline().reset();
    }

    /// Advance application time; frozen while paused.
    pub fn update(&self) -> Duration {
        self.timeline().update()
    }

    pub fn pause(&self) {
        self.timeline().pause();
    }

    pub fn resume(&self) {
        self.timeline().resume();
    }

    /// Elapsed application time as of the last [`Context::update`].
    pub fn time_now(&self) -> Duration {
        self.timeline().time_now()
    }

    pub fn is_paused(&self) -> bool {
        self.timeline().is_paused()
    }

    /// Wall-clock time of the last time reset.
    pub fn started_at(&self) -> DateTime<Local> {
        self.timeline().started_at()
    }
}
