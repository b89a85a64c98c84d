//! The process-wide context can only be built once.

use clap::Parser;
use lumos::{Context, ContextError, EventLogger, EventLoggerOptions, Options};

#[test]
fn test_singleton_lifecycle() {
    assert!(matches!(
        Context::get_instance(),
        Err(ContextError::NotInitialized)
    ));

    let options = Options::parse_from(["lumos", "--log", "none", "--no_gui", "--rpc", "0"]);
    let first = Context::create_instance(options.clone()).unwrap();
    assert!(!first.gui());
    assert_eq!(first.delay(), None);
    assert_eq!(first.input_source().device_index(), Some(0));
    assert!(first.is_rpc_enabled());

    // A second create_instance hands back the same context.
    let second = Context::create_instance(Options::parse_from(["lumos", "--debug"])).unwrap();
    assert!(std::ptr::eq(first, second));
    assert!(!second.debug());

    let again = Context::get_instance().unwrap();
    assert!(std::ptr::eq(first, again));

    assert!(matches!(
        Context::new(options),
        Err(ContextError::SingletonViolation)
    ));

    // Loggers without a server of their own export onto the context's.
    let dir = tempfile::tempdir().unwrap();
    let mut logger = EventLogger::new(EventLoggerOptions {
        filename: Some(dir.path().join("events.log")),
        start_server: false,
        ..Default::default()
    });
    let names = first.rpc_server().unwrap().registry().names();
    assert_eq!(names, vec!["EventLogger.log".to_string()]);

    // Stopping withdraws the call from the shared server.
    logger.stop();
    assert!(first.rpc_server().unwrap().registry().names().is_empty());
}
