//! Remote event collection.

use lumos::net::event_logger::DEFAULT_SEP;
use lumos::rpc::{Caller, RpcClient};
use lumos::{EventLogger, EventLoggerOptions, Payload};
use serde_json::Value;
use std::fs;
use std::time::Duration;

#[test]
fn test_remote_events_reach_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");
    let mut logger = EventLogger::new(EventLoggerOptions {
        filename: Some(path.clone()),
        port: 0,
        ..Default::default()
    });
    assert!(logger.server_started());
    let port = logger.port().unwrap();

    let mut producer = RpcClient::new("127.0.0.1", port, Duration::from_secs(5)).unwrap();
    for (tag, message) in [("detector", "person found"), ("tracker", "lost track 3")] {
        let reply = producer
            .call("EventLogger.log", vec![Value::from(tag), Value::from(message)])
            .unwrap();
        assert_eq!(reply, Payload::Empty);
    }
    logger.log("local", "done").unwrap();
    logger.stop();

    let content = fs::read_to_string(&path).unwrap();
    let rows: Vec<Vec<&str>> = content
        .lines()
        .map(|line| line.split(DEFAULT_SEP).collect())
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!((rows[0][0], rows[0][2]), ("detector", "person found"));
    assert_eq!((rows[1][0], rows[1][2]), ("tracker", "lost track 3"));
    assert_eq!(rows[2][0], "local");

    let stamps: Vec<f64> = rows.iter().map(|row| row[1].parse().unwrap()).collect();
    assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));

    // The server is gone once stopped.
    producer.close();
    assert!(producer.call("EventLogger.log", vec![]).is_err());
}
