//! Image publishing over a real TCP connection.

use lumos::common::messages::Frame;
use lumos::net::image_server::MAX_WAIT_DURATION;
use lumos::rpc::{Caller, RpcClient};
use lumos::{ImageClient, ImageServer, Payload};
use serde_json::Value;
use std::time::{Duration, Instant};

fn gradient(width: u32, height: u32) -> Frame {
    let data = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
    Frame::new(width, height, 3, data).unwrap()
}

#[test]
fn test_client_receives_latest_image() {
    let mut server = ImageServer::new(0).unwrap();
    let port = server.port().unwrap();

    let first = gradient(64, 48);
    server.write(first.clone());

    let mut client = ImageClient::with_timeout("127.0.0.1", port, Duration::from_secs(5)).unwrap();
    assert_eq!(client.read(), Some(first));

    let second = gradient(32, 16);
    server.write(second.clone());
    assert_eq!(client.read(), Some(second.clone()));
    assert_eq!(client.read(), Some(second));

    server.stop();
    assert_eq!(client.read(), None);
}

#[test]
fn test_unwritten_server_ends_stream_after_bounded_wait() {
    let server = ImageServer::new(0).unwrap();
    let port = server.port().unwrap();
    let mut client = ImageClient::with_timeout("127.0.0.1", port, Duration::from_secs(5)).unwrap();

    let started = Instant::now();
    assert_eq!(client.read(), None);
    let waited = started.elapsed();
    assert!(waited >= MAX_WAIT_DURATION, "returned after {:?}", waited);
    assert!(waited < Duration::from_secs(5), "returned after {:?}", waited);

    // Only the first read waits.
    let started = Instant::now();
    assert_eq!(client.read(), None);
    assert!(started.elapsed() < MAX_WAIT_DURATION);
}

#[test]
fn test_unknown_call_and_missing_server() {
    let server = ImageServer::new(0).unwrap();
    let port = server.port().unwrap();

    let mut rpc = RpcClient::new("127.0.0.1", port, Duration::from_secs(5)).unwrap();
    let reply = rpc.call("ImageServer.write", vec![Value::Null]).unwrap();
    assert!(matches!(reply, Payload::Error(_)));

    drop(server);
    let mut client = ImageClient::with_timeout("127.0.0.1", port, Duration::from_secs(1)).unwrap();
    assert_eq!(client.read(), None);
}
