//! Concurrent first use of the global context.

use clap::Parser;
use lumos::{Context, Options};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_racing_create_instance_share_one_context() {
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let options = Options::parse_from(["lumos", "--log", "none"]);
                barrier.wait();
                Context::create_instance(options).map(|c| c as *const Context as usize)
            })
        })
        .collect();

    let addresses: Vec<usize> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();
    assert!(addresses.iter().all(|&a| a == addresses[0]));
}
