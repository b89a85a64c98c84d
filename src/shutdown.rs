//! Ctrl+C handling for blocking driver loops.
//!
//! The driver loops in this crate are plain blocking loops, so interruption
//! is reported through a flag they poll once per iteration.

use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheap, cloneable "stop requested" flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that is raised on the first Ctrl+C.
    ///
    /// The signal is awaited on a small background thread with its own
    /// runtime. If the handler cannot be installed the flag simply never
    /// fires.
    pub fn on_ctrl_c() -> Self {
        let interrupt = Self::new();
        let watcher = interrupt.clone();
        let spawned = std::thread::Builder::new()
            .name("ctrl-c".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        warn!("Cannot watch for Ctrl+C: {}", e);
                        return;
                    }
                };
                match runtime.block_on(tokio::signal::ctrl_c()) {
                    Ok(()) => {
                        info!("Received Ctrl+C");
                        watcher.trigger();
                    }
                    Err(e) => warn!("Cannot watch for Ctrl+C: {}", e),
                }
            });
        if let Err(e) = spawned {
            warn!("Cannot watch for Ctrl+C: {}", e);
        }
        interrupt
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let interrupt = Interrupt::new();
        let other = interrupt.clone();
        assert!(!other.is_triggered());
        interrupt.trigger();
        assert!(other.is_triggered());
    }
}
