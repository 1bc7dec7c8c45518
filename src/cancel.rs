//! Cooperative cancellation: a plain atomic flag set by a signal handler and
//! consulted at oracle-call boundaries, rather than a global solver pointer.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Signal;

#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>, Arc<std::sync::Mutex<Option<Signal>>>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)), Arc::new(std::sync::Mutex::new(None)))
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn cancel(&self, signal: Signal) {
        *self.1.lock().unwrap() = Some(signal);
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn signal(&self) -> Option<Signal> {
        *self.1.lock().unwrap()
    }
}
