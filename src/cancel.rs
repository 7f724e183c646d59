//! Three-state cancellation shared between the batch processor and the LLM
//! client: `None` (running normally) → `Requested` (finish the in-flight
//! call, then stop) → `Forceful` (abort the in-flight call immediately).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const NONE: u8 = 0;
const REQUESTED: u8 = 1;
const FORCEFUL: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    None,
    Requested,
    Forceful,
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicU8>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(NONE)))
    }

    pub fn request(&self) {
        self.0.compare_exchange(NONE, REQUESTED, Ordering::SeqCst, Ordering::SeqCst).ok();
    }

    /// Escalate straight to forceful regardless of current state.
    pub fn force(&self) {
        self.0.store(FORCEFUL, Ordering::SeqCst);
    }

    pub fn state(&self) -> CancelState {
        match self.0.load(Ordering::SeqCst) {
            REQUESTED => CancelState::Requested,
            FORCEFUL => CancelState::Forceful,
            _ => CancelState::None,
        }
    }

    pub fn is_forceful(&self) -> bool {
        self.state() == CancelState::Forceful
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() != CancelState::None
    }
}
