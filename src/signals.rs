//! Interrupt handling for graceful shutdown
//!
//! Tracks Ctrl+C presses process-wide. Streaming loops poll the flag between
//! chunks; the second press escalates to an immediate exit in `main`.

use std::sync::atomic::{AtomicUsize, Ordering};

static INTERRUPTS: AtomicUsize = AtomicUsize::new(0);

/// Record a Ctrl+C press, returning how many had been seen before it.
#[inline]
pub fn register_interrupt() -> usize {
    INTERRUPTS.fetch_add(1, Ordering::SeqCst)
}

/// Check whether the run was interrupted at least once.
#[inline]
pub fn was_interrupted() -> bool {
    INTERRUPTS.load(Ordering::SeqCst) > 0
}

/// Clear the interrupt count.
#[inline]
pub fn reset_interrupted() {
    INTERRUPTS.store(0, Ordering::SeqCst);
}
