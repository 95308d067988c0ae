// crates/policy-sync-core/src/runtime/clock.rs
// ============================================================================
// Module: System Clock
// Description: Wall-clock implementation of the clock interface.
// Purpose: Provide real waiting for production hosts.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`SystemClock`] reads the monotonic clock and blocks the calling thread.
//! Tests substitute a manual clock instead.

use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::interfaces::Clock;

/// Monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
