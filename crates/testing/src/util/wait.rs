// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Wait utilities for testing
//!
//! Waiting on conditions in tests without fixed sleeps, making tests both
//! faster and more reliable. Worker threads run on their own, so the calling
//! test thread simply polls.

use std::time::{Duration, Instant};

use tessera_runtime::thread::sleep;

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default poll interval (1 millisecond)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Wait for a condition to become true, polling at regular intervals
///
/// # Arguments
/// * `condition` - A closure that returns true when the wait should end
/// * `timeout` - Maximum time to wait before panicking
/// * `poll_interval` - How often to check the condition
/// * `timeout_message` - Message to display if timeout occurs
///
/// # Panics
/// Panics if the condition doesn't become true within the timeout period
pub fn wait_for_condition<F>(condition: F, timeout: Duration, poll_interval: Duration, timeout_message: &str)
where
	F: Fn() -> bool,
{
	let start = Instant::now();
	let mut poll_count = 0u64;

	while !condition() {
		if start.elapsed() > timeout {
			tracing::debug!(polls = poll_count, msg = timeout_message, "wait timed out");
			panic!("Timeout after {:?}: {}", timeout, timeout_message);
		}
		poll_count += 1;
		sleep(poll_interval);
	}
	tracing::trace!(polls = poll_count, elapsed = ?start.elapsed(), msg = timeout_message, "condition met");
}

/// Wait for a condition with default timeout and poll interval
pub fn wait_for<F>(condition: F, message: &str)
where
	F: Fn() -> bool,
{
	wait_for_condition(condition, DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL, message);
}

#[cfg(test)]
pub mod tests {
	use std::{
		sync::{
			Arc,
			atomic::{AtomicUsize, Ordering},
		},
		thread,
	};

	use super::*;

	#[test]
	fn test_wait_for_immediate() {
		wait_for(|| true, "Should not timeout");
	}

	#[test]
	fn test_wait_for_becomes_true() {
		let counter = Arc::new(AtomicUsize::new(0));
		let counter_clone = counter.clone();

		thread::spawn(move || {
			thread::sleep(Duration::from_millis(50));
			counter_clone.store(5, Ordering::SeqCst);
		});

		wait_for(|| counter.load(Ordering::SeqCst) == 5, "Counter should reach 5");

		assert_eq!(counter.load(Ordering::SeqCst), 5);
	}

	#[test]
	#[should_panic(expected = "Timeout after")]
	fn test_wait_for_timeout() {
		wait_for_condition(|| false, Duration::from_millis(10), Duration::from_millis(1), "Condition never becomes true");
	}
}
