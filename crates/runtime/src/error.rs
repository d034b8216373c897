// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Errors raised by the platform primitive layer.
//!
//! Every failure that comes from the operating system carries the underlying
//! [`std::io::Error`] so the caller sees the system error text. Timeouts are
//! never errors; they are reported through return values such as
//! [`crate::sync::WaitTimeoutResult`].

use std::io;

/// Error type for platform primitive operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
	/// The OS refused to create a thread.
	#[error("failed to spawn thread '{name}': {source}")]
	Spawn {
		name: String,
		#[source]
		source: io::Error,
	},

	/// A system call failed.
	#[error("{op} failed: {source}")]
	System {
		op: &'static str,
		#[source]
		source: io::Error,
	},

	/// A CPU index is not available on this host.
	#[error("cpu {cpu} is not available on this host ({available} cpus)")]
	InvalidCpu {
		cpu: usize,
		available: usize,
	},

	/// An affinity change was requested with no CPU in the set.
	#[error("cpu set is empty")]
	EmptyCpuSet,

	/// A real-time priority is outside the range the scheduler accepts.
	#[error("real-time priority {priority} outside of [{min}, {max}]")]
	InvalidPriority {
		priority: i32,
		min: i32,
		max: i32,
	},

	/// The operation is not available on this platform.
	#[error("{0} is not supported on this platform")]
	Unsupported(&'static str),
}

impl RuntimeError {
	/// Build a [`RuntimeError::System`] from a raw error code returned by a
	/// pthread-style call.
	pub fn from_code(op: &'static str, code: i32) -> Self {
		RuntimeError::System {
			op,
			source: io::Error::from_raw_os_error(code),
		}
	}

	/// Build a [`RuntimeError::System`] from `errno`.
	pub fn last_os_error(op: &'static str) -> Self {
		RuntimeError::System {
			op,
			source: io::Error::last_os_error(),
		}
	}
}

/// Result type for platform primitive operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
