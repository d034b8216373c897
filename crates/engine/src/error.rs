// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Engine errors.
//!
//! Only lifecycle operations fail with an error. Sending to an actor that no
//! longer exists is a [`Delivery::NotFound`](crate::Delivery::NotFound)
//! outcome, and a panicking actor is reported as an
//! [`ActorFault`](crate::ActorFault) on the fault channel.

use tessera_runtime::RuntimeError;

use crate::id::WorkerId;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Invalid engine configuration, detected before any worker thread runs
/// actor code.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("at least one worker is required")]
	NoWorkers,

	#[error("{count} workers requested, at most {max} are supported")]
	TooManyWorkers {
		count: usize,
		max: usize,
	},

	#[error("dispatch budget must be at least 1")]
	ZeroDispatchBudget,

	#[error("fault capacity must be at least 1")]
	ZeroFaultCapacity,

	#[error("worker {worker}: cpu {cpu} is not available ({available} cpus usable)")]
	CpuOutOfRange {
		worker: WorkerId,
		cpu: usize,
		available: usize,
	},

	#[error("worker {worker}: affinity set is empty")]
	EmptyAffinity {
		worker: WorkerId,
	},

	#[error("worker {worker}: real-time priority {priority} outside of [{min}, {max}]")]
	PriorityOutOfRange {
		worker: WorkerId,
		priority: i32,
		min: i32,
		max: i32,
	},

	#[error("worker {worker}: real-time priority requested but the host has no real-time scheduler")]
	RealTimeUnsupported {
		worker: WorkerId,
	},

	#[error("worker {worker}: stack size {size} is below the minimum of {min} bytes")]
	StackTooSmall {
		worker: WorkerId,
		size: usize,
		min: usize,
	},

	/// The host refused the affinity of a worker thread.
	#[error("worker {worker}: failed to apply cpu affinity: {source}")]
	AffinityRejected {
		worker: WorkerId,
		#[source]
		source: RuntimeError,
	},

	/// The host refused the real-time priority of a worker thread.
	#[error("worker {worker}: failed to apply real-time priority: {source}")]
	PriorityRejected {
		worker: WorkerId,
		#[source]
		source: RuntimeError,
	},
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The operating system failed to provide a resource, such as a thread.
	#[error("worker {worker}: {source}")]
	Resource {
		worker: WorkerId,
		#[source]
		source: RuntimeError,
	},

	#[error("engine is shutting down")]
	ShuttingDown,

	#[error("engine cannot be stopped from one of its own worker threads")]
	StopFromWorker,

	#[error("engine has no worker {0}")]
	UnknownWorker(WorkerId),

	/// A worker thread died outside actor code.
	#[error("worker {0} panicked")]
	WorkerPanicked(WorkerId),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_config_error_converts() {
		let err: EngineError = ConfigError::NoWorkers.into();
		assert!(matches!(err, EngineError::Config(ConfigError::NoWorkers)));
		assert_eq!(err.to_string(), "at least one worker is required");
	}

	#[test]
	fn test_resource_error_keeps_os_text() {
		let err = EngineError::Resource {
			worker: WorkerId(2),
			source: RuntimeError::from_code("pthread_create", 11),
		};
		let text = err.to_string();
		assert!(text.starts_with("worker 2: pthread_create failed: "), "{text}");
	}
}
