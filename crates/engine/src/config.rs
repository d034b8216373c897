// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Engine configuration.
//!
//! Built in code with the builder methods, or read from JSON:
//!
//! ```json
//! {
//!     "workers": [
//!         { "cpu": 2, "priority": 40 },
//!         { "cpu": [4, 5], "stack_size": 1048576 },
//!         {}
//!     ],
//!     "dispatch_budget": 32
//! }
//! ```

use serde::{Deserialize, Serialize};
use tessera_runtime::{CpuSet, Platform, cpu_count};

use crate::{
	error::ConfigError,
	id::{MAX_WORKERS, WorkerId},
};

/// Events an actor may handle in one turn before the worker moves on.
pub const DEFAULT_DISPATCH_BUDGET: usize = 64;

/// Smallest accepted worker stack.
pub const MIN_STACK_SIZE: usize = 64 * 1024;

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "tessera-worker";

/// Fault reports held for [`Engine::faults`](crate::Engine::faults) before
/// new ones are dropped.
pub const DEFAULT_FAULT_CAPACITY: usize = 1024;

/// CPUs a worker thread is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CpuSpec {
	Core(usize),
	Set(Vec<usize>),
}

impl CpuSpec {
	pub fn to_cpu_set(&self) -> CpuSet {
		match self {
			CpuSpec::Core(cpu) => CpuSet::single(*cpu),
			CpuSpec::Set(cpus) => cpus.iter().copied().collect(),
		}
	}

	fn cpus(&self) -> &[usize] {
		match self {
			CpuSpec::Core(cpu) => std::slice::from_ref(cpu),
			CpuSpec::Set(cpus) => cpus,
		}
	}
}

/// Settings of a single worker thread. Everything is optional; an empty
/// config is an unpinned thread at default priority with the default stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
	pub cpu: Option<CpuSpec>,
	/// Real-time (`SCHED_FIFO`) priority.
	pub priority: Option<i32>,
	/// Stack size in bytes, rounded up to the page size.
	pub stack_size: Option<usize>,
}

impl WorkerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pin to a single CPU.
	pub fn cpu(mut self, cpu: usize) -> Self {
		self.cpu = Some(CpuSpec::Core(cpu));
		self
	}

	/// Restrict to a set of CPUs.
	pub fn cpus(mut self, cpus: impl IntoIterator<Item = usize>) -> Self {
		self.cpu = Some(CpuSpec::Set(cpus.into_iter().collect()));
		self
	}

	pub fn priority(mut self, priority: i32) -> Self {
		self.priority = Some(priority);
		self
	}

	pub fn stack_size(mut self, bytes: usize) -> Self {
		self.stack_size = Some(bytes);
		self
	}

	fn validate(&self, worker: WorkerId, platform: &dyn Platform) -> Result<(), ConfigError> {
		if let Some(spec) = &self.cpu {
			let cpus = spec.cpus();
			if cpus.is_empty() {
				return Err(ConfigError::EmptyAffinity {
					worker,
				});
			}
			let available = platform.available_cpus();
			if let Some(&cpu) = cpus.iter().find(|cpu| !available.contains(**cpu)) {
				return Err(ConfigError::CpuOutOfRange {
					worker,
					cpu,
					available: available.len(),
				});
			}
		}

		if let Some(priority) = self.priority {
			match platform.priority_range() {
				None => {
					return Err(ConfigError::RealTimeUnsupported {
						worker,
					});
				}
				Some(range) if !range.contains(priority) => {
					return Err(ConfigError::PriorityOutOfRange {
						worker,
						priority,
						min: range.min,
						max: range.max,
					});
				}
				Some(_) => {}
			}
		}

		if let Some(size) = self.stack_size {
			if size < MIN_STACK_SIZE {
				return Err(ConfigError::StackTooSmall {
					worker,
					size,
					min: MIN_STACK_SIZE,
				});
			}
		}

		Ok(())
	}
}

/// Configuration of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// One entry per worker; worker `i` is configured by `workers[i]`.
	pub workers: Vec<WorkerConfig>,
	/// Events an actor may handle in one turn before yielding to the next
	/// ready actor.
	///
	/// Default: 64
	pub dispatch_budget: usize,
	/// Worker threads are named `{prefix}-{index}`.
	pub thread_name_prefix: String,
	/// Unreceived fault reports kept before further ones are dropped.
	///
	/// Default: 1024
	pub fault_capacity: usize,
}

impl Default for EngineConfig {
	/// One unpinned worker per CPU.
	fn default() -> Self {
		Self::with_workers(cpu_count())
	}
}

impl EngineConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// `count` unpinned workers.
	pub fn with_workers(count: usize) -> Self {
		Self {
			workers: vec![WorkerConfig::default(); count],
			dispatch_budget: DEFAULT_DISPATCH_BUDGET,
			thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
			fault_capacity: DEFAULT_FAULT_CAPACITY,
		}
	}

	/// One worker pinned to each of `cpus`, in order.
	pub fn pinned(cpus: impl IntoIterator<Item = usize>) -> Self {
		Self {
			workers: cpus.into_iter().map(|cpu| WorkerConfig::new().cpu(cpu)).collect(),
			..Self::with_workers(0)
		}
	}

	/// Append a worker.
	pub fn worker(mut self, worker: WorkerConfig) -> Self {
		self.workers.push(worker);
		self
	}

	/// Replace all workers.
	pub fn workers(mut self, workers: Vec<WorkerConfig>) -> Self {
		self.workers = workers;
		self
	}

	pub fn dispatch_budget(mut self, budget: usize) -> Self {
		self.dispatch_budget = budget;
		self
	}

	pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.thread_name_prefix = prefix.into();
		self
	}

	pub fn fault_capacity(mut self, capacity: usize) -> Self {
		self.fault_capacity = capacity;
		self
	}

	pub fn worker_count(&self) -> usize {
		self.workers.len()
	}

	/// Check every setting against what `platform` can provide.
	pub fn validate(&self, platform: &dyn Platform) -> Result<(), ConfigError> {
		if self.workers.is_empty() {
			return Err(ConfigError::NoWorkers);
		}
		if self.workers.len() > MAX_WORKERS {
			return Err(ConfigError::TooManyWorkers {
				count: self.workers.len(),
				max: MAX_WORKERS,
			});
		}
		if self.dispatch_budget == 0 {
			return Err(ConfigError::ZeroDispatchBudget);
		}
		if self.fault_capacity == 0 {
			return Err(ConfigError::ZeroFaultCapacity);
		}
		for (index, worker) in self.workers.iter().enumerate() {
			worker.validate(WorkerId(index), platform)?;
		}
		Ok(())
	}

	pub(crate) fn thread_name(&self, worker: WorkerId) -> String {
		format!("{}-{}", self.thread_name_prefix, worker)
	}
}
