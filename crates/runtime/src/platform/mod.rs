// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Scheduling capabilities of the host.
//!
//! Affinity and real-time priority control differ per operating system. The
//! engine only talks to the [`Platform`] trait; [`NativePlatform`] is the
//! implementation for the compilation target, and tests can substitute their
//! own.

use std::fmt;

use crate::{
	cpu::CpuSet,
	error::{Result, RuntimeError},
};

pub mod native;

pub use native::NativePlatform;

/// Inclusive range of real-time priorities accepted by the host scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityRange {
	pub min: i32,
	pub max: i32,
}

impl PriorityRange {
	pub fn contains(&self, priority: i32) -> bool {
		(self.min..=self.max).contains(&priority)
	}
}

impl fmt::Display for PriorityRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}, {}]", self.min, self.max)
	}
}

/// Per-thread scheduling control.
///
/// `set_affinity` and `set_real_time` act on the calling thread.
pub trait Platform: Send + Sync + 'static {
	/// Short identifier used in logs.
	fn name(&self) -> &'static str;

	fn cpu_count(&self) -> usize;

	/// CPUs this process may run on.
	fn available_cpus(&self) -> CpuSet;

	/// Affinity of the calling thread.
	fn current_affinity(&self) -> Result<CpuSet>;

	/// Restrict the calling thread to `cpus`.
	fn set_affinity(&self, cpus: &CpuSet) -> Result<()>;

	/// Real-time priorities the host accepts, `None` when real-time
	/// scheduling is unavailable.
	fn priority_range(&self) -> Option<PriorityRange>;

	/// Switch the calling thread to real-time scheduling at `priority`, or back
	/// to the default time-sharing policy with `None`.
	fn set_real_time(&self, priority: Option<i32>) -> Result<()>;

	/// Pin the calling thread to a single CPU.
	fn pin_to(&self, cpu: usize) -> Result<()> {
		self.set_affinity(&CpuSet::single(cpu))
	}

	/// Check `cpus` against [`available_cpus`](Self::available_cpus).
	fn check_cpus(&self, cpus: &CpuSet) -> Result<()> {
		if cpus.is_empty() {
			return Err(RuntimeError::EmptyCpuSet);
		}
		let available = self.available_cpus();
		match cpus.iter().find(|cpu| !available.contains(*cpu)) {
			Some(cpu) => Err(RuntimeError::InvalidCpu {
				cpu,
				available: available.len(),
			}),
			None => Ok(()),
		}
	}

	/// Check `priority` against [`priority_range`](Self::priority_range).
	fn check_priority(&self, priority: i32) -> Result<()> {
		match self.priority_range() {
			Some(range) if range.contains(priority) => Ok(()),
			Some(range) => Err(RuntimeError::InvalidPriority {
				priority,
				min: range.min,
				max: range.max,
			}),
			None => Err(RuntimeError::Unsupported("real-time scheduling")),
		}
	}
}
