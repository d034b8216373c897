// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! A [`Platform`] that records instead of touching the scheduler.
//!
//! Affinity and priority requests are validated against a simulated host and
//! stored per thread name, so placement scenarios run the same on a laptop
//! and on a 64-core box.

use std::{collections::HashMap, thread};

use tessera_runtime::{
	CpuSet, Platform, PriorityRange, Result, RuntimeError,
	sync::Mutex,
};

/// Scheduling settings applied by one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
	pub thread_name: String,
	pub affinity: Option<CpuSet>,
	pub priority: Option<i32>,
}

#[derive(Debug)]
pub struct RecordingPlatform {
	cpus: usize,
	priorities: Option<PriorityRange>,
	reject_affinity: bool,
	applied: Mutex<HashMap<String, Applied>>,
}

impl RecordingPlatform {
	/// A host with `cpus` CPUs and real-time priorities in `[1, 99]`.
	pub fn new(cpus: usize) -> Self {
		Self {
			cpus,
			priorities: Some(PriorityRange {
				min: 1,
				max: 99,
			}),
			reject_affinity: false,
			applied: Mutex::new(HashMap::new()),
		}
	}

	/// Simulate a host without real-time scheduling.
	pub fn without_real_time(mut self) -> Self {
		self.priorities = None;
		self
	}

	/// Make every `set_affinity` call fail as the OS would.
	pub fn rejecting_affinity(mut self) -> Self {
		self.reject_affinity = true;
		self
	}

	/// What the thread named `name` applied, if it applied anything.
	pub fn applied_by(&self, name: &str) -> Option<Applied> {
		self.applied.lock().get(name).cloned()
	}

	/// Everything applied so far, ordered by thread name.
	pub fn applied(&self) -> Vec<Applied> {
		let mut all: Vec<_> = self.applied.lock().values().cloned().collect();
		all.sort_by(|a, b| a.thread_name.cmp(&b.thread_name));
		all
	}

	fn record(&self, update: impl FnOnce(&mut Applied)) {
		let name = thread::current().name().unwrap_or("<unnamed>").to_string();
		let mut applied = self.applied.lock();
		let entry = applied.entry(name.clone()).or_insert_with(|| Applied {
			thread_name: name,
			..Applied::default()
		});
		update(entry);
	}
}

impl Platform for RecordingPlatform {
	fn name(&self) -> &'static str {
		"recording"
	}

	fn cpu_count(&self) -> usize {
		self.cpus
	}

	fn available_cpus(&self) -> CpuSet {
		CpuSet::first(self.cpus)
	}

	fn current_affinity(&self) -> Result<CpuSet> {
		let name = thread::current().name().unwrap_or("<unnamed>").to_string();
		Ok(self.applied.lock().get(&name).and_then(|applied| applied.affinity).unwrap_or_else(|| self.available_cpus()))
	}

	fn set_affinity(&self, cpus: &CpuSet) -> Result<()> {
		if self.reject_affinity {
			return Err(RuntimeError::Unsupported("thread affinity"));
		}
		self.check_cpus(cpus)?;
		let cpus = *cpus;
		self.record(|applied| applied.affinity = Some(cpus));
		Ok(())
	}

	fn priority_range(&self) -> Option<PriorityRange> {
		self.priorities
	}

	fn set_real_time(&self, priority: Option<i32>) -> Result<()> {
		if let Some(priority) = priority {
			self.check_priority(priority)?;
		}
		self.record(|applied| applied.priority = priority);
		Ok(())
	}
}
