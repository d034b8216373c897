// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Native platform implementation.
//!
//! - **Linux**: full affinity sets through `sched_{get,set}affinity`.
//! - **Other targets**: single-core pinning through `core_affinity`.
//! - **Unix**: `SCHED_FIFO` real-time priority through `pthread_setschedparam`.

use crate::{
	cpu::{self, CpuSet},
	error::{Result, RuntimeError},
	platform::{Platform, PriorityRange},
};

/// [`Platform`] for the compilation target.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePlatform;

impl NativePlatform {
	pub fn new() -> Self {
		Self
	}
}

impl Platform for NativePlatform {
	fn name(&self) -> &'static str {
		std::env::consts::OS
	}

	fn cpu_count(&self) -> usize {
		cpu::cpu_count()
	}

	fn available_cpus(&self) -> CpuSet {
		match core_affinity::get_core_ids() {
			Some(cores) if !cores.is_empty() => cores.into_iter().map(|core| core.id).collect(),
			_ => CpuSet::first(self.cpu_count()),
		}
	}

	fn current_affinity(&self) -> Result<CpuSet> {
		imp::current_affinity()
	}

	fn set_affinity(&self, cpus: &CpuSet) -> Result<()> {
		self.check_cpus(cpus)?;
		imp::set_affinity(cpus)
	}

	fn priority_range(&self) -> Option<PriorityRange> {
		imp::priority_range()
	}

	fn set_real_time(&self, priority: Option<i32>) -> Result<()> {
		if let Some(priority) = priority {
			self.check_priority(priority)?;
		}
		imp::set_real_time(priority)
	}
}

#[cfg(target_os = "linux")]
mod affinity {
	use std::mem;

	use super::*;
	use crate::cpu::MAX_CPUS;

	pub(super) fn current_affinity() -> Result<CpuSet> {
		// SAFETY: cpu_set_t is a plain bitmask; all-zero is a valid value.
		let mut raw: libc::cpu_set_t = unsafe { mem::zeroed() };
		// SAFETY: raw is a valid, writable cpu_set_t of the size passed.
		let rc = unsafe { libc::sched_getaffinity(0, mem::size_of::<libc::cpu_set_t>(), &mut raw) };
		if rc != 0 {
			return Err(RuntimeError::last_os_error("sched_getaffinity"));
		}

		let limit = MAX_CPUS.min(libc::CPU_SETSIZE as usize);
		let mut set = CpuSet::new();
		for cpu in 0..limit {
			// SAFETY: cpu < CPU_SETSIZE.
			if unsafe { libc::CPU_ISSET(cpu, &raw) } {
				set.insert(cpu);
			}
		}
		Ok(set)
	}

	pub(super) fn set_affinity(cpus: &CpuSet) -> Result<()> {
		// SAFETY: see current_affinity.
		let mut raw: libc::cpu_set_t = unsafe { mem::zeroed() };
		for cpu in cpus.iter() {
			if cpu >= libc::CPU_SETSIZE as usize {
				return Err(RuntimeError::InvalidCpu {
					cpu,
					available: libc::CPU_SETSIZE as usize,
				});
			}
			// SAFETY: cpu < CPU_SETSIZE.
			unsafe { libc::CPU_SET(cpu, &mut raw) };
		}

		// SAFETY: raw is a valid cpu_set_t of the size passed; pid 0 targets
		// the calling thread.
		let rc = unsafe { libc::sched_setaffinity(0, mem::size_of::<libc::cpu_set_t>(), &raw) };
		if rc != 0 {
			return Err(RuntimeError::last_os_error("sched_setaffinity"));
		}
		Ok(())
	}
}

#[cfg(not(target_os = "linux"))]
mod affinity {
	use super::*;

	pub(super) fn current_affinity() -> Result<CpuSet> {
		Err(RuntimeError::Unsupported("reading thread affinity"))
	}

	pub(super) fn set_affinity(cpus: &CpuSet) -> Result<()> {
		if cpus.len() != 1 {
			return Err(RuntimeError::Unsupported("multi-cpu affinity"));
		}
		let cpu = cpus.lowest().ok_or(RuntimeError::EmptyCpuSet)?;
		if core_affinity::set_for_current(core_affinity::CoreId {
			id: cpu,
		}) {
			Ok(())
		} else {
			Err(RuntimeError::last_os_error("core_affinity::set_for_current"))
		}
	}
}

#[cfg(unix)]
mod priority {
	use std::mem;

	use super::*;

	pub(super) fn priority_range() -> Option<PriorityRange> {
		// SAFETY: no preconditions.
		let (min, max) = unsafe {
			(libc::sched_get_priority_min(libc::SCHED_FIFO), libc::sched_get_priority_max(libc::SCHED_FIFO))
		};
		(min >= 0 && max >= min).then_some(PriorityRange {
			min,
			max,
		})
	}

	pub(super) fn set_real_time(priority: Option<i32>) -> Result<()> {
		let (policy, value) = match priority {
			Some(priority) => (libc::SCHED_FIFO, priority),
			None => (libc::SCHED_OTHER, 0),
		};

		// SAFETY: sched_param is plain data; zeroed then filled.
		let mut param: libc::sched_param = unsafe { mem::zeroed() };
		param.sched_priority = value;

		// SAFETY: param outlives the call; pthread_self is always valid.
		let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), policy, &param) };
		if rc != 0 {
			return Err(RuntimeError::from_code("pthread_setschedparam", rc));
		}
		Ok(())
	}
}

#[cfg(not(unix))]
mod priority {
	use super::*;

	pub(super) fn priority_range() -> Option<PriorityRange> {
		None
	}

	pub(super) fn set_real_time(priority: Option<i32>) -> Result<()> {
		match priority {
			Some(_) => Err(RuntimeError::Unsupported("real-time scheduling")),
			None => Ok(()),
		}
	}
}

mod imp {
	pub(super) use super::{
		affinity::{current_affinity, set_affinity},
		priority::{priority_range, set_real_time},
	};
}
