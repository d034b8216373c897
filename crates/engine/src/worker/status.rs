// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Worker state published for the engine.

use std::{
	fmt,
	sync::atomic::{AtomicU8, AtomicU64, Ordering},
};

use tessera_runtime::{CpuSet, sync::Mutex};

use crate::id::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
	/// No actor has pending work; parked until woken or a timer is due.
	Idle = 0,
	/// Running an actor's turn.
	Running = 1,
	/// Shutdown requested: finishing queued events, refusing new actors.
	Draining = 2,
	/// The thread has exited or is about to.
	Stopped = 3,
}

impl WorkerState {
	fn from_u8(value: u8) -> Self {
		match value {
			0 => WorkerState::Idle,
			1 => WorkerState::Running,
			2 => WorkerState::Draining,
			_ => WorkerState::Stopped,
		}
	}
}

impl fmt::Display for WorkerState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			WorkerState::Idle => "idle",
			WorkerState::Running => "running",
			WorkerState::Draining => "draining",
			WorkerState::Stopped => "stopped",
		})
	}
}

/// Snapshot of a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
	pub id: WorkerId,
	pub state: WorkerState,
	pub thread_name: String,
	/// CPUs the thread runs on, as observed by the thread itself. `None` if
	/// the platform cannot report it.
	pub affinity: Option<CpuSet>,
	/// Real-time priority, if one was applied.
	pub priority: Option<i32>,
	/// Cycle-counter ticks spent running actors.
	pub busy_cycles: u64,
	/// Actor turns run.
	pub turns: u64,
	/// Events handled.
	pub events: u64,
}

#[derive(Debug, Default)]
struct Placement {
	affinity: Option<CpuSet>,
	priority: Option<i32>,
}

#[derive(Debug)]
pub(crate) struct WorkerStatus {
	state: AtomicU8,
	busy_cycles: AtomicU64,
	turns: AtomicU64,
	events: AtomicU64,
	placement: Mutex<Placement>,
}

impl WorkerStatus {
	pub(crate) fn new() -> Self {
		Self {
			state: AtomicU8::new(WorkerState::Idle as u8),
			busy_cycles: AtomicU64::new(0),
			turns: AtomicU64::new(0),
			events: AtomicU64::new(0),
			placement: Mutex::new(Placement::default()),
		}
	}

	pub(crate) fn state(&self) -> WorkerState {
		WorkerState::from_u8(self.state.load(Ordering::Acquire))
	}

	pub(crate) fn set_state(&self, state: WorkerState) {
		self.state.store(state as u8, Ordering::Release);
	}

	pub(crate) fn set_placement(&self, affinity: Option<CpuSet>, priority: Option<i32>) {
		*self.placement.lock() = Placement {
			affinity,
			priority,
		};
	}

	pub(crate) fn record_turn(&self, cycles: u64, events: u64) {
		self.busy_cycles.fetch_add(cycles, Ordering::Relaxed);
		self.turns.fetch_add(1, Ordering::Relaxed);
		self.events.fetch_add(events, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self, id: WorkerId, thread_name: &str) -> WorkerInfo {
		let placement = self.placement.lock();
		WorkerInfo {
			id,
			state: self.state(),
			thread_name: thread_name.to_string(),
			affinity: placement.affinity,
			priority: placement.priority,
			busy_cycles: self.busy_cycles.load(Ordering::Relaxed),
			turns: self.turns.load(Ordering::Relaxed),
			events: self.events.load(Ordering::Relaxed),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_round_trip() {
		let status = WorkerStatus::new();
		assert_eq!(status.state(), WorkerState::Idle);
		for state in [WorkerState::Running, WorkerState::Draining, WorkerState::Stopped] {
			status.set_state(state);
			assert_eq!(status.state(), state);
		}
	}

	#[test]
	fn test_snapshot_accumulates() {
		let status = WorkerStatus::new();
		status.set_placement(Some(CpuSet::single(3)), Some(20));
		status.record_turn(100, 4);
		status.record_turn(50, 1);

		let info = status.snapshot(WorkerId(3), "tessera-worker-3");
		assert_eq!(info.affinity, Some(CpuSet::single(3)));
		assert_eq!(info.priority, Some(20));
		assert_eq!(info.busy_cycles, 150);
		assert_eq!(info.turns, 2);
		assert_eq!(info.events, 5);
		assert_eq!(info.thread_name, "tessera-worker-3");
	}
}
