// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Timers.
//!
//! Each worker keeps its own [`TimerQueue`], a min-heap by deadline. The
//! worker sleeps no longer than the earliest deadline; a due timer is routed
//! like an ordinary send, and a timer whose target is gone is dropped.

use std::{
	cmp::Ordering as CmpOrdering,
	collections::BinaryHeap,
	fmt,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	time::{Duration, Instant},
};

use crate::{id::ActorId, worker::command::Payload};

/// Handle to a scheduled timer.
///
/// Can be used to cancel the timer before it fires.
#[derive(Clone)]
pub struct TimerHandle {
	id: u64,
	cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
	pub(crate) fn new() -> Self {
		Self {
			id: next_timer_id(),
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// A handle for a timer that was never armed.
	pub(crate) fn inert() -> Self {
		let handle = Self::new();
		handle.cancel();
		handle
	}

	/// Cancel this timer.
	///
	/// Returns `true` if this call cancelled it.
	pub fn cancel(&self) -> bool {
		self.cancelled.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	pub fn id(&self) -> u64 {
		self.id
	}
}

impl fmt::Debug for TimerHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TimerHandle").field("id", &self.id).field("cancelled", &self.is_cancelled()).finish()
	}
}

static TIMER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_timer_id() -> u64 {
	TIMER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub(crate) enum TimerKind {
	/// Fire once and remove.
	Once {
		payload: Payload,
	},
	/// Fire every `interval` until cancelled or the target is gone.
	Repeat {
		make: Box<dyn FnMut() -> Payload + Send>,
		interval: Duration,
	},
}

pub(crate) struct TimerEntry {
	id: u64,
	deadline: Instant,
	target: ActorId,
	kind: TimerKind,
	cancelled: Arc<AtomicBool>,
}

impl TimerEntry {
	pub(crate) fn once(handle: &TimerHandle, target: ActorId, deadline: Instant, payload: Payload) -> Self {
		Self {
			id: handle.id,
			deadline,
			target,
			kind: TimerKind::Once {
				payload,
			},
			cancelled: handle.cancelled.clone(),
		}
	}

	pub(crate) fn repeat(
		handle: &TimerHandle,
		target: ActorId,
		interval: Duration,
		make: Box<dyn FnMut() -> Payload + Send>,
	) -> Self {
		Self {
			id: handle.id,
			deadline: Instant::now() + interval,
			target,
			kind: TimerKind::Repeat {
				make,
				interval,
			},
			cancelled: handle.cancelled.clone(),
		}
	}

	pub(crate) fn target(&self) -> ActorId {
		self.target
	}

	fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
	fn eq(&self, other: &Self) -> bool {
		self.deadline == other.deadline && self.id == other.id
	}
}

impl Ord for TimerEntry {
	// BinaryHeap is a max-heap; reversed to pop the earliest deadline first.
	fn cmp(&self, other: &Self) -> CmpOrdering {
		other.deadline.cmp(&self.deadline).then_with(|| other.id.cmp(&self.id))
	}
}

impl PartialOrd for TimerEntry {
	fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
		Some(self.cmp(other))
	}
}

/// A timer that came due.
pub(crate) struct Fired {
	pub(crate) target: ActorId,
	pub(crate) payload: Payload,
	pub(crate) disarm: Disarm,
}

/// Stops a repeating timer whose target has gone away.
pub(crate) struct Disarm(Arc<AtomicBool>);

impl Disarm {
	pub(crate) fn disarm(&self) {
		self.0.store(true, Ordering::SeqCst);
	}
}

/// Smallest step a repeating timer is re-armed by.
const MIN_REARM: Duration = Duration::from_nanos(1);

#[derive(Default)]
pub(crate) struct TimerQueue {
	heap: BinaryHeap<TimerEntry>,
}

impl TimerQueue {
	pub(crate) fn push(&mut self, entry: TimerEntry) {
		if !entry.is_cancelled() {
			self.heap.push(entry);
		}
	}

	/// Earliest deadline of a timer that is still armed.
	pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
		while let Some(entry) = self.heap.peek() {
			if !entry.is_cancelled() {
				return Some(entry.deadline);
			}
			self.heap.pop();
		}
		None
	}

	/// Next timer due at `now`. Repeating timers are re-armed before being
	/// returned.
	pub(crate) fn pop_due(&mut self, now: Instant) -> Option<Fired> {
		loop {
			if self.heap.peek()?.deadline > now {
				return None;
			}
			let entry = self.heap.pop()?;
			if entry.is_cancelled() {
				continue;
			}

			let TimerEntry {
				id,
				deadline,
				target,
				kind,
				cancelled,
			} = entry;

			let payload = match kind {
				TimerKind::Once {
					payload,
				} => payload,
				TimerKind::Repeat {
					mut make,
					interval,
				} => {
					let payload = make();
					// Skip missed ticks instead of firing a burst. The next
					// deadline is strictly after `now`, even for a zero interval.
					let next = (deadline + interval).max(now + interval / 2).max(now + MIN_REARM);
					self.heap.push(TimerEntry {
						id,
						deadline: next,
						target,
						kind: TimerKind::Repeat {
							make,
							interval,
						},
						cancelled: cancelled.clone(),
					});
					payload
				}
			};

			return Some(Fired {
				target,
				payload,
				disarm: Disarm(cancelled),
			});
		}
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.heap.len()
	}

	/// Drop every timer, returning how many were armed.
	pub(crate) fn clear(&mut self) -> usize {
		let armed = self.heap.iter().filter(|entry| !entry.is_cancelled()).count();
		self.heap.clear();
		armed
	}
}
