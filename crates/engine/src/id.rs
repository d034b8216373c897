// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Actor and worker identifiers.
//!
//! An [`ActorId`] packs the index of the owning worker into its high 16 bits
//! and a process-wide sequence number into the low 48 bits. Ids are never
//! reused, and whether a target is local to the current worker is answered
//! without touching the registry.

use std::{
	fmt::{self, Display, Formatter},
	ops::Deref,
	sync::atomic::{AtomicU64, Ordering},
};

const SEQUENCE_BITS: u32 = 48;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Largest number of workers an engine can run.
pub const MAX_WORKERS: usize = u16::MAX as usize;

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Index of a worker within its engine.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct WorkerId(pub usize);

impl Display for WorkerId {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl Deref for WorkerId {
	type Target = usize;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl From<usize> for WorkerId {
	fn from(value: usize) -> Self {
		WorkerId(value)
	}
}

impl From<WorkerId> for usize {
	fn from(value: WorkerId) -> Self {
		value.0
	}
}

/// Process-unique identity of an actor.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct ActorId(pub u64);

impl ActorId {
	/// A fresh id owned by `worker`.
	pub(crate) fn next(worker: WorkerId) -> Self {
		let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK;
		Self::compose(worker, sequence)
	}

	pub(crate) fn compose(worker: WorkerId, sequence: u64) -> Self {
		ActorId(((worker.0 as u64) << SEQUENCE_BITS) | (sequence & SEQUENCE_MASK))
	}

	/// The worker that owns this actor.
	#[inline]
	pub fn worker(&self) -> WorkerId {
		WorkerId((self.0 >> SEQUENCE_BITS) as usize)
	}

	#[inline]
	pub fn sequence(&self) -> u64 {
		self.0 & SEQUENCE_MASK
	}
}

impl Display for ActorId {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "{}:{}", self.worker(), self.sequence())
	}
}

impl Deref for ActorId {
	type Target = u64;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl PartialEq<u64> for ActorId {
	fn eq(&self, other: &u64) -> bool {
		self.0.eq(other)
	}
}

impl From<ActorId> for u64 {
	fn from(value: ActorId) -> Self {
		value.0
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;

	#[test]
	fn test_worker_round_trips_through_id() {
		let id = ActorId::compose(WorkerId(7), 42);
		assert_eq!(id.worker(), WorkerId(7));
		assert_eq!(id.sequence(), 42);
		assert_eq!(id.to_string(), "7:42");

		let max = ActorId::compose(WorkerId(MAX_WORKERS - 1), SEQUENCE_MASK);
		assert_eq!(max.worker(), WorkerId(MAX_WORKERS - 1));
		assert_eq!(max.sequence(), SEQUENCE_MASK);
	}

	#[test]
	fn test_ids_are_unique() {
		let ids: HashSet<_> = (0..1000).map(|i| ActorId::next(WorkerId(i % 4))).collect();
		assert_eq!(ids.len(), 1000);
	}

	#[test]
	fn test_sequence_is_shared_across_workers() {
		let a = ActorId::next(WorkerId(0));
		let b = ActorId::next(WorkerId(3));
		assert!(b.sequence() > a.sequence());
		assert_eq!(b.worker(), WorkerId(3));
	}
}
