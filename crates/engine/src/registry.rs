// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Reference registry.
//!
//! The only structure written by more than one thread. Maps every actor id
//! that can still receive events to its liveness, and holds the route into
//! each worker's inbox.
//!
//! Entries are spread over [`SHARDS`] read-write locked tables. Resolution
//! runs its callback while holding the shard's read lock and invalidation
//! takes the write lock, so a [`LiveHandle`] is never used concurrently with
//! the invalidation of its actor. Once `invalidate` returns the entry is gone
//! and, because ids are never reused, every later lookup is `NotFound`.

use std::{collections::HashMap, sync::Arc};

use crossbeam_channel::Sender;
use tessera_runtime::sync::{Parker, RwLock};
use tracing::trace;

use crate::{
	id::{ActorId, WorkerId},
	worker::command::Command,
};

pub(crate) const SHARDS: usize = 16;

/// Registry state of an actor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
	/// Reserved; the spawn request is queued on the owning worker.
	Pending,
	/// Constructed and accepting events.
	Live,
}

/// Outcome of [`Registry::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution<R> {
	Found(R),
	NotFound,
}

/// Path into a worker: its inbox and the parker it sleeps on.
#[derive(Debug, Clone)]
pub(crate) struct Route {
	inbox: Sender<Command>,
	parker: Arc<Parker>,
}

impl Route {
	pub(crate) fn new(inbox: Sender<Command>, parker: Arc<Parker>) -> Self {
		Self {
			inbox,
			parker,
		}
	}

	/// Queue `command` and wake the worker. Returns `false` once the worker
	/// has exited.
	pub(crate) fn post(&self, command: Command) -> bool {
		if self.inbox.send(command).is_err() {
			return false;
		}
		self.parker.unpark();
		true
	}
}

/// Borrowed access to a resolved actor, valid only inside the
/// [`Registry::resolve`] callback.
pub(crate) struct LiveHandle<'a> {
	id: ActorId,
	liveness: Liveness,
	route: &'a Route,
}

impl LiveHandle<'_> {
	/// Post `command` to the owning worker. Commands for a `Pending` actor
	/// queue up behind its spawn request.
	pub(crate) fn post(&self, command: Command) -> bool {
		if self.liveness == Liveness::Pending {
			trace!(actor = %self.id, ?command, "posting to actor still starting");
		}
		self.route.post(command)
	}
}

pub(crate) struct Registry {
	shards: Box<[RwLock<HashMap<ActorId, Liveness>>]>,
	routes: Box<[Route]>,
}

impl Registry {
	pub(crate) fn new(routes: Vec<Route>) -> Self {
		Self {
			shards: (0..SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
			routes: routes.into_boxed_slice(),
		}
	}

	#[inline]
	fn shard(&self, id: ActorId) -> &RwLock<HashMap<ActorId, Liveness>> {
		&self.shards[(id.sequence() as usize) % SHARDS]
	}

	pub(crate) fn route(&self, worker: WorkerId) -> Option<&Route> {
		self.routes.get(worker.0)
	}

	pub(crate) fn routes(&self) -> impl Iterator<Item = &Route> {
		self.routes.iter()
	}

	pub(crate) fn worker_count(&self) -> usize {
		self.routes.len()
	}

	/// Allocate an id owned by `worker` in the `Pending` state.
	pub(crate) fn reserve(&self, worker: WorkerId) -> ActorId {
		let id = ActorId::next(worker);
		self.shard(id).write().insert(id, Liveness::Pending);
		id
	}

	/// Mark a reserved id as `Live`. Returns `false` if the id was
	/// invalidated in the meantime.
	pub(crate) fn publish(&self, id: ActorId) -> bool {
		match self.shard(id).write().get_mut(&id) {
			Some(liveness) => {
				*liveness = Liveness::Live;
				true
			}
			None => false,
		}
	}

	/// Allocate an id owned by `worker` that is live immediately.
	#[cfg(test)]
	pub(crate) fn register(&self, worker: WorkerId) -> ActorId {
		let id = ActorId::next(worker);
		self.shard(id).write().insert(id, Liveness::Live);
		id
	}

	/// Run `f` with a handle to `id` if it can still receive events.
	///
	/// `Pending` ids resolve as well: whatever is posted lands in the owning
	/// worker's inbox behind the spawn request.
	pub(crate) fn resolve<R>(&self, id: ActorId, f: impl FnOnce(LiveHandle<'_>) -> R) -> Resolution<R> {
		let shard = self.shard(id).read();
		let Some(&liveness) = shard.get(&id) else {
			return Resolution::NotFound;
		};
		let Some(route) = self.route(id.worker()) else {
			return Resolution::NotFound;
		};
		let result = f(LiveHandle {
			id,
			liveness,
			route,
		});
		drop(shard);
		Resolution::Found(result)
	}

	/// Remove `id`. Returns whether it was present.
	pub(crate) fn invalidate(&self, id: ActorId) -> bool {
		self.shard(id).write().remove(&id).is_some()
	}

	pub(crate) fn liveness(&self, id: ActorId) -> Option<Liveness> {
		self.shard(id).read().get(&id).copied()
	}

	pub(crate) fn len(&self) -> usize {
		self.shards.iter().map(|shard| shard.read().len()).sum()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.shards.iter().all(|shard| shard.read().is_empty())
	}

	/// Remove every entry, returning how many there were.
	pub(crate) fn clear(&self) -> usize {
		self.shards
			.iter()
			.map(|shard| {
				let mut shard = shard.write();
				let count = shard.len();
				shard.clear();
				count
			})
			.sum()
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc, Barrier,
			atomic::{AtomicBool, AtomicUsize, Ordering},
		},
		thread,
	};

	use crossbeam_channel::{Receiver, unbounded};

	use super::*;

	fn registry(workers: usize) -> (Registry, Vec<Receiver<Command>>) {
		let (routes, inboxes) = (0..workers)
			.map(|_| {
				let (tx, rx) = unbounded();
				(Route::new(tx, Arc::new(Parker::new())), rx)
			})
			.unzip();
		(Registry::new(routes), inboxes)
	}

	#[test]
	fn test_reserve_then_publish() {
		let (registry, _inboxes) = registry(2);
		let id = registry.reserve(WorkerId(1));
		assert_eq!(id.worker(), WorkerId(1));
		assert_eq!(registry.liveness(id), Some(Liveness::Pending));

		assert!(registry.publish(id));
		assert_eq!(registry.liveness(id), Some(Liveness::Live));
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn test_publish_after_invalidate_fails() {
		let (registry, _inboxes) = registry(1);
		let id = registry.reserve(WorkerId(0));
		assert!(registry.invalidate(id));
		assert!(!registry.publish(id));
		assert_eq!(registry.liveness(id), None);
	}

	#[test]
	fn test_resolve_posts_to_owner() {
		let (registry, inboxes) = registry(3);
		let id = registry.register(WorkerId(2));
		assert_eq!(registry.liveness(id), Some(Liveness::Live));

		let posted = registry.resolve(id, |live| {
			live.post(Command::Destroy {
				target: id,
			})
		});

		assert_eq!(posted, Resolution::Found(true));
		assert!(inboxes[0].is_empty());
		assert!(inboxes[1].is_empty());
		assert!(matches!(inboxes[2].try_recv(), Ok(Command::Destroy { target }) if target == id));
	}

	#[test]
	fn test_invalidated_is_permanently_not_found() {
		let (registry, _inboxes) = registry(1);
		let id = registry.register(WorkerId(0));
		assert!(registry.invalidate(id));
		assert!(!registry.invalidate(id));

		for _ in 0..3 {
			assert_eq!(registry.resolve(id, |_| ()), Resolution::NotFound);
		}
		let other = registry.register(WorkerId(0));
		assert_ne!(other, id);
		assert_eq!(registry.resolve(id, |_| ()), Resolution::NotFound);
	}

	#[test]
	fn test_unknown_worker_is_not_found() {
		let (registry, _inboxes) = registry(1);
		let id = registry.register(WorkerId(5));
		assert_eq!(registry.resolve(id, |_| ()), Resolution::NotFound);
	}

	#[test]
	fn test_pending_id_accepts_posts() {
		let (registry, inboxes) = registry(1);
		let id = registry.reserve(WorkerId(0));
		let posted = registry.resolve(id, |live| {
			live.post(Command::Destroy {
				target: id,
			})
		});
		assert_eq!(posted, Resolution::Found(true));
		assert_eq!(inboxes[0].len(), 1);
	}

	#[test]
	fn test_clear() {
		let (registry, _inboxes) = registry(2);
		for i in 0..40 {
			registry.register(WorkerId(i % 2));
		}
		assert_eq!(registry.len(), 40);
		assert_eq!(registry.clear(), 40);
		assert!(registry.is_empty());
	}

	#[test]
	fn test_resolve_never_overlaps_invalidate() {
		let (registry, _inboxes) = registry(1);
		let registry = Arc::new(registry);
		let id = registry.register(WorkerId(0));

		let invalidated = Arc::new(AtomicBool::new(false));
		let overlaps = Arc::new(AtomicUsize::new(0));
		let barrier = Arc::new(Barrier::new(5));

		let resolvers: Vec<_> = (0..4)
			.map(|_| {
				let registry = registry.clone();
				let invalidated = invalidated.clone();
				let overlaps = overlaps.clone();
				let barrier = barrier.clone();
				thread::spawn(move || {
					barrier.wait();
					for _ in 0..10_000 {
						registry.resolve(id, |_| {
							// Invalidation needs the write lock, so it cannot
							// complete while this callback runs.
							if invalidated.load(Ordering::SeqCst) {
								overlaps.fetch_add(1, Ordering::SeqCst);
							}
						});
					}
				})
			})
			.collect();

		barrier.wait();
		thread::yield_now();
		assert!(registry.invalidate(id));
		invalidated.store(true, Ordering::SeqCst);

		for resolver in resolvers {
			resolver.join().unwrap();
		}
		assert_eq!(overlaps.load(Ordering::SeqCst), 0);
		assert_eq!(registry.resolve(id, |_| ()), Resolution::NotFound);
	}
}
