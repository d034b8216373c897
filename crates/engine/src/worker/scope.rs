// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Worker-private state and the environment handed to actor code.
//!
//! [`Scope`] is owned by one worker thread and never shared: the resident
//! actors, the ready queue and the timers. [`Env`] pairs it with the engine's
//! shared state for the duration of one piece of actor code. The actor being
//! run is taken out of the scope while it runs, so delivering to any actor
//! still resident is a plain mailbox push.

use std::{
	collections::{HashMap, HashSet, VecDeque},
	panic::{self, AssertUnwindSafe},
};

use tracing::{debug, trace, warn};

use crate::{
	actor::{
		Delivery,
		cell::{Accept, ActorCell, Fault},
	},
	error::{EngineError, Result},
	id::{ActorId, WorkerId},
	registry::Resolution,
	timer::{TimerEntry, TimerHandle, TimerQueue},
	worker::{
		Shared,
		command::{Command, Payload, StartFn},
	},
};

#[derive(Default)]
pub(crate) struct Scope {
	actors: HashMap<ActorId, Box<dyn ActorCell>>,
	ready: VecDeque<ActorId>,
	queued: HashSet<ActorId>,
	timers: TimerQueue,
	draining: bool,
}

impl Scope {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn actor_count(&self) -> usize {
		self.actors.len()
	}

	pub(crate) fn is_draining(&self) -> bool {
		self.draining
	}

	pub(crate) fn timers(&mut self) -> &mut TimerQueue {
		&mut self.timers
	}

	/// Take the next ready actor out of the scope for its turn.
	pub(crate) fn take_ready(&mut self) -> Option<Box<dyn ActorCell>> {
		while let Some(id) = self.ready.pop_front() {
			self.queued.remove(&id);
			if let Some(cell) = self.actors.remove(&id) {
				return Some(cell);
			}
		}
		None
	}

	/// Put an actor back after its turn.
	pub(crate) fn restore(&mut self, cell: Box<dyn ActorCell>) {
		let id = cell.id();
		let pending = cell.has_pending();
		self.actors.insert(id, cell);
		if pending {
			self.mark_ready(id);
		}
	}

	pub(crate) fn has_ready(&self) -> bool {
		!self.ready.is_empty()
	}

	fn mark_ready(&mut self, id: ActorId) {
		if self.queued.insert(id) {
			self.ready.push_back(id);
		}
	}

	/// Deliver to a resident actor. Gives the payload back if the target is
	/// not resident.
	pub(crate) fn deliver(&mut self, target: ActorId, payload: Payload) -> std::result::Result<Accept, Payload> {
		let Some(cell) = self.actors.get_mut(&target) else {
			return Err(payload);
		};
		let accept = cell.deliver(payload);
		match accept {
			Accept::Accepted => self.mark_ready(target),
			Accept::Draining => trace!(actor = %target, "dropped message to stopping actor"),
			Accept::Full => warn!(actor = %target, actor_type = cell.type_name(), "mailbox full, message dropped"),
			Accept::Mismatch => {
				warn!(actor = %target, actor_type = cell.type_name(), "message of the wrong type dropped")
			}
		}
		Ok(accept)
	}

	/// Begin draining: drop timers and close every mailbox. Returns the idle
	/// actors, which can be destroyed right away.
	pub(crate) fn begin_drain(&mut self) -> Vec<Box<dyn ActorCell>> {
		self.draining = true;
		let timers = self.timers.clear();
		if timers > 0 {
			debug!(timers, "dropped timers on shutdown");
		}

		let idle: Vec<ActorId> = self
			.actors
			.iter_mut()
			.filter_map(|(id, cell)| {
				cell.begin_drain();
				(!cell.has_pending()).then_some(*id)
			})
			.collect();
		idle.into_iter().filter_map(|id| self.actors.remove(&id)).collect()
	}
}

/// What actor code may touch: its worker's scope and the engine's shared
/// state.
pub(crate) struct Env<'a> {
	worker: WorkerId,
	shared: &'a Shared,
	scope: &'a mut Scope,
}

impl<'a> Env<'a> {
	pub(crate) fn new(worker: WorkerId, shared: &'a Shared, scope: &'a mut Scope) -> Self {
		Self {
			worker,
			shared,
			scope,
		}
	}

	pub(crate) fn reborrow(&mut self) -> Env<'_> {
		Env {
			worker: self.worker,
			shared: self.shared,
			scope: &mut *self.scope,
		}
	}

	pub(crate) fn worker(&self) -> WorkerId {
		self.worker
	}

	pub(crate) fn worker_count(&self) -> usize {
		self.shared.registry.worker_count()
	}

	pub(crate) fn is_shutting_down(&self) -> bool {
		self.scope.draining || self.shared.is_shutting_down()
	}

	pub(crate) fn send(&mut self, target: ActorId, payload: Payload) -> Delivery {
		let payload = if target.worker() == self.worker {
			match self.scope.deliver(target, payload) {
				Ok(Accept::Accepted) => return Delivery::Enqueued,
				Ok(Accept::Draining) => return Delivery::NotFound,
				Ok(Accept::Full | Accept::Mismatch) => return Delivery::Dropped,
				// Not resident: either gone or its spawn is still queued in our
				// own inbox.
				Err(payload) => payload,
			}
		} else {
			payload
		};
		post(self.shared, target, payload)
	}

	/// Reserve an id on this worker and construct the actor right away.
	pub(crate) fn spawn_local(
		&mut self,
		start: impl FnOnce(Env<'_>, ActorId) -> std::result::Result<Box<dyn ActorCell>, Fault>,
	) -> Result<ActorId> {
		if self.is_shutting_down() {
			return Err(EngineError::ShuttingDown);
		}
		let id = self.shared.registry.reserve(self.worker);
		self.install(id, start);
		Ok(id)
	}

	/// Reserve an id on another worker and queue the construction there.
	pub(crate) fn spawn_remote(&mut self, worker: WorkerId, start: StartFn) -> Result<ActorId> {
		if self.is_shutting_down() {
			return Err(EngineError::ShuttingDown);
		}
		spawn_on(self.shared, worker, start)
	}

	/// Construct a reserved actor on this worker and publish it.
	pub(crate) fn install(
		&mut self,
		id: ActorId,
		start: impl FnOnce(Env<'_>, ActorId) -> std::result::Result<Box<dyn ActorCell>, Fault>,
	) {
		match start(self.reborrow(), id) {
			Ok(cell) => {
				let type_name = cell.type_name();
				if cell.is_draining() && !cell.has_pending() {
					// Stopped during start-up.
					self.finalize(cell);
					return;
				}
				let pending = cell.has_pending();
				self.scope.actors.insert(id, cell);
				self.shared.registry.publish(id);
				if pending {
					self.scope.mark_ready(id);
				}
				trace!(actor = %id, actor_type = type_name, "actor started");
			}
			Err(fault) => {
				self.shared.registry.invalidate(id);
				self.shared.report(id, self.worker, fault);
			}
		}
	}

	/// Ask `target` to stop.
	pub(crate) fn destroy(&mut self, target: ActorId) -> Delivery {
		if target.worker() == self.worker && self.destroy_resident(target) {
			return Delivery::Enqueued;
		}
		let resolution = self.shared.registry.resolve(target, |live| {
			live.post(Command::Destroy {
				target,
			})
		});
		match resolution {
			Resolution::Found(true) => Delivery::Enqueued,
			_ => Delivery::NotFound,
		}
	}

	/// Stop a resident actor: close its mailbox, and destroy it now if
	/// nothing is queued. Returns `false` if `target` is not resident.
	pub(crate) fn destroy_resident(&mut self, target: ActorId) -> bool {
		let Some(mut cell) = self.scope.actors.remove(&target) else {
			return false;
		};
		cell.begin_drain();
		if cell.has_pending() {
			self.scope.actors.insert(target, cell);
		} else {
			self.finalize(cell);
		}
		true
	}

	pub(crate) fn timer_handle(&self) -> TimerHandle {
		if self.is_shutting_down() {
			TimerHandle::inert()
		} else {
			TimerHandle::new()
		}
	}

	pub(crate) fn schedule(&mut self, entry: TimerEntry) {
		if !self.scope.draining {
			self.scope.timers.push(entry);
		}
	}

	/// Run `post_stop`, invalidate, then drop. Nothing runs for the actor
	/// after its id is invalidated except the destructors of its values.
	pub(crate) fn finalize(&mut self, mut cell: Box<dyn ActorCell>) {
		let id = cell.id();
		if let Err(fault) = cell.stop() {
			self.shared.report(id, self.worker, fault);
		}
		self.shared.registry.invalidate(id);
		let type_name = cell.type_name();
		if panic::catch_unwind(AssertUnwindSafe(move || drop(cell))).is_err() {
			warn!(actor = %id, actor_type = type_name, "actor destructor panicked");
		}
		trace!(actor = %id, "actor destroyed");
	}
}

/// Post an event through the registry.
pub(crate) fn post(shared: &Shared, target: ActorId, payload: Payload) -> Delivery {
	let resolution = shared.registry.resolve(target, |live| {
		live.post(Command::Deliver {
			target,
			payload,
		})
	});
	match resolution {
		Resolution::Found(true) => Delivery::Enqueued,
		_ => Delivery::NotFound,
	}
}

/// Reserve an id on `worker` and queue its construction there.
pub(crate) fn spawn_on(shared: &Shared, worker: WorkerId, start: StartFn) -> Result<ActorId> {
	let Some(route) = shared.registry.route(worker) else {
		return Err(EngineError::UnknownWorker(worker));
	};
	let id = shared.registry.reserve(worker);
	if !route.post(Command::Spawn {
		id,
		start,
	}) {
		shared.registry.invalidate(id);
		return Err(EngineError::ShuttingDown);
	}
	Ok(id)
}
