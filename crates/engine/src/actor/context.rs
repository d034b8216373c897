// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Actor execution context.
//!
//! The context provides a running handler with:
//! - Its own address, and the worker it runs on
//! - Sending, spawning and destroying
//! - Timers
//! - Shutdown status
//!
//! A context lives only for the duration of one `init`, `pre_start` or
//! `handle` call and cannot be stored.

use std::{
	any::Any,
	time::{Duration, Instant},
};

use crate::{
	actor::{Actor, ActorRef, Delivery, cell::Cell},
	error::Result,
	id::{ActorId, WorkerId},
	timer::{TimerEntry, TimerHandle},
	worker::{command::Payload, scope::Env},
};

/// What a handler requested for its own actor, applied once it returns.
pub(crate) struct Outcome<M> {
	pub(crate) self_sends: Vec<M>,
	pub(crate) stop: bool,
}

/// Context provided to actors during execution.
pub struct Context<'a, M> {
	env: Env<'a>,
	id: ActorId,
	self_sends: Vec<M>,
	stop: bool,
}

impl<'a, M: Send + 'static> Context<'a, M> {
	pub(crate) fn new(env: Env<'a>, id: ActorId) -> Self {
		Self {
			env,
			id,
			self_sends: Vec::new(),
			stop: false,
		}
	}

	pub(crate) fn finish(self) -> Outcome<M> {
		Outcome {
			self_sends: self.self_sends,
			stop: self.stop,
		}
	}

	pub fn id(&self) -> ActorId {
		self.id
	}

	/// Get a reference to send messages to self.
	pub fn self_ref(&self) -> ActorRef<M> {
		ActorRef::new(self.id)
	}

	/// The worker running this actor.
	pub fn worker(&self) -> WorkerId {
		self.env.worker()
	}

	/// Number of workers in the engine.
	pub fn worker_count(&self) -> usize {
		self.env.worker_count()
	}

	/// Queue a message to this actor, behind everything already queued.
	pub fn send_self(&mut self, msg: M) {
		self.self_sends.push(msg);
	}

	/// Send `msg` to `target`. Never blocks.
	///
	/// Targets on this worker get the message in their mailbox right away;
	/// targets elsewhere get it through their worker's inbox.
	pub fn send<T: Send + 'static>(&mut self, target: &ActorRef<T>, msg: T) -> Delivery {
		if target.id() == self.id {
			let msg: Box<dyn Any> = Box::new(msg);
			return match msg.downcast::<M>() {
				Ok(msg) => {
					self.self_sends.push(*msg);
					Delivery::Enqueued
				}
				Err(_) => Delivery::Dropped,
			};
		}
		self.env.send(target.id(), Box::new(msg))
	}

	/// Spawn an actor on this worker.
	///
	/// The actor is constructed before this returns, so its `init` and
	/// `pre_start` have already run. Fails only while shutting down.
	pub fn spawn<A, F>(&mut self, factory: F) -> Result<ActorRef<A::Message>>
	where
		A: Actor,
		F: FnOnce() -> A,
	{
		self.env.spawn_local(|env, id| Cell::<A>::start(factory, env, id)).map(ActorRef::new)
	}

	/// Spawn an actor on `worker`.
	///
	/// The returned reference is usable immediately; messages sent to it
	/// are handled after construction.
	pub fn spawn_on<A, F>(&mut self, worker: WorkerId, factory: F) -> Result<ActorRef<A::Message>>
	where
		A: Actor,
		F: FnOnce() -> A + Send + 'static,
	{
		if worker == self.worker() {
			return self.spawn(factory);
		}
		self.env
			.spawn_remote(worker, Box::new(move |env, id| Cell::<A>::start(factory, env, id)))
			.map(ActorRef::new)
	}

	/// Ask `target` to stop. It handles what is already queued, then is
	/// destroyed by its own worker.
	pub fn destroy<T>(&mut self, target: &ActorRef<T>) -> Delivery {
		if target.id() == self.id {
			self.stop();
			return Delivery::Enqueued;
		}
		self.env.destroy(target.id())
	}

	/// Stop this actor once the current handler returns.
	pub fn stop(&mut self) {
		self.stop = true;
	}

	/// Send `msg` to this actor after `delay`.
	pub fn schedule_once(&mut self, delay: Duration, msg: M) -> TimerHandle {
		let target = self.self_ref();
		self.schedule_to(&target, delay, msg)
	}

	/// Send `msg` to `target` after `delay`.
	///
	/// The timer lives on this worker. If the target is gone when it fires,
	/// the message is dropped.
	pub fn schedule_to<T: Send + 'static>(&mut self, target: &ActorRef<T>, delay: Duration, msg: T) -> TimerHandle {
		let handle = self.env.timer_handle();
		if !handle.is_cancelled() {
			self.env.schedule(TimerEntry::once(&handle, target.id(), Instant::now() + delay, Box::new(msg)));
		}
		handle
	}

	/// Send a copy of `msg` to this actor every `interval`.
	///
	/// Repeats until cancelled or the actor is destroyed.
	pub fn schedule_repeat(&mut self, interval: Duration, msg: M) -> TimerHandle
	where
		M: Clone,
	{
		let handle = self.env.timer_handle();
		if !handle.is_cancelled() {
			let make = Box::new(move || Box::new(msg.clone()) as Payload);
			self.env.schedule(TimerEntry::repeat(&handle, self.id, interval, make));
		}
		handle
	}

	/// Whether the engine is stopping. Handlers should wind down.
	pub fn is_shutting_down(&self) -> bool {
		self.env.is_shutting_down()
	}

	/// Current monotonic time.
	pub fn now(&self) -> Instant {
		Instant::now()
	}
}
