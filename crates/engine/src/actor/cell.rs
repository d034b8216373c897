// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Type-erased actor storage owned by a worker.
//!
//! A [`Cell`] holds an actor, its state and its mailbox. Workers only see
//! the [`ActorCell`] trait, so actors of any type share one ready queue.

use std::{
	collections::VecDeque,
	panic::{self, AssertUnwindSafe},
};

use tessera_runtime::{atomic::AtomicCounter, diagnostic};
use tracing::trace;

use crate::{
	actor::{Actor, Flow, context::Context},
	fault::FaultStage,
	id::ActorId,
	worker::{command::Payload, scope::Env},
};

/// Whether a cell took an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Accept {
	Accepted,
	/// Stopping; no new events.
	Draining,
	/// Bounded mailbox at capacity.
	Full,
	/// Payload of the wrong message type.
	Mismatch,
}

/// What happened in one call to [`ActorCell::process_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
	/// An event was handled and more are queued.
	More,
	/// The mailbox is empty.
	Empty,
	/// An event was handled and the actor asked to end its turn.
	Yield,
}

/// A panic caught while running actor code.
#[derive(Debug, Clone)]
pub(crate) struct Fault {
	pub(crate) stage: FaultStage,
	pub(crate) actor_type: &'static str,
	pub(crate) reason: String,
	pub(crate) backtrace: Vec<String>,
}

impl Fault {
	fn from_panic(stage: FaultStage, actor_type: &'static str, payload: Box<dyn std::any::Any + Send>) -> Self {
		// Worker threads record the panic site and a backtrace in the hook.
		match diagnostic::take_panic_report() {
			Some(report) => Fault {
				stage,
				actor_type,
				reason: match report.location {
					Some(location) => format!("{} at {}", report.message, location),
					None => report.message,
				},
				backtrace: report.backtrace,
			},
			None => Fault {
				stage,
				actor_type,
				reason: diagnostic::panic_message(payload.as_ref()),
				backtrace: Vec::new(),
			},
		}
	}
}

/// Run actor code, turning a panic into a [`Fault`].
pub(crate) fn guarded<A: Actor, R>(stage: FaultStage, f: impl FnOnce() -> R) -> Result<R, Fault> {
	panic::catch_unwind(AssertUnwindSafe(f))
		.map_err(|payload| Fault::from_panic(stage, diagnostic::type_name_of::<A>(), payload))
}

pub(crate) trait ActorCell {
	fn id(&self) -> ActorId;

	fn type_name(&self) -> &'static str;

	/// Append an event to the mailbox.
	fn deliver(&mut self, payload: Payload) -> Accept;

	/// Handle the oldest queued event, if any.
	fn process_one(&mut self, env: Env<'_>) -> Result<Step, Fault>;

	/// Stop accepting events. Already queued events are still handled.
	fn begin_drain(&mut self);

	fn is_draining(&self) -> bool;

	fn has_pending(&self) -> bool;

	/// Run `post_stop`. Called exactly once, right before the cell is
	/// invalidated and dropped.
	fn stop(&mut self) -> Result<(), Fault>;
}

pub(crate) struct Cell<A: Actor> {
	id: ActorId,
	actor: A,
	state: A::State,
	mailbox: VecDeque<A::Message>,
	capacity: usize,
	draining: bool,
	in_flight: AtomicCounter,
}

impl<A: Actor> Cell<A> {
	/// Build the actor and run `init` and `pre_start` on the calling worker.
	pub(crate) fn start(make: impl FnOnce() -> A, env: Env<'_>, id: ActorId) -> Result<Box<dyn ActorCell>, Fault> {
		let actor = guarded::<A, _>(FaultStage::Construct, make)?;
		let config = guarded::<A, _>(FaultStage::Construct, || actor.config())?;

		let mut ctx = Context::new(env, id);
		let state = guarded::<A, _>(FaultStage::Start, || {
			let mut state = actor.init(&mut ctx);
			actor.pre_start(&mut state, &mut ctx);
			state
		})?;
		let outcome = ctx.finish();

		let mut cell = Cell {
			id,
			actor,
			state,
			mailbox: VecDeque::new(),
			capacity: config.mailbox_capacity,
			draining: false,
			in_flight: AtomicCounter::new(0),
		};
		cell.absorb(outcome.self_sends);
		if outcome.stop {
			cell.begin_drain();
		}
		Ok(Box::new(cell))
	}

	fn push(&mut self, msg: A::Message) -> Accept {
		if self.draining {
			return Accept::Draining;
		}
		if self.capacity > 0 && self.mailbox.len() >= self.capacity {
			return Accept::Full;
		}
		self.mailbox.push_back(msg);
		Accept::Accepted
	}

	fn absorb(&mut self, self_sends: Vec<A::Message>) {
		for msg in self_sends {
			let accept = self.push(msg);
			if accept != Accept::Accepted {
				trace!(actor = %self.id, ?accept, "dropped message to self");
			}
		}
	}

	fn dispatch(&mut self, env: Env<'_>) -> Result<Step, Fault> {
		let Some(msg) = self.mailbox.pop_front() else {
			return Ok(Step::Empty);
		};

		let mut ctx = Context::new(env, self.id);
		let (actor, state) = (&self.actor, &mut self.state);
		let flow = guarded::<A, _>(FaultStage::Handle, || actor.handle(state, msg, &mut ctx))?;
		let outcome = ctx.finish();

		self.absorb(outcome.self_sends);
		if outcome.stop || flow == Flow::Stop {
			self.begin_drain();
		}

		Ok(match flow {
			Flow::Yield => Step::Yield,
			_ if self.mailbox.is_empty() => Step::Empty,
			_ => Step::More,
		})
	}
}

impl<A: Actor> ActorCell for Cell<A> {
	fn id(&self) -> ActorId {
		self.id
	}

	fn type_name(&self) -> &'static str {
		diagnostic::type_name_of::<A>()
	}

	fn deliver(&mut self, payload: Payload) -> Accept {
		if self.draining {
			return Accept::Draining;
		}
		match payload.downcast::<A::Message>() {
			Ok(msg) => self.push(*msg),
			Err(_) => Accept::Mismatch,
		}
	}

	fn process_one(&mut self, env: Env<'_>) -> Result<Step, Fault> {
		let depth = self.in_flight.add_and_fetch(1);
		debug_assert_eq!(depth, 1, "actor {} entered by more than one thread", self.id);
		let result = self.dispatch(env);
		self.in_flight.sub_and_fetch(1);
		result
	}

	fn begin_drain(&mut self) {
		self.draining = true;
	}

	fn is_draining(&self) -> bool {
		self.draining
	}

	fn has_pending(&self) -> bool {
		!self.mailbox.is_empty()
	}

	fn stop(&mut self) -> Result<(), Fault> {
		let (actor, state) = (&self.actor, &mut self.state);
		guarded::<A, _>(FaultStage::Stop, || actor.post_stop(state))
	}
}
