// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Core actor trait and associated types.
//!
//! - [`Actor`]: the trait every actor implements
//! - [`Flow`]: what the worker does after a handler returns
//! - [`ActorConfig`]: per-actor settings
//! - [`ActorRef`]: typed address of an actor
//! - [`Context`]: what a handler can do besides touching its own state

mod actor_ref;
pub(crate) mod cell;
mod context;

pub use actor_ref::ActorRef;
pub use context::Context;

/// What the actor wants to do after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	/// Keep processing messages while the turn's budget lasts.
	Continue,

	/// End this turn. The actor goes to the back of the ready queue if it
	/// still has messages.
	Yield,

	/// Stop this actor.
	///
	/// No new messages are accepted; the ones already queued are handled,
	/// then `post_stop` runs and the actor is destroyed.
	Stop,
}

/// Outcome of a send or destroy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
	/// Queued for the target, or for its owning worker.
	Enqueued,
	/// The target no longer exists or is already stopping. Routine, not an
	/// error.
	NotFound,
	/// The target exists but refused the message, because its mailbox is
	/// full. Only detected for targets on the sender's own worker; refusals
	/// on other workers are logged there.
	Dropped,
}

impl Delivery {
	pub fn is_enqueued(&self) -> bool {
		matches!(self, Delivery::Enqueued)
	}
}

/// Configuration for actor behavior.
#[derive(Debug, Clone)]
pub struct ActorConfig {
	/// Mailbox capacity. 0 = unbounded.
	///
	/// A message arriving at a full mailbox is dropped and logged.
	///
	/// Default: 0 (unbounded)
	pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
	fn default() -> Self {
		Self {
			mailbox_capacity: 0,
		}
	}
}

impl ActorConfig {
	/// Create a new config with default values.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the mailbox capacity. 0 = unbounded.
	pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
		self.mailbox_capacity = capacity;
		self
	}
}

/// The core actor abstraction.
///
/// Actors are isolated units of computation that:
/// - Own their state exclusively (no shared mutable state)
/// - Process messages one at a time, on one worker thread at a time
/// - Communicate with other actors only via message passing
///
/// An actor is built on its owning worker by a factory closure, so the
/// actor and its state never cross threads and need not be `Send`. Only the
/// factory and the messages do.
///
/// # Lifecycle
///
/// 1. `init()` - Create initial state
/// 2. `pre_start()` - Called before the first message
/// 3. `handle()` for each message, in the order they were sent
/// 4. `post_stop()` - Cleanup after the actor stopped, also after a panic in
///    `handle`
///
/// A panic in any of these fails only this actor; it is reported on the
/// engine's fault channel.
///
/// # Example
///
/// ```ignore
/// struct Counter;
///
/// enum CounterMsg {
///     Increment,
///     Report { to: ActorRef<u64> },
/// }
///
/// impl Actor for Counter {
///     type State = u64;
///     type Message = CounterMsg;
///
///     fn init(&self, _ctx: &mut Context<'_, CounterMsg>) -> u64 {
///         0
///     }
///
///     fn handle(&self, state: &mut u64, msg: CounterMsg, ctx: &mut Context<'_, CounterMsg>) -> Flow {
///         match msg {
///             CounterMsg::Increment => *state += 1,
///             CounterMsg::Report { to } => {
///                 ctx.send(&to, *state);
///             }
///         }
///         Flow::Continue
///     }
/// }
/// ```
pub trait Actor: 'static {
	/// The actor's internal state (owned, not shared).
	type State: 'static;

	/// Messages this actor can receive.
	type Message: Send + 'static;

	/// Create initial state.
	fn init(&self, ctx: &mut Context<'_, Self::Message>) -> Self::State;

	/// Handle a single message. Must not block; waiting is expressed by
	/// scheduling a message for later.
	fn handle(&self, state: &mut Self::State, msg: Self::Message, ctx: &mut Context<'_, Self::Message>) -> Flow;

	/// Called once before message processing begins.
	#[allow(unused_variables)]
	fn pre_start(&self, state: &mut Self::State, ctx: &mut Context<'_, Self::Message>) {}

	/// Called once after the actor stops, before it is removed from the
	/// registry.
	#[allow(unused_variables)]
	fn post_stop(&self, state: &mut Self::State) {}

	/// Actor configuration. Override for custom settings.
	fn config(&self) -> ActorConfig {
		ActorConfig::default()
	}
}
