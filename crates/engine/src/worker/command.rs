// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Commands posted into a worker's inbox.

use std::{any::Any, fmt};

use crate::{
	actor::cell::{ActorCell, Fault},
	id::ActorId,
	timer::TimerEntry,
	worker::scope::Env,
};

/// A type-erased event; the target's cell downcasts it to its message type.
pub(crate) type Payload = Box<dyn Any + Send>;

/// Builds an actor on its owning worker.
pub(crate) type StartFn = Box<dyn FnOnce(Env<'_>, ActorId) -> Result<Box<dyn ActorCell>, Fault> + Send>;

pub(crate) enum Command {
	Deliver {
		target: ActorId,
		payload: Payload,
	},
	Spawn {
		id: ActorId,
		start: StartFn,
	},
	Destroy {
		target: ActorId,
	},
	Schedule {
		entry: TimerEntry,
	},
	Shutdown,
}

impl fmt::Debug for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Command::Deliver {
				target,
				..
			} => f.debug_struct("Deliver").field("target", target).finish_non_exhaustive(),
			Command::Spawn {
				id,
				..
			} => f.debug_struct("Spawn").field("id", id).finish_non_exhaustive(),
			Command::Destroy {
				target,
			} => f.debug_struct("Destroy").field("target", target).finish(),
			Command::Schedule {
				entry,
			} => f.debug_struct("Schedule").field("target", &entry.target()).finish_non_exhaustive(),
			Command::Shutdown => f.write_str("Shutdown"),
		}
	}
}
