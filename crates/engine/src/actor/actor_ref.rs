// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	fmt,
	hash::{Hash, Hasher},
	marker::PhantomData,
};

use crate::id::{ActorId, WorkerId};

/// Typed address of an actor accepting `M`.
///
/// A plain id: copying it is free, it can be sent anywhere, and it keeps
/// nothing alive. Every use is resolved against the registry, so a reference
/// to a destroyed actor yields [`Delivery::NotFound`](crate::Delivery::NotFound).
pub struct ActorRef<M> {
	id: ActorId,
	_message: PhantomData<fn(M)>,
}

impl<M> ActorRef<M> {
	pub(crate) fn new(id: ActorId) -> Self {
		Self {
			id,
			_message: PhantomData,
		}
	}

	pub fn id(&self) -> ActorId {
		self.id
	}

	/// The worker that owns the actor.
	pub fn worker(&self) -> WorkerId {
		self.id.worker()
	}
}

impl<M> Clone for ActorRef<M> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<M> Copy for ActorRef<M> {}

impl<M> PartialEq for ActorRef<M> {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl<M> Eq for ActorRef<M> {}

impl<M> Hash for ActorRef<M> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl<M> fmt::Debug for ActorRef<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ActorRef").field(&self.id).finish()
	}
}

impl<M> fmt::Display for ActorRef<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.id, f)
	}
}

#[cfg(test)]
mod tests {
	use std::{cell::RefCell, rc::Rc};

	use super::*;

	fn assert_send_sync<T: Send + Sync>() {}

	#[test]
	fn test_send_sync_for_any_message() {
		// The message type itself need not be Sync for the address to be.
		assert_send_sync::<ActorRef<Rc<RefCell<u8>>>>();
	}

	#[test]
	fn test_copy_and_compare() {
		let a = ActorRef::<u32>::new(ActorId::compose(WorkerId(1), 9));
		let b = a;
		assert_eq!(a, b);
		assert_eq!(b.worker(), WorkerId(1));
		assert_eq!(format!("{a}"), "1:9");
	}
}
