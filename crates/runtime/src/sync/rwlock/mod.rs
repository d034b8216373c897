// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! RwLock synchronization primitive.

pub use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

/// A reader-writer lock.
///
/// Readers proceed in parallel; a writer waits until every outstanding read
/// guard has been released and blocks new readers while it holds the lock.
#[derive(Debug, Default)]
pub struct RwLock<T> {
	inner: parking_lot::RwLock<T>,
}

impl<T> RwLock<T> {
	pub fn new(value: T) -> Self {
		Self {
			inner: parking_lot::RwLock::new(value),
		}
	}

	#[inline]
	pub fn read(&self) -> RwLockReadGuard<'_, T> {
		self.inner.read()
	}

	#[inline]
	pub fn write(&self) -> RwLockWriteGuard<'_, T> {
		self.inner.write()
	}
}
