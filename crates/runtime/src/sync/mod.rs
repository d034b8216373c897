// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Synchronization primitives.

pub mod condvar;
pub mod mutex;
pub mod parker;
pub mod rwlock;

pub use condvar::{Condvar, WaitTimeoutResult};
pub use mutex::{Mutex, MutexGuard, ReentrantMutex, TryLock};
pub use parker::{Parker, Wake};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
