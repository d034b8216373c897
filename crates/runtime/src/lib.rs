// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Platform primitives for the tessera actor engine.
//!
//! Threads, locks, wake primitives, thread-local slots, clocks, CPU affinity
//! and real-time priority, and fault diagnostics. OS-specific behavior sits
//! behind [`platform::Platform`] so the engine stays portable.

// #![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod atomic;
pub mod cpu;
pub mod diagnostic;
pub mod error;
pub mod platform;
pub mod sync;
pub mod thread;
pub mod time;
pub mod tls;

pub use cpu::{CpuSet, cpu_count};
pub use error::{Result, RuntimeError};
pub use platform::{NativePlatform, Platform, PriorityRange};
