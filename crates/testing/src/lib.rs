// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Shared test tooling for the tessera crates.

pub mod logging;
pub mod platform;
pub mod probe;
pub mod util;

pub use logging::init_tracing;
pub use platform::{Applied, RecordingPlatform};
pub use probe::{ExclusionGuard, ExclusionProbe, Recorder};
pub use util::wait::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, wait_for, wait_for_condition};
