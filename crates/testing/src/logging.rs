// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber that writes through the test harness.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Safe to call from
/// every test; only the first call installs anything.
pub fn init_tracing() {
	static INIT: Once = Once::new();
	INIT.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
			.with_test_writer()
			.with_thread_names(true)
			.try_init();
	});
}
