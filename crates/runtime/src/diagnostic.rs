// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Diagnostics for fault reports.
//!
//! Nothing in here belongs on a hot path: backtraces are captured only when
//! something has already gone wrong.

use std::{
	any::Any,
	backtrace::Backtrace,
	cell::{Cell, RefCell},
	panic::{self, PanicHookInfo},
	sync::Once,
};

/// Default number of frames kept by [`backtrace`].
pub const DEFAULT_BACKTRACE_DEPTH: usize = 32;

/// Symbolic backtrace of the calling thread, innermost frame first, at most
/// `depth` frames. Frames belonging to the capture machinery are skipped.
pub fn backtrace(depth: usize) -> Vec<String> {
	frames(&Backtrace::force_capture().to_string(), depth)
}

fn frames(rendered: &str, depth: usize) -> Vec<String> {
	rendered
		.lines()
		.filter_map(|line| {
			let line = line.trim_start();
			let (index, symbol) = line.split_once(": ")?;
			index.chars().all(|c| c.is_ascii_digit()).then(|| symbol.trim().to_string())
		})
		.filter(|symbol| !is_capture_frame(symbol))
		.take(depth)
		.collect()
}

fn is_capture_frame(symbol: &str) -> bool {
	symbol.starts_with("std::backtrace")
		|| symbol.starts_with("std::backtrace_rs")
		|| symbol.starts_with("tessera_runtime::diagnostic::")
		|| symbol.starts_with("std::panicking")
		|| symbol.starts_with("core::panicking")
		|| symbol.starts_with("<alloc::boxed::Box<F,A> as core::ops::function::Fn")
}

/// Demangle a legacy Rust symbol (`_ZN...E`).
///
/// The trailing hash segment is dropped. Strings that are not mangled
/// symbols are returned unchanged.
pub fn demangle(symbol: &str) -> String {
	let Some(body) = symbol.strip_prefix("_ZN").or_else(|| symbol.strip_prefix("__ZN")) else {
		return symbol.to_string();
	};

	let mut segments = Vec::new();
	let mut rest = body;
	loop {
		if let Some(tail) = rest.strip_prefix('E') {
			if tail.is_empty() || tail.starts_with('.') {
				break;
			}
		}
		let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
		if digits == 0 {
			return symbol.to_string();
		}
		let Ok(len) = rest[..digits].parse::<usize>() else {
			return symbol.to_string();
		};
		rest = &rest[digits..];
		if rest.len() < len {
			return symbol.to_string();
		}
		segments.push(&rest[..len]);
		rest = &rest[len..];
	}

	if let Some(last) = segments.last() {
		if is_hash(last) {
			segments.pop();
		}
	}

	segments.iter().map(|segment| unescape(segment)).collect::<Vec<_>>().join("::")
}

fn is_hash(segment: &str) -> bool {
	segment.len() == 17 && segment.starts_with('h') && segment[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn unescape(segment: &str) -> String {
	let segment = segment.strip_prefix("_$").map(|s| format!("${s}")).unwrap_or_else(|| segment.to_string());
	let mut out = String::with_capacity(segment.len());
	let mut rest = segment.as_str();

	while !rest.is_empty() {
		if let Some(tail) = rest.strip_prefix("..") {
			out.push_str("::");
			rest = tail;
			continue;
		}
		if rest.starts_with('$') {
			if let Some(end) = rest[1..].find('$') {
				let code = &rest[1..end + 1];
				let replacement = match code {
					"SP" => Some('@'),
					"BP" => Some('*'),
					"RF" => Some('&'),
					"LT" => Some('<'),
					"GT" => Some('>'),
					"LP" => Some('('),
					"RP" => Some(')'),
					"C" => Some(','),
					_ => code
						.strip_prefix('u')
						.and_then(|hex| u32::from_str_radix(hex, 16).ok())
						.and_then(char::from_u32),
				};
				if let Some(c) = replacement {
					out.push(c);
					rest = &rest[end + 2..];
					continue;
				}
			}
		}
		let c = rest.chars().next().unwrap_or_default();
		out.push(c);
		rest = &rest[c.len_utf8()..];
	}

	out
}

/// Readable name of a type, for reports.
pub fn type_name_of<T: ?Sized>() -> &'static str {
	std::any::type_name::<T>()
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		message.to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}

/// What was recorded about the most recent panic on a capturing thread.
#[derive(Debug, Clone)]
pub struct PanicReport {
	pub message: String,
	pub location: Option<String>,
	pub backtrace: Vec<String>,
}

thread_local! {
	static CAPTURING: Cell<bool> = const { Cell::new(false) };
	static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

/// Record panics raised on the calling thread instead of printing them.
///
/// The report, including a backtrace taken at the panic site, is retrieved
/// with [`take_panic_report`] after the unwind has been caught. Threads that
/// never call this keep the previously installed panic hook's behavior.
pub fn capture_panics_on_current_thread() {
	install_hook();
	CAPTURING.with(|capturing| capturing.set(true));
}

/// Takes the report of the last captured panic on the calling thread.
pub fn take_panic_report() -> Option<PanicReport> {
	LAST_PANIC.with(|last| last.borrow_mut().take())
}

fn install_hook() {
	static INSTALL: Once = Once::new();
	INSTALL.call_once(|| {
		let previous = panic::take_hook();
		panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
			let capturing = CAPTURING.try_with(Cell::get).unwrap_or(false);
			if !capturing {
				previous(info);
				return;
			}
			let report = PanicReport {
				message: panic_message(info.payload()),
				location: info.location().map(|location| location.to_string()),
				backtrace: backtrace(DEFAULT_BACKTRACE_DEPTH),
			};
			let _ = LAST_PANIC.try_with(|last| *last.borrow_mut() = Some(report));
		}));
	});
}

#[cfg(test)]
mod tests {
	use std::thread;

	use super::*;

	#[test]
	fn test_demangle_legacy_symbol() {
		assert_eq!(demangle("_ZN7tessera6engine6Worker3run17h0123456789abcdefE"), "tessera::engine::Worker::run");
	}

	#[test]
	fn test_demangle_escapes() {
		assert_eq!(
			demangle("_ZN58_$LT$alloc..string..String$u20$as$u20$core..fmt..Debug$GT$3fmt17h1a2b3c4d5e6f7081E"),
			"<alloc::string::String as core::fmt::Debug>::fmt"
		);
	}

	#[test]
	fn test_demangle_passthrough() {
		assert_eq!(demangle("main"), "main");
		assert_eq!(demangle("_ZNbroken"), "_ZNbroken");
	}

	#[test]
	fn test_frames_parses_rendered_backtrace() {
		let rendered = "   0: std::backtrace::Backtrace::force_capture\n             at /rustc/library/std/src/backtrace.rs:1\n   1: my_crate::handler\n   2: my_crate::main\n";
		assert_eq!(frames(rendered, 8), vec!["my_crate::handler", "my_crate::main"]);
		assert_eq!(frames(rendered, 1), vec!["my_crate::handler"]);
	}

	#[test]
	fn test_backtrace_is_bounded() {
		assert!(backtrace(3).len() <= 3);
	}

	#[test]
	fn test_type_name() {
		assert_eq!(type_name_of::<u32>(), "u32");
	}

	#[test]
	fn test_capture_panic_report() {
		let report = thread::spawn(|| {
			capture_panics_on_current_thread();
			let result = panic::catch_unwind(|| panic!("boom {}", 42));
			assert!(result.is_err());
			take_panic_report()
		})
		.join()
		.unwrap()
		.unwrap();

		assert_eq!(report.message, "boom 42");
		assert!(report.location.unwrap().contains("diagnostic.rs"));
	}

	#[test]
	fn test_panic_message_from_payload() {
		let payload = panic::catch_unwind(|| panic!("static text")).unwrap_err();
		assert_eq!(panic_message(payload.as_ref()), "static text");
	}
}
