// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Message delivery between actors on different workers.

use std::{
	thread,
	time::{Duration, Instant},
};

use tessera_engine::{Actor, ActorConfig, ActorRef, Context, Delivery, Engine, EngineConfig, Flow, Liveness, WorkerId};
use tessera_testing::{DEFAULT_TIMEOUT, ExclusionProbe, Recorder, init_tracing, wait_for};

/// Records every message it receives, with the worker that handled it.
struct Collector {
	seen: Recorder<(u32, WorkerId)>,
}

impl Actor for Collector {
	type State = ();
	type Message = u32;

	fn init(&self, _ctx: &mut Context<'_, u32>) {}

	fn handle(&self, _state: &mut (), msg: u32, ctx: &mut Context<'_, u32>) -> Flow {
		self.seen.record((msg, ctx.worker()));
		Flow::Continue
	}
}

enum ForwardMsg {
	Burst {
		to: ActorRef<u32>,
		values: Vec<u32>,
	},
}

/// Sends a burst of values and records how each send went and how long it
/// took.
struct Forwarder {
	results: Recorder<(Delivery, Duration)>,
}

impl Actor for Forwarder {
	type State = ();
	type Message = ForwardMsg;

	fn init(&self, _ctx: &mut Context<'_, ForwardMsg>) {}

	fn handle(&self, _state: &mut (), msg: ForwardMsg, ctx: &mut Context<'_, ForwardMsg>) -> Flow {
		match msg {
			ForwardMsg::Burst {
				to,
				values,
			} => {
				for value in values {
					let started = Instant::now();
					let delivery = ctx.send(&to, value);
					self.results.record((delivery, started.elapsed()));
				}
			}
		}
		Flow::Continue
	}
}

#[test]
fn test_cross_worker_events_arrive_in_order() {
	init_tracing();
	let engine = Engine::start(EngineConfig::with_workers(3)).unwrap();

	let seen = Recorder::new();
	let a = {
		let seen = seen.clone();
		engine
			.spawn_on(WorkerId(1), move || Collector {
				seen,
			})
			.unwrap()
	};
	let results = Recorder::new();
	let b = {
		let results = results.clone();
		engine
			.spawn_on(WorkerId(2), move || Forwarder {
				results,
			})
			.unwrap()
	};
	assert_eq!(a.worker(), WorkerId(1));
	assert_eq!(b.worker(), WorkerId(2));

	assert_eq!(
		engine.send(
			&b,
			ForwardMsg::Burst {
				to: a,
				values: vec![1, 2, 3],
			}
		),
		Delivery::Enqueued
	);

	let received = seen.wait_for_len(3, DEFAULT_TIMEOUT);
	assert_eq!(received, vec![(1, WorkerId(1)), (2, WorkerId(1)), (3, WorkerId(1))]);

	let sent = results.wait_for_len(3, DEFAULT_TIMEOUT);
	for (delivery, elapsed) in sent {
		assert_eq!(delivery, Delivery::Enqueued);
		assert!(elapsed < Duration::from_millis(100), "send took {elapsed:?}");
	}

	engine.stop().unwrap();
}

#[test]
fn test_many_senders_keep_per_sender_order() {
	let engine = Engine::start(EngineConfig::with_workers(4)).unwrap();

	let seen = Recorder::new();
	let target = {
		let seen = seen.clone();
		engine
			.spawn_on(WorkerId(0), move || Collector {
				seen,
			})
			.unwrap()
	};

	let senders: Vec<_> = (1..4)
		.map(|worker| {
			engine
				.spawn_on(WorkerId(worker), || Forwarder {
					results: Recorder::new(),
				})
				.unwrap()
		})
		.collect();

	for (index, sender) in senders.iter().enumerate() {
		let base = (index as u32 + 1) * 1000;
		engine.send(
			sender,
			ForwardMsg::Burst {
				to: target,
				values: (base..base + 200).collect(),
			},
		);
	}

	let received = seen.wait_for_len(600, DEFAULT_TIMEOUT);
	for index in 0..3u32 {
		let base = (index + 1) * 1000;
		let from_sender: Vec<u32> =
			received.iter().map(|(value, _)| *value).filter(|value| (base..base + 200).contains(value)).collect();
		assert_eq!(from_sender, (base..base + 200).collect::<Vec<_>>());
	}

	engine.stop().unwrap();
}

#[test]
fn test_send_right_after_spawn_is_handled() {
	let engine = Engine::start(EngineConfig::with_workers(2)).unwrap();
	let seen = Recorder::new();
	let collector = {
		let seen = seen.clone();
		engine
			.spawn(move || Collector {
				seen,
			})
			.unwrap()
	};

	// The actor may still be under construction.
	assert!(matches!(engine.liveness(collector.id()), Some(Liveness::Pending | Liveness::Live)));
	assert_eq!(engine.send(&collector, 7), Delivery::Enqueued);
	assert_eq!(seen.wait_for_len(1, DEFAULT_TIMEOUT)[0].0, 7);

	wait_for(|| engine.liveness(collector.id()) == Some(Liveness::Live), "collector never went live");
	engine.stop().unwrap();
}

enum ProbeMsg {
	Tick,
}

/// Sends to a target until it is gone.
struct Prober {
	target: ActorRef<u32>,
	results: Recorder<Delivery>,
}

impl Actor for Prober {
	type State = ();
	type Message = ProbeMsg;

	fn init(&self, _ctx: &mut Context<'_, ProbeMsg>) {}

	fn pre_start(&self, _state: &mut (), ctx: &mut Context<'_, ProbeMsg>) {
		ctx.send_self(ProbeMsg::Tick);
	}

	fn handle(&self, _state: &mut (), msg: ProbeMsg, ctx: &mut Context<'_, ProbeMsg>) -> Flow {
		match msg {
			ProbeMsg::Tick => {
				let delivery = ctx.send(&self.target, 1);
				self.results.record(delivery);
				if delivery == Delivery::NotFound {
					return Flow::Stop;
				}
				ctx.send_self(ProbeMsg::Tick);
				Flow::Yield
			}
		}
	}
}

#[test]
fn test_destroy_races_with_remote_sends() {
	init_tracing();
	let engine = Engine::start(EngineConfig::with_workers(2)).unwrap();

	let target = engine
		.spawn_on(WorkerId(0), || Collector {
			seen: Recorder::new(),
		})
		.unwrap();
	let results = Recorder::new();
	{
		let results = results.clone();
		engine
			.spawn_on(WorkerId(1), move || Prober {
				target,
				results,
			})
			.unwrap();
	}

	wait_for(|| results.len() >= 50, "prober never got going");
	assert_eq!(engine.destroy(&target), Delivery::Enqueued);
	wait_for(|| results.snapshot().last() == Some(&Delivery::NotFound), "prober never saw the target go away");

	let observed = results.snapshot();
	let first_gone = observed.iter().position(|delivery| *delivery == Delivery::NotFound).unwrap();
	assert!(observed[..first_gone].iter().all(|delivery| *delivery == Delivery::Enqueued));
	assert!(observed[first_gone..].iter().all(|delivery| *delivery == Delivery::NotFound));

	assert_eq!(engine.liveness(target.id()), None);
	assert_eq!(engine.send(&target, 2), Delivery::NotFound);
	assert_eq!(engine.destroy(&target), Delivery::NotFound);

	engine.stop().unwrap();
}

/// Sends to a bounded actor on its own worker.
struct Flooder {
	target: ActorRef<u32>,
	results: Recorder<Delivery>,
}

impl Actor for Flooder {
	type State = ();
	type Message = u32;

	fn init(&self, _ctx: &mut Context<'_, u32>) {}

	fn handle(&self, _state: &mut (), count: u32, ctx: &mut Context<'_, u32>) -> Flow {
		for value in 0..count {
			self.results.record(ctx.send(&self.target, value));
		}
		Flow::Continue
	}
}

struct Bounded {
	seen: Recorder<(u32, WorkerId)>,
}

impl Actor for Bounded {
	type State = ();
	type Message = u32;

	fn init(&self, _ctx: &mut Context<'_, u32>) {}

	fn handle(&self, _state: &mut (), msg: u32, ctx: &mut Context<'_, u32>) -> Flow {
		self.seen.record((msg, ctx.worker()));
		Flow::Continue
	}

	fn config(&self) -> ActorConfig {
		ActorConfig::new().mailbox_capacity(2)
	}
}

#[test]
fn test_full_local_mailbox_drops() {
	let engine = Engine::start(EngineConfig::with_workers(1)).unwrap();

	let seen = Recorder::new();
	let bounded = {
		let seen = seen.clone();
		engine
			.spawn_on(WorkerId(0), move || Bounded {
				seen,
			})
			.unwrap()
	};
	let results = Recorder::new();
	let flooder = {
		let results = results.clone();
		engine
			.spawn_on(WorkerId(0), move || Flooder {
				target: bounded,
				results,
			})
			.unwrap()
	};

	engine.send(&flooder, 5);
	let outcome = results.wait_for_len(5, DEFAULT_TIMEOUT);
	assert_eq!(
		outcome,
		vec![Delivery::Enqueued, Delivery::Enqueued, Delivery::Dropped, Delivery::Dropped, Delivery::Dropped]
	);

	let received = seen.wait_for_len(2, DEFAULT_TIMEOUT);
	assert_eq!(received.iter().map(|(value, _)| *value).collect::<Vec<_>>(), vec![0, 1]);

	engine.stop().unwrap();
	assert_eq!(seen.len(), 2);
}

struct Exclusive {
	probe: ExclusionProbe,
	handled: Recorder<u32>,
}

impl Actor for Exclusive {
	type State = u64;
	type Message = u32;

	fn init(&self, _ctx: &mut Context<'_, u32>) -> u64 {
		0
	}

	fn handle(&self, state: &mut u64, msg: u32, _ctx: &mut Context<'_, u32>) -> Flow {
		let _inside = self.probe.enter();
		*state += 1;
		thread::yield_now();
		self.handled.record(msg);
		Flow::Continue
	}
}

#[test]
fn test_actor_never_runs_on_two_threads_at_once() {
	let engine = Engine::start(EngineConfig::with_workers(4).dispatch_budget(3)).unwrap();
	let probe = ExclusionProbe::new();
	let handled = Recorder::new();
	let target = {
		let probe = probe.clone();
		let handled = handled.clone();
		engine
			.spawn_on(WorkerId(0), move || Exclusive {
				probe,
				handled,
			})
			.unwrap()
	};

	thread::scope(|scope| {
		for sender in 0..4u32 {
			let engine = &engine;
			scope.spawn(move || {
				for value in 0..250 {
					assert_eq!(engine.send(&target, sender * 1000 + value), Delivery::Enqueued);
				}
			});
		}
	});

	handled.wait_for_len(1000, DEFAULT_TIMEOUT);
	assert_eq!(probe.max_observed(), 1);
	assert_eq!(probe.entries(), 1000);

	engine.stop().unwrap();
}

#[test]
fn test_send_to_unknown_id_is_not_found() {
	let engine = Engine::start(EngineConfig::with_workers(1)).unwrap();
	let collector = engine
		.spawn(|| Collector {
			seen: Recorder::new(),
		})
		.unwrap();
	engine.stop().unwrap();

	assert_eq!(engine.send(&collector, 1), Delivery::NotFound);
	assert_eq!(engine.destroy(&collector), Delivery::NotFound);
}
