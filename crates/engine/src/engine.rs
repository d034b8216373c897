// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Engine lifecycle.
//!
//! [`Engine::start`] validates the configuration, brings up one thread per
//! worker and returns only once every worker has applied its affinity and
//! priority. [`Engine::stop`] drains all workers and joins them. Dropping an
//! engine stops it.

use std::{
	fmt,
	sync::Arc,
	time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, bounded, unbounded};
use tessera_runtime::{
	NativePlatform, Platform,
	sync::{Mutex, Parker},
	thread::Thread,
};
use tracing::{debug, error, info, warn};

use crate::{
	actor::{Actor, ActorRef, Delivery, cell::Cell},
	config::EngineConfig,
	error::{EngineError, Result},
	fault::ActorFault,
	id::{ActorId, WorkerId},
	registry::{Liveness, Registry, Resolution, Route},
	timer::{TimerEntry, TimerHandle},
	worker::{
		self, Launch, Shared, WorkerInfo, WorkerStatus,
		command::Command,
		scope::{self, Env},
	},
};

struct WorkerSlot {
	id: WorkerId,
	thread_name: String,
	status: Arc<WorkerStatus>,
}

/// A running set of workers and the actors they own.
///
/// `Engine` is `Send + Sync`; share it behind an `Arc` to spawn and send
/// from several threads.
pub struct Engine {
	shared: Arc<Shared>,
	workers: Vec<WorkerSlot>,
	threads: Mutex<Vec<(WorkerId, Thread<()>)>>,
	faults: Receiver<ActorFault>,
}

impl Engine {
	/// Start an engine on the host platform.
	pub fn start(config: EngineConfig) -> Result<Self> {
		Self::start_with(config, Arc::new(NativePlatform::new()))
	}

	/// Start an engine whose workers place themselves through `platform`.
	pub fn start_with(config: EngineConfig, platform: Arc<dyn Platform>) -> Result<Self> {
		config.validate(platform.as_ref())?;

		let (fault_tx, fault_rx) = bounded(config.fault_capacity);
		let mut inboxes = Vec::with_capacity(config.workers.len());
		let mut routes = Vec::with_capacity(config.workers.len());
		for _ in &config.workers {
			let (tx, rx) = unbounded();
			let parker = Arc::new(Parker::new());
			routes.push(Route::new(tx, Arc::clone(&parker)));
			inboxes.push((rx, parker));
		}
		let shared = Arc::new(Shared::new(Registry::new(routes), fault_tx));

		let mut workers = Vec::with_capacity(config.workers.len());
		let mut threads = Vec::with_capacity(config.workers.len());
		let mut handshakes = Vec::with_capacity(config.workers.len());

		for (index, ((inbox, parker), worker_config)) in inboxes.into_iter().zip(config.workers.iter()).enumerate() {
			let id = WorkerId(index);
			let thread_name = config.thread_name(id);
			let status = Arc::new(WorkerStatus::new());

			let launched = worker::launch(Launch {
				id,
				config: worker_config.clone(),
				thread_name: thread_name.clone(),
				budget: config.dispatch_budget,
				shared: Arc::clone(&shared),
				inbox,
				parker,
				status: Arc::clone(&status),
				platform: Arc::clone(&platform),
			});

			match launched {
				Ok((thread, handshake)) => {
					threads.push((id, thread));
					handshakes.push((id, handshake));
				}
				Err(err) => {
					error!(worker = %id, error = %err, "failed to launch worker");
					shut_down(&shared, threads);
					return Err(err);
				}
			}

			workers.push(WorkerSlot {
				id,
				thread_name,
				status,
			});
		}

		for (id, handshake) in handshakes {
			let outcome = match handshake.recv() {
				Ok(Ok(())) => continue,
				Ok(Err(err)) => EngineError::Config(err),
				Err(_) => EngineError::WorkerPanicked(id),
			};
			error!(worker = %id, error = %outcome, "worker failed to start");
			shut_down(&shared, threads);
			return Err(outcome);
		}

		info!(workers = workers.len(), platform = platform.name(), "engine started");

		Ok(Self {
			shared,
			workers,
			threads: Mutex::new(threads),
			faults: fault_rx,
		})
	}

	/// Spawn an actor on the next worker in round-robin order.
	pub fn spawn<A, F>(&self, factory: F) -> Result<ActorRef<A::Message>>
	where
		A: Actor,
		F: FnOnce() -> A + Send + 'static,
	{
		self.spawn_on(self.shared.next_worker(), factory)
	}

	/// Spawn an actor on `worker`.
	///
	/// The actor is built on its worker by `factory`. The returned reference
	/// is usable right away: messages sent to it are handled once the actor
	/// has started.
	pub fn spawn_on<A, F>(&self, worker: WorkerId, factory: F) -> Result<ActorRef<A::Message>>
	where
		A: Actor,
		F: FnOnce() -> A + Send + 'static,
	{
		if self.shared.is_shutting_down() {
			return Err(EngineError::ShuttingDown);
		}
		scope::spawn_on(&self.shared, worker, Box::new(move |env: Env<'_>, id| Cell::<A>::start(factory, env, id)))
			.map(ActorRef::new)
	}

	/// Send `msg` to `target`. Never blocks.
	pub fn send<M: Send + 'static>(&self, target: &ActorRef<M>, msg: M) -> Delivery {
		scope::post(&self.shared, target.id(), Box::new(msg))
	}

	/// Ask `target` to stop once it has handled what is already queued.
	pub fn destroy<M>(&self, target: &ActorRef<M>) -> Delivery {
		let id = target.id();
		let resolution = self.shared.registry.resolve(id, |live| {
			live.post(Command::Destroy {
				target: id,
			})
		});
		match resolution {
			Resolution::Found(true) => Delivery::Enqueued,
			_ => Delivery::NotFound,
		}
	}

	/// Send `msg` to `target` after `delay`.
	///
	/// The timer is armed on the target's worker.
	pub fn schedule_once<M: Send + 'static>(&self, target: &ActorRef<M>, delay: Duration, msg: M) -> Result<TimerHandle> {
		if self.shared.is_shutting_down() {
			return Err(EngineError::ShuttingDown);
		}
		let worker = target.worker();
		let Some(route) = self.shared.registry.route(worker) else {
			return Err(EngineError::UnknownWorker(worker));
		};

		let handle = TimerHandle::new();
		let entry = TimerEntry::once(&handle, target.id(), Instant::now() + delay, Box::new(msg));
		if !route.post(Command::Schedule {
			entry,
		}) {
			return Err(EngineError::ShuttingDown);
		}
		Ok(handle)
	}

	/// Receiver for actor failures.
	///
	/// All receivers share one queue: each fault is received by exactly one of
	/// them. The queue holds
	/// [`fault_capacity`](crate::EngineConfig::fault_capacity) reports; further
	/// faults are logged and dropped until it is drained.
	pub fn faults(&self) -> Receiver<ActorFault> {
		self.faults.clone()
	}

	pub fn worker_count(&self) -> usize {
		self.workers.len()
	}

	/// Snapshot of a worker's placement and counters.
	pub fn worker_info(&self, worker: WorkerId) -> Option<WorkerInfo> {
		self.workers.get(worker.0).map(|slot| slot.status.snapshot(slot.id, &slot.thread_name))
	}

	/// Number of actors currently registered, including ones still starting.
	pub fn live_actors(&self) -> usize {
		self.shared.registry.len()
	}

	pub fn liveness(&self, id: ActorId) -> Option<Liveness> {
		self.shared.registry.liveness(id)
	}

	pub fn is_running(&self) -> bool {
		!self.shared.is_shutting_down()
	}

	/// Stop every worker and wait for them to finish.
	///
	/// Queued messages are still handled; every actor's `post_stop` runs.
	/// Calling `stop` again is a no-op. Fails with
	/// [`EngineError::StopFromWorker`] when called from inside an actor.
	pub fn stop(&self) -> Result<()> {
		if self.shared.is_own_worker_thread() {
			return Err(EngineError::StopFromWorker);
		}

		let mut threads = self.threads.lock();
		if threads.is_empty() {
			return Ok(());
		}
		if self.shared.begin_shutdown() {
			info!("engine stopping");
		}

		for route in self.shared.registry.routes() {
			route.post(Command::Shutdown);
		}

		let mut result = Ok(());
		for (id, thread) in threads.drain(..) {
			if thread.join().is_err() {
				error!(worker = %id, "worker thread panicked");
				if result.is_ok() {
					result = Err(EngineError::WorkerPanicked(id));
				}
			}
		}

		let leftover = self.shared.registry.clear();
		if leftover > 0 {
			debug!(leftover, "cleared registry entries after shutdown");
		}
		debug_assert!(self.shared.registry.is_empty());
		info!("engine stopped");
		result
	}
}

impl fmt::Debug for Engine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("workers", &self.workers.len())
			.field("live_actors", &self.live_actors())
			.field("running", &self.is_running())
			.finish()
	}
}

impl Drop for Engine {
	fn drop(&mut self) {
		if let Err(err) = self.stop() {
			warn!(error = %err, "engine drop could not stop cleanly");
		}
	}
}

/// Tear down workers launched before a start failure.
fn shut_down(shared: &Shared, threads: Vec<(WorkerId, Thread<()>)>) {
	shared.begin_shutdown();
	for route in shared.registry.routes() {
		route.post(Command::Shutdown);
	}
	for (id, thread) in threads {
		if thread.join().is_err() {
			error!(worker = %id, "worker thread panicked");
		}
	}
	shared.registry.clear();
}
