// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Worker run loop.
//!
//! A worker is one OS thread that owns a set of actors. Each pass of its
//! loop:
//!
//! 1. Applies up to the dispatch budget of inbox commands posted by other
//!    threads: deliveries, spawns, destroys, timers and shutdown.
//! 2. Fires up to the dispatch budget of due timers.
//! 3. Runs one turn of the actor at the head of the ready queue: up to the
//!    dispatch budget of events, after which the actor goes to the back of
//!    the queue.
//! 4. With nothing ready and the inbox empty, parks until woken or the next
//!    timer deadline.
//!
//! The caps keep a flooded inbox or a burst of timers from starving the
//! actors already resident.
//!
//! Shutdown switches the worker to draining: new spawns are refused, every
//! mailbox is closed, queued events are still handled and each actor is
//! destroyed once its mailbox is empty. The loop exits when no actor is
//! left.

pub(crate) mod command;
pub(crate) mod scope;
mod status;

use std::{
	sync::{
		Arc, OnceLock,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Instant,
};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tessera_runtime::{
	Platform,
	diagnostic,
	sync::Parker,
	thread::{Thread, ThreadBuilder},
	time,
	tls::TlsKey,
};
use tracing::{debug, error, trace, warn};

pub use self::status::{WorkerInfo, WorkerState};
pub(crate) use self::status::WorkerStatus;
use self::{
	command::Command,
	scope::{Env, Scope},
};
use crate::{
	actor::{
		Delivery,
		cell::{ActorCell, Fault, Step},
	},
	config::WorkerConfig,
	error::{ConfigError, EngineError},
	fault::ActorFault,
	id::{ActorId, WorkerId},
	registry::Registry,
};

/// Engine state shared by every worker.
pub(crate) struct Shared {
	pub(crate) registry: Registry,
	shutting_down: AtomicBool,
	faults: Sender<ActorFault>,
	instance: usize,
	next_worker: AtomicUsize,
}

impl Shared {
	pub(crate) fn new(registry: Registry, faults: Sender<ActorFault>) -> Self {
		static NEXT_INSTANCE: AtomicUsize = AtomicUsize::new(1);
		Self {
			registry,
			shutting_down: AtomicBool::new(false),
			faults,
			instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
			next_worker: AtomicUsize::new(0),
		}
	}

	pub(crate) fn is_shutting_down(&self) -> bool {
		self.shutting_down.load(Ordering::Acquire)
	}

	/// Returns `false` if shutdown had already begun.
	pub(crate) fn begin_shutdown(&self) -> bool {
		!self.shutting_down.swap(true, Ordering::AcqRel)
	}

	/// Round-robin placement.
	pub(crate) fn next_worker(&self) -> WorkerId {
		WorkerId(self.next_worker.fetch_add(1, Ordering::Relaxed) % self.registry.worker_count())
	}

	/// Whether the calling thread is one of this engine's workers.
	pub(crate) fn is_own_worker_thread(&self) -> bool {
		worker_key().get() == Some(self.instance)
	}

	pub(crate) fn report(&self, actor: ActorId, worker: WorkerId, fault: Fault) {
		let fault = ActorFault::new(actor, worker, fault);
		error!(
			actor = %fault.actor,
			actor_type = fault.actor_type,
			worker = %worker,
			stage = %fault.stage,
			reason = %fault.reason,
			"actor failed"
		);
		if !fault.backtrace.is_empty() {
			debug!(actor = %fault.actor, backtrace = ?fault.backtrace, "actor failure backtrace");
		}
		if let Err(TrySendError::Full(fault)) = self.faults.try_send(fault) {
			warn!(actor = %fault.actor, stage = %fault.stage, "fault channel full, dropping report");
		}
	}
}

/// Marks worker threads with the instance number of their engine.
fn worker_key() -> &'static TlsKey {
	static KEY: OnceLock<TlsKey> = OnceLock::new();
	KEY.get_or_init(TlsKey::new)
}

/// Everything a worker thread needs, handed over at launch.
pub(crate) struct Launch {
	pub(crate) id: WorkerId,
	pub(crate) config: WorkerConfig,
	pub(crate) thread_name: String,
	pub(crate) budget: usize,
	pub(crate) shared: Arc<Shared>,
	pub(crate) inbox: Receiver<Command>,
	pub(crate) parker: Arc<Parker>,
	pub(crate) status: Arc<WorkerStatus>,
	pub(crate) platform: Arc<dyn Platform>,
}

/// Spawn the worker thread.
///
/// The thread applies its own affinity and priority first and reports the
/// outcome on the returned channel before it runs any actor code.
pub(crate) fn launch(launch: Launch) -> Result<(Thread<()>, Receiver<Result<(), ConfigError>>), EngineError> {
	let (ready_tx, ready_rx) = bounded(1);
	let id = launch.id;

	let mut builder = ThreadBuilder::new().name(launch.thread_name.clone());
	if let Some(stack_size) = launch.config.stack_size {
		builder = builder.stack_size(stack_size);
	}

	let thread = builder
		.spawn(move || {
			let Launch {
				id,
				config,
				budget,
				shared,
				inbox,
				parker,
				status,
				platform,
				..
			} = launch;

			worker_key().set(shared.instance);
			diagnostic::capture_panics_on_current_thread();

			let placed = place(id, &config, platform.as_ref(), &status);
			let failed = placed.is_err();
			let _ = ready_tx.send(placed);
			if failed {
				status.set_state(WorkerState::Stopped);
				return;
			}

			Worker {
				id,
				budget,
				shared,
				inbox,
				parker,
				status,
				scope: Scope::new(),
			}
			.run();
		})
		.map_err(|source| EngineError::Resource {
			worker: id,
			source,
		})?;

	Ok((thread, ready_rx))
}

fn place(id: WorkerId, config: &WorkerConfig, platform: &dyn Platform, status: &WorkerStatus) -> Result<(), ConfigError> {
	if let Some(spec) = &config.cpu {
		platform.set_affinity(&spec.to_cpu_set()).map_err(|source| ConfigError::AffinityRejected {
			worker: id,
			source,
		})?;
	}
	if let Some(priority) = config.priority {
		platform.set_real_time(Some(priority)).map_err(|source| ConfigError::PriorityRejected {
			worker: id,
			source,
		})?;
	}

	let affinity = platform.current_affinity().ok();
	status.set_placement(affinity, config.priority);
	debug!(
		worker = %id,
		platform = platform.name(),
		affinity = %affinity.map(|cpus| cpus.to_string()).unwrap_or_else(|| "unknown".to_string()),
		priority = ?config.priority,
		"worker placed"
	);
	Ok(())
}

struct Worker {
	id: WorkerId,
	budget: usize,
	shared: Arc<Shared>,
	inbox: Receiver<Command>,
	parker: Arc<Parker>,
	status: Arc<WorkerStatus>,
	scope: Scope,
}

impl Worker {
	fn run(mut self) {
		debug!(worker = %self.id, "worker started");
		self.status.set_state(WorkerState::Idle);

		loop {
			if self.drain_inbox() && !self.scope.is_draining() {
				self.begin_shutdown();
			}
			if !self.scope.is_draining() {
				self.fire_timers();
			}

			if let Some(cell) = self.scope.take_ready() {
				self.turn(cell);
				continue;
			}

			if self.scope.is_draining() {
				self.destroy_idle();
				if self.scope.actor_count() == 0 {
					break;
				}
				if self.scope.has_ready() {
					continue;
				}
			} else {
				self.status.set_state(WorkerState::Idle);
			}

			if !self.inbox.is_empty() {
				continue;
			}
			let deadline = self.scope.timers().next_deadline();
			self.parker.park(deadline);
		}

		self.sweep_inbox();
		self.status.set_state(WorkerState::Stopped);
		debug!(worker = %self.id, "worker stopped");
	}

	fn env(&mut self) -> Env<'_> {
		Env::new(self.id, &self.shared, &mut self.scope)
	}

	/// Apply at most `budget` posted commands. Returns whether shutdown was
	/// requested.
	fn drain_inbox(&mut self) -> bool {
		let mut shutdown = false;
		for _ in 0..self.budget {
			let Ok(command) = self.inbox.try_recv() else {
				break;
			};
			match command {
				Command::Deliver {
					target,
					payload,
				} => {
					if self.scope.deliver(target, payload).is_err() {
						trace!(worker = %self.id, actor = %target, "dropped message to missing actor");
					}
				}
				Command::Spawn {
					id,
					start,
				} => {
					if self.scope.is_draining() {
						self.shared.registry.invalidate(id);
						debug!(worker = %self.id, actor = %id, "spawn refused while draining");
					} else {
						self.env().install(id, start);
					}
				}
				Command::Destroy {
					target,
				} => {
					if !self.env().destroy_resident(target) {
						trace!(worker = %self.id, actor = %target, "destroy for missing actor");
					}
				}
				Command::Schedule {
					entry,
				} => {
					if !self.scope.is_draining() {
						self.scope.timers().push(entry);
					}
				}
				Command::Shutdown => shutdown = true,
			}
		}
		shutdown
	}

	fn fire_timers(&mut self) {
		let now = Instant::now();
		for _ in 0..self.budget {
			let Some(fired) = self.scope.timers().pop_due(now) else {
				break;
			};
			let target = fired.target;
			if self.env().send(target, fired.payload) == Delivery::NotFound {
				fired.disarm.disarm();
				trace!(worker = %self.id, actor = %target, "timer target gone");
			}
		}
	}

	/// Run one turn of `cell`.
	fn turn(&mut self, mut cell: Box<dyn ActorCell>) {
		if !self.scope.is_draining() {
			self.status.set_state(WorkerState::Running);
		}

		let started = time::cycles();
		let mut events = 0u64;
		let mut fault = None;

		while (events as usize) < self.budget && cell.has_pending() {
			events += 1;
			match cell.process_one(self.env()) {
				Ok(Step::More | Step::Empty) => {}
				Ok(Step::Yield) => break,
				Err(caught) => {
					fault = Some(caught);
					break;
				}
			}
		}

		self.status.record_turn(time::cycles().wrapping_sub(started), events);

		if let Some(fault) = fault {
			self.shared.report(cell.id(), self.id, fault);
			self.env().finalize(cell);
		} else if cell.is_draining() && !cell.has_pending() {
			self.env().finalize(cell);
		} else {
			self.scope.restore(cell);
		}
	}

	fn begin_shutdown(&mut self) {
		self.status.set_state(WorkerState::Draining);
		debug!(worker = %self.id, actors = self.scope.actor_count(), "worker draining");
		self.destroy_idle();
	}

	fn destroy_idle(&mut self) {
		for cell in self.scope.begin_drain() {
			self.env().finalize(cell);
		}
	}

	/// Spawns that raced with shutdown still hold reserved ids.
	fn sweep_inbox(&mut self) {
		let mut refused = 0usize;
		while let Ok(command) = self.inbox.try_recv() {
			if let Command::Spawn {
				id,
				..
			} = command
			{
				self.shared.registry.invalidate(id);
				refused += 1;
			}
		}
		if refused > 0 {
			debug!(worker = %self.id, refused, "refused spawns after drain");
		}
	}
}
