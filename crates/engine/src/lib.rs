// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Multi-core actor execution engine.
//!
//! An [`Engine`] owns a fixed set of workers. Each worker is one OS thread,
//! optionally pinned to CPUs and running at real-time priority, that
//! dispatches the actors it owns. Actors are addressed only through
//! [`ActorRef`]s; a sharded registry turns every cross-worker send or destroy
//! into a checked lookup that can report [`Delivery::NotFound`] but can never
//! reach an actor that is being torn down.
//!
//! ```ignore
//! struct Counter;
//!
//! impl Actor for Counter {
//!     type State = u64;
//!     type Message = u64;
//!
//!     fn init(&self, _ctx: &mut Context<'_, u64>) -> u64 {
//!         0
//!     }
//!
//!     fn handle(&self, state: &mut u64, msg: u64, _ctx: &mut Context<'_, u64>) -> Flow {
//!         *state += msg;
//!         Flow::Continue
//!     }
//! }
//!
//! let engine = Engine::start(EngineConfig::with_workers(2))?;
//! let counter = engine.spawn(|| Counter)?;
//! engine.send(&counter, 5);
//! engine.stop()?;
//! ```

// #![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod actor;
pub mod config;
pub mod engine;
pub mod error;
pub mod fault;
pub mod id;
pub(crate) mod registry;
pub mod timer;
pub mod worker;

pub use actor::{Actor, ActorConfig, ActorRef, Context, Delivery, Flow};
pub use config::{CpuSpec, EngineConfig, WorkerConfig};
pub use engine::Engine;
pub use error::{ConfigError, EngineError, Result};
pub use fault::{ActorFault, FaultStage};
pub use id::{ActorId, WorkerId};
pub use registry::Liveness;
pub use timer::TimerHandle;
pub use worker::{WorkerInfo, WorkerState};
