// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Actor fault reports.

use std::fmt;

use tessera_runtime::time::{self, DateTime};

use crate::{
	actor::cell::Fault,
	id::{ActorId, WorkerId},
};

/// Which piece of actor code panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStage {
	/// The factory or `config`.
	Construct,
	/// `init` or `pre_start`.
	Start,
	Handle,
	/// `post_stop`.
	Stop,
}

impl fmt::Display for FaultStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			FaultStage::Construct => "construct",
			FaultStage::Start => "start",
			FaultStage::Handle => "handle",
			FaultStage::Stop => "stop",
		})
	}
}

/// An actor failed. The actor has been destroyed; its worker and every
/// other actor keep running.
#[derive(Debug, Clone, thiserror::Error)]
#[error("actor {actor} ({actor_type}) on worker {worker} failed in {stage}: {reason}")]
pub struct ActorFault {
	pub actor: ActorId,
	pub actor_type: &'static str,
	pub worker: WorkerId,
	pub stage: FaultStage,
	pub reason: String,
	/// Symbolic backtrace from the panic site, innermost frame first.
	pub backtrace: Vec<String>,
	/// Wall-clock time of the report.
	pub at: DateTime,
}

impl ActorFault {
	pub(crate) fn new(actor: ActorId, worker: WorkerId, fault: Fault) -> Self {
		Self {
			actor,
			actor_type: fault.actor_type,
			worker,
			stage: fault.stage,
			reason: fault.reason,
			backtrace: fault.backtrace,
			at: time::epoch(),
		}
	}
}
