// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Worker placement and configuration checks at start.

use std::sync::Arc;

use tessera_engine::{ConfigError, Engine, EngineConfig, EngineError, WorkerConfig, WorkerId, WorkerState};
use tessera_runtime::{CpuSet, Platform};
use tessera_testing::{RecordingPlatform, init_tracing, wait_for};

fn start(config: EngineConfig, platform: &Arc<RecordingPlatform>) -> tessera_engine::Result<Engine> {
	Engine::start_with(config, Arc::clone(platform) as Arc<dyn Platform>)
}

#[test]
fn test_pinned_workers_apply_affinity_before_start_returns() {
	init_tracing();
	let platform = Arc::new(RecordingPlatform::new(4));
	let engine = start(EngineConfig::pinned(0..4), &platform).unwrap();

	for index in 0..4 {
		let name = format!("tessera-worker-{index}");
		let applied = platform.applied_by(&name).unwrap_or_else(|| panic!("{name} applied nothing"));
		assert_eq!(applied.affinity, Some(CpuSet::single(index)));
		assert_eq!(applied.priority, None);

		let info = engine.worker_info(WorkerId(index)).unwrap();
		assert_eq!(info.thread_name, name);
		assert_eq!(info.affinity, Some(CpuSet::single(index)));
	}

	engine.stop().unwrap();
}

#[test]
fn test_real_time_priority_applied() {
	let platform = Arc::new(RecordingPlatform::new(2));
	let config = EngineConfig::new()
		.workers(vec![WorkerConfig::new().cpu(1).priority(10), WorkerConfig::new().cpus([0, 1])])
		.thread_name_prefix("rt");
	let engine = start(config, &platform).unwrap();

	let first = platform.applied_by("rt-0").unwrap();
	assert_eq!(first.affinity, Some(CpuSet::single(1)));
	assert_eq!(first.priority, Some(10));
	assert_eq!(engine.worker_info(WorkerId(0)).unwrap().priority, Some(10));

	let second = platform.applied_by("rt-1").unwrap();
	assert_eq!(second.affinity, Some(CpuSet::first(2)));
	assert_eq!(second.priority, None);

	engine.stop().unwrap();
}

#[test]
fn test_unpinned_workers_touch_nothing() {
	let platform = Arc::new(RecordingPlatform::new(2));
	let engine = start(EngineConfig::with_workers(2), &platform).unwrap();
	assert!(platform.applied().is_empty());
	assert_eq!(engine.worker_info(WorkerId(1)).unwrap().affinity, Some(CpuSet::first(2)));
	engine.stop().unwrap();
}

#[test]
fn test_idle_workers_report_idle() {
	let platform = Arc::new(RecordingPlatform::new(2));
	let engine = start(EngineConfig::with_workers(2), &platform).unwrap();
	wait_for(|| engine.worker_info(WorkerId(0)).unwrap().state == WorkerState::Idle, "worker 0 never idled");
	engine.stop().unwrap();
}

#[test]
fn test_cpu_out_of_range() {
	let platform = Arc::new(RecordingPlatform::new(4));
	let err = start(EngineConfig::pinned([0, 7]), &platform).unwrap_err();
	assert!(
		matches!(
			err,
			EngineError::Config(ConfigError::CpuOutOfRange {
				worker: WorkerId(1),
				cpu: 7,
				available: 4,
			})
		),
		"{err}"
	);
	assert!(platform.applied().is_empty());
}

#[test]
fn test_priority_out_of_range() {
	let platform = Arc::new(RecordingPlatform::new(2));
	let err = start(EngineConfig::new().workers(vec![WorkerConfig::new().priority(500)]), &platform).unwrap_err();
	assert!(
		matches!(
			err,
			EngineError::Config(ConfigError::PriorityOutOfRange {
				priority: 500,
				..
			})
		),
		"{err}"
	);
}

#[test]
fn test_real_time_unsupported() {
	let platform = Arc::new(RecordingPlatform::new(2).without_real_time());
	let err = start(EngineConfig::new().workers(vec![WorkerConfig::new().priority(5)]), &platform).unwrap_err();
	assert!(
		matches!(
			err,
			EngineError::Config(ConfigError::RealTimeUnsupported {
				worker: WorkerId(0)
			})
		),
		"{err}"
	);
}

#[test]
fn test_empty_and_degenerate_configs() {
	let platform = Arc::new(RecordingPlatform::new(2));
	assert!(matches!(
		start(EngineConfig::with_workers(0), &platform),
		Err(EngineError::Config(ConfigError::NoWorkers))
	));
	assert!(matches!(
		start(EngineConfig::with_workers(1).dispatch_budget(0), &platform),
		Err(EngineError::Config(ConfigError::ZeroDispatchBudget))
	));
	assert!(matches!(
		start(EngineConfig::new().workers(vec![WorkerConfig::new().stack_size(1024)]), &platform),
		Err(EngineError::Config(ConfigError::StackTooSmall {
			size: 1024,
			..
		}))
	));
}

#[test]
fn test_rejected_affinity_fails_start_and_cleans_up() {
	let platform = Arc::new(RecordingPlatform::new(4).rejecting_affinity());
	let config = EngineConfig::with_workers(1).worker(WorkerConfig::new().cpu(2));
	let err = start(config, &platform).unwrap_err();
	assert!(
		matches!(
			err,
			EngineError::Config(ConfigError::AffinityRejected {
				worker: WorkerId(1),
				..
			})
		),
		"{err}"
	);
}

#[cfg(target_os = "linux")]
#[test]
fn test_host_pinning() {
	let native = tessera_runtime::NativePlatform::new();
	let cpus: Vec<usize> = native.available_cpus().iter().take(2).collect();
	if cpus.len() < 2 {
		return;
	}

	let engine = Engine::start(EngineConfig::pinned(cpus.clone())).unwrap();
	for (index, cpu) in cpus.iter().enumerate() {
		let info = engine.worker_info(WorkerId(index)).unwrap();
		assert_eq!(info.affinity, Some(CpuSet::single(*cpu)));
	}
	engine.stop().unwrap();
}
