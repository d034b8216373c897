// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! CPU sets.

use std::fmt;

/// Highest number of CPUs a [`CpuSet`] can describe.
pub const MAX_CPUS: usize = 1024;

const WORDS: usize = MAX_CPUS / 64;

/// A set of CPU indices, used for thread affinity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CpuSet {
	bits: [u64; WORDS],
}

impl CpuSet {
	pub const fn new() -> Self {
		Self {
			bits: [0; WORDS],
		}
	}

	/// A set containing only `cpu`.
	pub fn single(cpu: usize) -> Self {
		let mut set = Self::new();
		set.insert(cpu);
		set
	}

	/// A set containing `0..count`.
	pub fn first(count: usize) -> Self {
		(0..count.min(MAX_CPUS)).collect()
	}

	/// Adds `cpu`. Returns `false` if it is beyond [`MAX_CPUS`].
	pub fn insert(&mut self, cpu: usize) -> bool {
		if cpu >= MAX_CPUS {
			return false;
		}
		self.bits[cpu / 64] |= 1 << (cpu % 64);
		true
	}

	pub fn remove(&mut self, cpu: usize) {
		if cpu < MAX_CPUS {
			self.bits[cpu / 64] &= !(1 << (cpu % 64));
		}
	}

	pub fn contains(&self, cpu: usize) -> bool {
		cpu < MAX_CPUS && self.bits[cpu / 64] & (1 << (cpu % 64)) != 0
	}

	pub fn len(&self) -> usize {
		self.bits.iter().map(|word| word.count_ones() as usize).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.bits.iter().all(|word| *word == 0)
	}

	/// Lowest CPU index in the set.
	pub fn lowest(&self) -> Option<usize> {
		self.iter().next()
	}

	/// Highest CPU index in the set.
	pub fn highest(&self) -> Option<usize> {
		self.iter().last()
	}

	pub fn is_subset(&self, other: &CpuSet) -> bool {
		self.bits.iter().zip(other.bits.iter()).all(|(a, b)| a & !b == 0)
	}

	/// CPU indices in ascending order.
	pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
		(0..MAX_CPUS).filter(move |cpu| self.contains(*cpu))
	}
}

impl FromIterator<usize> for CpuSet {
	fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
		let mut set = CpuSet::new();
		for cpu in iter {
			set.insert(cpu);
		}
		set
	}
}

impl fmt::Debug for CpuSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.iter()).finish()
	}
}

impl fmt::Display for CpuSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut first = true;
		for cpu in self.iter() {
			if !first {
				f.write_str(",")?;
			}
			write!(f, "{cpu}")?;
			first = false;
		}
		Ok(())
	}
}

/// Number of logical CPUs available to this process.
pub fn cpu_count() -> usize {
	num_cpus::get()
}
