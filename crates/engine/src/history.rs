//! Every intermediate result of a run.

use mrs_data::{Dataset, HeaderTable};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The data after one step of the chain.
/// Snapshot 0 is the loaded input, snapshot `i + 1` is the output of step `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
	pub main: Arc<Dataset>,
	pub water: Option<Arc<Dataset>>,
	pub header: Arc<HeaderTable>,

	/// The most recent job labels any step produced
	pub labels: Option<Vec<String>>,
}

/// An append-only list of [`Snapshot`]s, shared between the
/// worker that produces them and anyone who wants to look.
///
/// The lock is only held while a snapshot is appended or copied out,
/// never while a step runs.
#[derive(Debug, Default)]
pub struct SnapshotHistory {
	entries: Mutex<Vec<Snapshot>>,
}

impl SnapshotHistory {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, Vec<Snapshot>> {
		// A panicking reader cannot leave a half-appended vec behind
		self.entries.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Append `snapshot` as entry `index`.
	/// Returns `false` and does nothing if `index` is not the next free slot.
	pub fn commit(&self, index: usize, snapshot: Snapshot) -> bool {
		let mut entries = self.lock();
		if entries.len() != index {
			return false;
		}
		entries.push(snapshot);
		return true;
	}

	pub fn get(&self, index: usize) -> Option<Snapshot> {
		self.lock().get(index).cloned()
	}

	pub fn last(&self) -> Option<Snapshot> {
		self.lock().last().cloned()
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	/// Drop every snapshot after the first `len`
	pub fn truncate(&self, len: usize) {
		self.lock().truncate(len)
	}

	pub fn clear(&self) {
		self.lock().clear()
	}
}
