//! The one background thread that drives runs,
//! and the channel it uses to ask the foreground for answers.

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use mrs_pipeline::base::{InteractionRequest, InteractionResponse, Interactor};
use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	thread::JoinHandle,
};
use tracing::{debug, warn};

use crate::errors::WorkerError;

/// A request waiting for the foreground to answer it
#[derive(Debug)]
pub struct PendingInteraction {
	pub request: InteractionRequest,
	reply: Sender<InteractionResponse>,
}

impl PendingInteraction {
	/// Answer this request and wake the worker
	pub fn respond(self, response: InteractionResponse) {
		// The worker waits for exactly one reply.
		// If it is gone, the answer does not matter.
		if self.reply.send(response).is_err() {
			debug!(message = "Worker stopped waiting before we answered");
		}
	}
}

/// An [`Interactor`] that forwards every request to a [`Receiver`]
/// and blocks until it is answered
#[derive(Debug, Clone)]
pub struct ChannelInteractor {
	send: Sender<PendingInteraction>,
}

/// Make a connected [`ChannelInteractor`] and the receiver that answers it
pub fn interaction_channel() -> (ChannelInteractor, Receiver<PendingInteraction>) {
	let (send, receive) = unbounded();
	return (ChannelInteractor { send }, receive);
}

impl Interactor for ChannelInteractor {
	fn request(&self, request: InteractionRequest) -> InteractionResponse {
		let kind = request.kind();
		let (reply, wait) = bounded(1);

		if self
			.send
			.send(PendingInteraction { request, reply })
			.is_err()
		{
			warn!(message = "Nobody is answering requests, cancelling", kind);
			return InteractionResponse::Cancel;
		}

		debug!(message = "Waiting for answer", kind);
		return wait.recv().unwrap_or_else(|error| {
			warn!(message = "Request was dropped, cancelling", kind, ?error);
			InteractionResponse::Cancel
		});
	}
}

/// Clears the busy flag when the worker ends, even if it panics
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

/// Runs at most one job at a time on a background thread.
/// Clones share the busy and cancel flags, so a clone
/// can cancel a job another handle started.
#[derive(Debug, Default, Clone)]
pub struct Worker {
	busy: Arc<AtomicBool>,
	cancel: Arc<AtomicBool>,
}

impl Worker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_busy(&self) -> bool {
		self.busy.load(Ordering::SeqCst)
	}

	/// Ask the running job to stop at its next checkpoint
	pub fn cancel(&self) {
		self.cancel.store(true, Ordering::SeqCst);
	}

	/// True if the current job was asked to stop
	pub fn is_cancelled(&self) -> bool {
		self.cancel.load(Ordering::SeqCst)
	}

	/// Start `job` on a new thread. `job` gets the cancel flag.
	/// Fails if another job is still running.
	pub fn start<T, F>(&self, job: F) -> Result<JoinHandle<T>, WorkerError>
	where
		T: Send + 'static,
		F: FnOnce(&AtomicBool) -> T + Send + 'static,
	{
		if self.busy.swap(true, Ordering::SeqCst) {
			return Err(WorkerError::AlreadyRunning);
		}

		let guard = BusyGuard(self.busy.clone());
		self.cancel.store(false, Ordering::SeqCst);
		let cancel = self.cancel.clone();

		let handle = std::thread::Builder::new()
			.name("mrs-worker".into())
			.spawn(move || {
				let _guard = guard;
				job(&cancel)
			})?;

		return Ok(handle);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mrs_data::ManualAdjustment;
	use std::time::Duration;

	#[test]
	fn one_job_at_a_time() {
		let worker = Worker::new();
		let (go, wait) = bounded::<()>(0);

		let first = worker
			.start(move |_| {
				wait.recv().unwrap();
				1
			})
			.unwrap();
		assert!(worker.is_busy());
		assert!(matches!(
			worker.start(|_| 2),
			Err(WorkerError::AlreadyRunning)
		));

		go.send(()).unwrap();
		assert_eq!(first.join().unwrap(), 1);
		assert!(!worker.is_busy());

		let second = worker.start(|_| 2).unwrap();
		assert_eq!(second.join().unwrap(), 2);
	}

	#[test]
	fn busy_flag_survives_panic() {
		let worker = Worker::new();
		let h = worker.start::<(), _>(|_| panic!("boom")).unwrap();
		assert!(h.join().is_err());
		assert!(!worker.is_busy());
	}

	#[test]
	fn cancel_flag() {
		let worker = Worker::new();
		let h = worker
			.start(|cancel| {
				while !cancel.load(Ordering::SeqCst) {
					std::thread::sleep(Duration::from_millis(1));
				}
				true
			})
			.unwrap();
		worker.cancel();
		assert!(h.join().unwrap());

		// Flag is reset for the next job
		let h = worker.start(|cancel| cancel.load(Ordering::SeqCst)).unwrap();
		assert!(!h.join().unwrap());
	}

	#[test]
	fn clones_share_flags() {
		let worker = Worker::new();
		let handle = worker.clone();
		let (go, wait) = bounded::<()>(0);

		let h = worker
			.start(move |cancel| {
				wait.recv().unwrap();
				cancel.load(Ordering::SeqCst)
			})
			.unwrap();
		assert!(handle.is_busy());

		handle.cancel();
		assert!(worker.is_cancelled());
		go.send(()).unwrap();
		assert!(h.join().unwrap());
		assert!(!handle.is_busy());
	}

	#[test]
	fn requests_are_handed_over() {
		let (interactor, requests) = interaction_channel();
		let worker = Worker::new();

		let h = worker
			.start(move |_| {
				interactor.request(InteractionRequest::OfferManualAdjustment {
					current: ManualAdjustment::default(),
				})
			})
			.unwrap();

		let pending = requests.recv().unwrap();
		assert_eq!(pending.request.kind(), "OfferManualAdjustment");
		let answer = InteractionResponse::Adjustment(Some(ManualAdjustment {
			frequency: 0.5,
			phase0: 0.0,
			phase1: 0.0,
		}));
		pending.respond(answer.clone());
		assert_eq!(h.join().unwrap(), answer);
	}

	#[test]
	fn dropped_request_cancels() {
		let (interactor, requests) = interaction_channel();
		let h = std::thread::spawn(move || {
			interactor.request(InteractionRequest::SelectBasisSet {
				reason: "test".into(),
			})
		});

		drop(requests.recv().unwrap());
		assert_eq!(h.join().unwrap(), InteractionResponse::Cancel);

		let (interactor, requests) = interaction_channel();
		drop(requests);
		assert_eq!(
			interactor.request(InteractionRequest::SelectBasisSet {
				reason: "test".into(),
			}),
			InteractionResponse::Cancel
		);
	}
}
