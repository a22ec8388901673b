use crossbeam::{
	channel::{bounded, Receiver},
	select,
};
use indicatif::ProgressBar;
use mrs_engine::worker::{PendingInteraction, Worker};
use mrs_pipeline::base::{InteractionRequest, InteractionResponse};
use std::{process::exit, sync::atomic::AtomicBool};
use tracing::{trace, warn};

use crate::{errors::CliError, prompt::Responder};

/// Run `job` on `worker` and answer its requests until it returns
pub fn drive<T, F>(
	worker: &Worker,
	requests: &Receiver<PendingInteraction>,
	responder: &mut dyn Responder,
	job: F,
) -> Result<T, CliError>
where
	T: Send + 'static,
	F: FnOnce(&AtomicBool) -> T + Send + 'static,
{
	// Disconnects when the job ends
	let (finished, done) = bounded::<()>(0);
	let handle = worker.start(move |cancel| {
		let _finished = finished;
		job(cancel)
	})?;

	loop {
		select! {
			recv(requests) -> pending => match pending {
				Ok(pending) => {
					trace!(message = "Answering request", kind = pending.request.kind());
					let answer = responder.respond(pending.request.clone());
					pending.respond(answer);
				}
				Err(_) => {
					let _ = done.recv();
					break;
				}
			},
			recv(done) -> _ => break,
		}
	}

	return handle.join().ok().ok_or(CliError::WorkerPanicked);
}

/// Make Ctrl-C cancel `worker`'s job at its next checkpoint.
/// A second Ctrl-C, or one while nothing runs, exits.
pub fn cancel_on_interrupt(worker: &Worker) {
	let worker = worker.clone();
	let res = ctrlc::set_handler(move || {
		if !worker.is_busy() || worker.is_cancelled() {
			exit(130);
		}
		warn!(message = "Interrupted, stopping after the current step. Press Ctrl-C again to quit.");
		worker.cancel();
	});

	if let Err(error) = res {
		warn!(message = "Could not install Ctrl-C handler", ?error);
	}
}

/// Hides a progress bar while a request is being answered
pub struct Suspended<'a> {
	pub bar: &'a ProgressBar,
	pub inner: &'a mut dyn Responder,
}

impl Responder for Suspended<'_> {
	fn respond(&mut self, request: InteractionRequest) -> InteractionResponse {
		let inner = &mut self.inner;
		return self.bar.suspend(|| inner.respond(request));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::prompt::Unattended;
	use mrs_data::ManualAdjustment;
	use mrs_engine::worker::interaction_channel;
	use mrs_pipeline::base::Interactor;
	use std::sync::atomic::Ordering;

	#[test]
	fn answers_until_done() {
		let worker = Worker::new();
		let (interactor, requests) = interaction_channel();

		let answers = drive(&worker, &requests, &mut Unattended {}, move |_| {
			[
				interactor.request(InteractionRequest::ConfirmBasisSet {
					path: "a.BASIS".into(),
				}),
				interactor.request(InteractionRequest::OfferManualAdjustment {
					current: ManualAdjustment::default(),
				}),
			]
		})
		.unwrap();

		assert_eq!(
			answers,
			[
				InteractionResponse::Yes,
				InteractionResponse::Adjustment(None)
			]
		);
		assert!(!worker.is_busy());
	}

	/// Cancels the worker whenever it is asked something
	struct Interrupts {
		worker: Worker,
	}

	impl Responder for Interrupts {
		fn respond(&mut self, request: InteractionRequest) -> InteractionResponse {
			self.worker.cancel();
			return Unattended {}.respond(request);
		}
	}

	#[test]
	fn cancel_while_answering() {
		let worker = Worker::new();
		let (interactor, requests) = interaction_channel();
		let mut responder = Interrupts {
			worker: worker.clone(),
		};

		let (before, after) = drive(&worker, &requests, &mut responder, move |cancel| {
			let before = cancel.load(Ordering::SeqCst);
			interactor.request(InteractionRequest::ConfirmBasisSet {
				path: "a.BASIS".into(),
			});
			(before, cancel.load(Ordering::SeqCst))
		})
		.unwrap();

		assert!(!before);
		assert!(after);
	}

	#[test]
	fn panicking_job() {
		let worker = Worker::new();
		let (_interactor, requests) = interaction_channel();
		let r = drive::<(), _>(&worker, &requests, &mut Unattended {}, |_| panic!("boom"));
		assert!(matches!(r, Err(CliError::WorkerPanicked)));
	}
}
