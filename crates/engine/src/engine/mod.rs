//! The step execution engine.
//!
//! An [`Engine`] moves a [`RunContext`] through its states one tick at a time.
//! See [`EngineState`] for the transition table.

use mrs_data::LoaderSet;
use mrs_lcmodel::runner::FitRunner;
use mrs_pipeline::base::{Interactor, NodeRegistry};
use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};
use tracing::{debug, error, info};

use crate::{
	context::{EngineState, RunContext},
	errors::RunError,
	settings::{EngineSettings, SessionPreferences},
};

mod analyze;
mod finalize;
mod load;
mod step;

pub use analyze::basis_file_name;

pub struct Engine {
	registry: Arc<NodeRegistry>,
	loaders: Arc<LoaderSet>,
	settings: EngineSettings,
	interactor: Arc<dyn Interactor>,

	/// Used instead of the LCModel binary if set
	runner: Option<Arc<dyn FitRunner>>,

	session: SessionPreferences,
}

impl Engine {
	pub fn new(
		registry: Arc<NodeRegistry>,
		loaders: Arc<LoaderSet>,
		settings: EngineSettings,
		interactor: Arc<dyn Interactor>,
	) -> Self {
		Self {
			registry,
			loaders,
			settings,
			interactor,
			runner: None,
			session: SessionPreferences::default(),
		}
	}

	/// Fit with `runner` instead of the LCModel binary
	pub fn with_runner(mut self, runner: Arc<dyn FitRunner>) -> Self {
		self.runner = Some(runner);
		self
	}

	pub fn settings(&self) -> &EngineSettings {
		&self.settings
	}

	pub fn session(&self) -> &SessionPreferences {
		&self.session
	}

	pub fn registry(&self) -> &Arc<NodeRegistry> {
		&self.registry
	}

	pub fn loaders(&self) -> &Arc<LoaderSet> {
		&self.loaders
	}

	/// The state that follows a committed snapshot `i`
	fn after_snapshot(ctx: &RunContext, i: usize) -> EngineState {
		if i < ctx.chain.len() {
			EngineState::Stepping(i)
		} else {
			EngineState::Finalizing
		}
	}

	/// Do the work of `ctx`'s current state and move to the next one.
	/// On error, `ctx` is left in [`EngineState::Failed`];
	/// snapshots committed so far stay valid.
	pub fn tick(&mut self, ctx: &mut RunContext) -> Result<EngineState, RunError> {
		let state = ctx.state;

		let res = match state {
			EngineState::Idle => Ok(EngineState::Loading),
			EngineState::Loading => self
				.load(ctx)
				.map(|()| Self::after_snapshot(ctx, 0)),
			EngineState::Stepping(i) => self
				.step(ctx, i)
				.map(|()| Self::after_snapshot(ctx, i + 1)),
			EngineState::Finalizing => self.finalize(ctx).map(|()| EngineState::Analyzing),
			EngineState::Analyzing => self
				.analyze(ctx)
				.and_then(|()| self.complete(ctx))
				.map(|()| EngineState::Complete),
			EngineState::Complete | EngineState::Failed => Ok(state),
		};

		match res {
			Ok(next) => {
				if next != state {
					debug!(message = "Engine transition", from = ?state, to = ?next);
				}
				ctx.state = next;
				return Ok(next);
			}

			Err(error) => {
				error!(
					message = "Run failed",
					stage = state.name(),
					step = ctx.step(),
					output = ?ctx.output_dir,
					?error
				);
				ctx.state = EngineState::Failed;
				return Err(error);
			}
		}
	}

	/// Tick until the run completes or fails.
	///
	/// `cancel` is checked before every tick. A running step is never
	/// interrupted; cancellation takes effect once it returns.
	pub fn run_continuous(
		&mut self,
		ctx: &mut RunContext,
		cancel: &AtomicBool,
	) -> Result<(), RunError> {
		while !ctx.state.is_done() {
			if cancel.load(Ordering::SeqCst) {
				info!(
					message = "Run cancelled",
					stage = ctx.state.name(),
					step = ctx.step()
				);
				return Err(RunError::Cancelled);
			}
			self.tick(ctx)?;
		}

		if ctx.state == EngineState::Failed {
			return Err(RunError::AlreadyFailed);
		}

		return Ok(());
	}
}
