use mrs_data::ManualAdjustment;
use mrs_lcmodel::orchestrator::FitReport;
use mrs_pipeline::{definition::PipelineDefinition, graph::ChainNode, graph::PipelineGraph};
use std::{path::PathBuf, sync::Arc};

use crate::{
	errors::RunError,
	history::{Snapshot, SnapshotHistory},
};

/// How the engine is being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
	/// One tick per external trigger
	Manual,

	/// Tick until done, failed or cancelled
	Continuous,

	/// Continuous, once per subject
	Batch,
}

/// Where the engine is in a run.
///
/// | state         | a tick does                                   | next state                   |
/// |---------------|-----------------------------------------------|------------------------------|
/// | `Idle`        | nothing                                       | `Loading`                    |
/// | `Loading`     | load inputs, commit snapshot 0                | `Stepping(0)` or `Finalizing`|
/// | `Stepping(i)` | run chain node `i`, commit snapshot `i + 1`   | `Stepping(i+1)` or `Finalizing` |
/// | `Finalizing`  | offer manual adjustment, freeze the result    | `Analyzing`                  |
/// | `Analyzing`   | fit every voxel, write results                | `Complete`                   |
/// | `Complete`    | nothing                                       | `Complete`                   |
/// | `Failed`      | nothing                                       | `Failed`                     |
///
/// Any failing tick moves to `Failed`.
/// In continuous and batch mode the cancel flag is checked before every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
	Idle,
	Loading,
	Stepping(usize),
	Finalizing,
	Analyzing,
	Complete,
	Failed,
}

impl EngineState {
	/// Will ticking this state do anything?
	pub fn is_done(&self) -> bool {
		matches!(self, Self::Complete | Self::Failed)
	}

	/// A stage name for logs
	pub fn name(&self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Loading => "loading",
			Self::Stepping(_) => "stepping",
			Self::Finalizing => "finalizing",
			Self::Analyzing => "analyzing",
			Self::Complete => "complete",
			Self::Failed => "failed",
		}
	}
}

/// The files a run reads
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
	/// Metabolite data files. All are loaded into one dataset.
	pub files: Vec<PathBuf>,

	/// Water reference files. Only the first is used.
	pub water: Vec<PathBuf>,

	/// White matter, grey matter and csf segmentation images
	pub segmentation: Vec<PathBuf>,

	/// A user basis set. If unset, a default is looked up.
	pub basis: Option<PathBuf>,

	/// A user control file. If unset, the default is used.
	pub control: Option<PathBuf>,

	/// Write results here instead of a new timestamped folder
	pub output_dir: Option<PathBuf>,
}

/// Everything one run knows.
///
/// The engine itself holds no run state; it reads and writes this.
#[derive(Debug)]
pub struct RunContext {
	pub inputs: RunInputs,
	pub mode: DriveMode,

	pub(crate) state: EngineState,
	pub(crate) chain: Vec<ChainNode>,
	pub(crate) definition: PipelineDefinition,
	pub(crate) history: Arc<SnapshotHistory>,

	/// The result that is fitted.
	/// This is the last snapshot, with any manual adjustment applied.
	pub(crate) final_result: Option<Snapshot>,
	pub(crate) adjustment: Option<ManualAdjustment>,
	pub(crate) output_dir: Option<PathBuf>,
	pub(crate) report: Option<FitReport>,
}

impl RunContext {
	/// Prepare a run of `graph`.
	/// Fails if the graph is not a serial chain.
	pub fn new(graph: &PipelineGraph, inputs: RunInputs, mode: DriveMode) -> Result<Self, RunError> {
		let chain = graph.linearize()?;
		return Ok(Self::from_chain(
			chain,
			graph.serialize(None),
			inputs,
			mode,
		));
	}

	pub fn from_chain(
		chain: Vec<ChainNode>,
		definition: PipelineDefinition,
		inputs: RunInputs,
		mode: DriveMode,
	) -> Self {
		Self {
			inputs,
			mode,
			state: EngineState::Idle,
			chain,
			definition,
			history: Arc::new(SnapshotHistory::new()),
			final_result: None,
			adjustment: None,
			output_dir: None,
			report: None,
		}
	}

	/// Forget everything this run produced.
	/// The pipeline and inputs are kept.
	pub fn reset(&mut self) {
		self.state = EngineState::Idle;
		self.history.clear();
		self.final_result = None;
		self.adjustment = None;
		self.output_dir = None;
		self.report = None;
	}

	/// Go back to the state right after step `step` committed its snapshot,
	/// so that the following steps run again.
	/// Returns `false` if that snapshot does not exist.
	pub fn rollback(&mut self, step: usize) -> bool {
		if step >= self.history.len() {
			return false;
		}

		self.history.truncate(step + 1);
		self.final_result = None;
		self.report = None;
		self.state = if step == self.chain.len() {
			EngineState::Finalizing
		} else {
			EngineState::Stepping(step)
		};
		return true;
	}

	pub fn state(&self) -> EngineState {
		self.state
	}

	/// The index of the next chain node to run
	pub fn step(&self) -> usize {
		match self.state {
			EngineState::Idle | EngineState::Loading => 0,
			EngineState::Stepping(i) => i,
			_ => self.chain.len(),
		}
	}

	pub fn chain(&self) -> &[ChainNode] {
		&self.chain
	}

	/// A handle to this run's history that stays valid across threads
	pub fn history(&self) -> Arc<SnapshotHistory> {
		self.history.clone()
	}

	pub fn final_result(&self) -> Option<&Snapshot> {
		self.final_result.as_ref()
	}

	pub fn adjustment(&self) -> Option<&ManualAdjustment> {
		self.adjustment.as_ref()
	}

	pub fn output_dir(&self) -> Option<&PathBuf> {
		self.output_dir.as_ref()
	}

	pub fn report(&self) -> Option<&FitReport> {
		self.report.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::{info, svs};
	use mrs_data::HeaderTable;

	fn fresh() -> RunContext {
		RunContext::from_chain(
			Vec::new(),
			PipelineDefinition::default(),
			RunInputs::default(),
			DriveMode::Manual,
		)
	}

	fn assert_fresh(ctx: &RunContext) {
		assert_eq!(ctx.state(), EngineState::Idle);
		assert_eq!(ctx.step(), 0);
		assert!(ctx.history().is_empty());
		assert!(ctx.final_result().is_none());
		assert!(ctx.adjustment().is_none());
		assert!(ctx.output_dir().is_none());
		assert!(ctx.report().is_none());
	}

	#[test]
	fn reset_is_idempotent() {
		let mut ctx = fresh();
		let snapshot = Snapshot {
			main: Arc::new(svs(info(), 1, 1.0)),
			water: None,
			header: Arc::new(HeaderTable::new()),
			labels: None,
		};
		assert!(ctx.history.commit(0, snapshot.clone()));
		ctx.final_result = Some(snapshot);
		ctx.adjustment = Some(ManualAdjustment::default());
		ctx.output_dir = Some("out".into());
		ctx.state = EngineState::Analyzing;

		ctx.reset();
		assert_fresh(&ctx);
		ctx.reset();
		assert_fresh(&ctx);
	}

	#[test]
	fn rollback() {
		let mut ctx = fresh();
		assert!(!ctx.rollback(0));

		let snapshot = Snapshot {
			main: Arc::new(svs(info(), 1, 1.0)),
			water: None,
			header: Arc::new(HeaderTable::new()),
			labels: None,
		};
		assert!(ctx.history.commit(0, snapshot));
		ctx.state = EngineState::Complete;

		// Empty chain: snapshot 0 is the last one
		assert!(ctx.rollback(0));
		assert_eq!(ctx.state(), EngineState::Finalizing);
		assert_eq!(ctx.history().len(), 1);
	}
}
