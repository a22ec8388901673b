use mrs_data::{AdjustmentError, LoadError};
use mrs_lcmodel::{control::ControlFileError, install::InstallError, runner::FitError};
use mrs_pipeline::{
	base::{NodeId, RunNodeError},
	definition::DefinitionError,
	graph::GraphError,
};
use smartstring::{LazyCompact, SmartString};
use std::path::PathBuf;
use thiserror::Error;

/// An error that ends a run
#[derive(Debug, Error)]
pub enum RunError {
	//
	// MARK: Input errors
	//
	/// No input files were given (`.coord` files do not count)
	#[error("no input files")]
	NoInputFiles,

	#[error("could not load input")]
	Load(#[from] LoadError),

	/// The input files carry no header table
	#[error("input `{path}` has no header")]
	NoHeader { path: PathBuf },

	#[error("could not determine nucleus (got `{nucleus}`)")]
	UnknownNucleus { nucleus: String },

	//
	// MARK: Graph errors
	//
	#[error("pipeline is not a serial chain")]
	Graph(#[from] GraphError),

	#[error("no node type `{node_type}`")]
	UnknownNodeType { node_type: SmartString<LazyCompact> },

	/// Multi-channel input needs a coil combination node, and none is registered
	#[error("multi-channel data but no coil combination node is registered")]
	NoCoilCombination,

	//
	// MARK: Step errors
	//
	#[error("step {step} (`{node_id}`) failed")]
	Step {
		step: usize,
		node_id: NodeId,
		#[source]
		error: RunNodeError,
	},

	/// A stage ran before loading did
	#[error("no input has been loaded")]
	NotLoaded,

	/// A snapshot was committed out of order
	#[error("snapshot {index} committed out of order")]
	HistoryOutOfOrder { index: usize },

	#[error("invalid manual adjustment")]
	BadAdjustment(#[from] AdjustmentError),

	//
	// MARK: Analysis errors
	//
	#[error("no basis set")]
	NoBasisSet,

	#[error("no control file at `{path}`")]
	NoControlFile { path: PathBuf },

	#[error("could not read control file")]
	Control(#[from] ControlFileError),

	#[error("LCModel is not available")]
	Install(#[from] InstallError),

	#[error("fitting failed")]
	Fit(#[from] FitError),

	//
	// MARK: Other
	//
	#[error("cancelled")]
	Cancelled,

	/// The run failed earlier and must be reset first
	#[error("run has already failed")]
	AlreadyFailed,

	#[error("could not write pipeline")]
	Definition(#[from] DefinitionError),

	#[error("i/o error")]
	Io(#[from] std::io::Error),
}

impl RunError {
	/// Errors that stop a batch instead of skipping one subject
	pub fn is_cancel(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

/// An error we encounter when starting background work
#[derive(Debug, Error)]
pub enum WorkerError {
	#[error("a run is already in progress")]
	AlreadyRunning,

	#[error("could not spawn worker thread")]
	Spawn(#[from] std::io::Error),
}

/// An error that ends a whole batch
#[derive(Debug, Error)]
pub enum BatchError {
	#[error("`{study}` is not a directory")]
	NotADirectory { study: PathBuf },

	#[error("no participant folders in `{study}`")]
	NoSubjects { study: PathBuf },

	#[error("pipeline is not a serial chain")]
	Graph(#[from] GraphError),

	#[error("batch cancelled")]
	Cancelled,

	#[error("i/o error")]
	Io(#[from] std::io::Error),
}
