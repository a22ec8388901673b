use mrs_data::Dataset;
use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::{fmt::Display, sync::Arc};

use super::{Interactor, NodeId, RunNodeError};
use crate::helpers::NodeProperties;

/// What a node does, coarsely.
/// The engine looks at categories to decide on implicit steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum NodeCategory {
	/// The pipeline's data source. Only the built-in input node has this.
	Input,
	CoilCombination,
	Averaging,
	FrequencyAlignment,
	PhaseCorrection,
	Apodization,
	EddyCurrentCorrection,
	Quantification,
	Other,
}

impl Display for NodeCategory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Input => "input",
			Self::CoilCombination => "coil-combination",
			Self::Averaging => "averaging",
			Self::FrequencyAlignment => "frequency-alignment",
			Self::PhaseCorrection => "phase-correction",
			Self::Apodization => "apodization",
			Self::EddyCurrentCorrection => "eddy-current-correction",
			Self::Quantification => "quantification",
			Self::Other => "other",
		};
		write!(f, "{s}")
	}
}

/// Information about the node being run
#[derive(Debug, Clone)]
pub struct ThisNodeInfo {
	pub id: NodeId,
	pub node_type: SmartString<LazyCompact>,

	/// This node's position in the chain
	pub step: usize,
}

/// Everything a node may use besides its input
pub struct StepContext<'a> {
	pub node: ThisNodeInfo,

	/// Blocking user interaction.
	/// The engine guarantees no other node runs while a request is pending.
	pub interactor: &'a dyn Interactor,
}

/// The data a node receives
#[derive(Debug, Clone)]
pub struct StepInput {
	pub data: Arc<Dataset>,
	pub wref: Option<Arc<Dataset>>,
}

/// The data a node produces
#[derive(Debug, Clone)]
pub struct StepOutput {
	pub data: Dataset,

	/// `None` keeps the previous water reference
	pub wref: Option<Dataset>,

	/// Job labels for the fitting stage, one per acquisition
	pub labels: Option<Vec<String>>,
}

impl StepOutput {
	pub fn data(data: Dataset) -> Self {
		Self {
			data,
			wref: None,
			labels: None,
		}
	}
}

/// A processing step.
///
/// Nodes are black boxes to the engine: they take one dataset
/// (and maybe a water reference) and return a new one.
pub trait ProcessingNode: Send {
	fn run(
		&mut self,
		ctx: &StepContext<'_>,
		properties: NodeProperties,
		input: StepInput,
	) -> Result<StepOutput, RunNodeError>;
}
