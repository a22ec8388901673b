use mrs_data::{Complex, Fid};
use mrs_pipeline::{
	base::{ProcessingNode, RunNodeError, StepContext, StepInput, StepOutput},
	helpers::NodeProperties,
};
use tracing::debug;

/// Remove the time-dependent phase of the water reference from every signal
pub struct EddyCurrentCorrection {}

fn correct(fid: &Fid, water: &Fid) -> Fid {
	Fid::new(
		fid.samples()
			.iter()
			.zip(water.samples())
			.map(|(x, w)| x * Complex::from_polar(1.0, -w.arg()))
			.collect(),
	)
}

impl ProcessingNode for EddyCurrentCorrection {
	fn run(
		&mut self,
		ctx: &StepContext<'_>,
		properties: NodeProperties,
		input: StepInput,
	) -> Result<StepOutput, RunNodeError> {
		properties.err_if_not_empty()?;

		let wref = input
			.wref
			.as_deref()
			.ok_or_else(|| RunNodeError::MissingWaterReference {
				node_id: ctx.node.id.clone(),
			})?;

		let water = wref.mean_fid().ok_or_else(|| RunNodeError::BadInput {
			message: "water reference has no usable signal".into(),
		})?;

		if input.data.iter_fids().any(|f| f.len() != water.len()) {
			return Err(RunNodeError::BadInput {
				message: "water reference length does not match data".into(),
			});
		}

		debug!(message = "Correcting eddy currents", node_id = %ctx.node.id, points = water.len());
		return Ok(StepOutput::data(
			input.data.map_fids(|f| correct(f, &water)),
		));
	}
}
