use mrs_data::{adjust_phase, Complex, Fid};
use mrs_pipeline::{
	base::{
		InteractionRequest, InteractionResponse, ProcessingNode, PropertyError, RunNodeError,
		StepContext, StepInput, StepOutput,
	},
	helpers::NodeProperties,
};
use std::{collections::BTreeMap, f64::consts::PI, sync::Arc};
use tracing::debug;

use crate::float;

/// Zero- and first-order phase correction.
///
/// Modes:
/// - `manual`: apply `phase0` (degrees) and `phase1` (degrees per ppm)
/// - `first-point`: rotate each signal so its first point is real
/// - `ask`: like `manual`, but the user is asked for values first
pub struct PhaseCorrection {}

fn first_point(fid: &Fid) -> Fid {
	let rot = match fid.samples().first() {
		Some(x) if x.norm() > 0.0 => Complex::from_polar(1.0, -x.arg()),
		_ => return fid.clone(),
	};
	Fid::new(fid.samples().iter().map(|x| x * rot).collect())
}

impl PhaseCorrection {
	/// Ask the user for phase values, starting from the configured ones
	fn ask(
		ctx: &StepContext<'_>,
		phase0: f64,
		phase1: f64,
	) -> Result<(f64, f64), RunNodeError> {
		let fields = BTreeMap::from([
			(
				"phase0".into(),
				float(-180.0, 180.0, phase0, "Zero-order phase, degrees"),
			),
			(
				"phase1".into(),
				float(-140.0, 140.0, phase1, "First-order phase, degrees per ppm"),
			),
		]);

		let response = ctx.interactor.request(InteractionRequest::Properties {
			node: ctx.node.id.clone(),
			message: "Phase correction".into(),
			fields,
		});

		match response {
			InteractionResponse::Properties(None) => return Ok((phase0, phase1)),
			InteractionResponse::Properties(Some(values)) => {
				let mut values = NodeProperties::new(values);
				let p0 = match values.pop_float("phase0") {
					Ok(x) => x,
					Err(RunNodeError::MissingProperty { .. }) => phase0,
					Err(e) => return Err(e),
				};
				let p1 = match values.pop_float("phase1") {
					Ok(x) => x,
					Err(RunNodeError::MissingProperty { .. }) => phase1,
					Err(e) => return Err(e),
				};
				values.err_if_not_empty()?;
				return Ok((p0, p1));
			}
			_ => return Err(RunNodeError::Cancelled),
		}
	}
}

impl ProcessingNode for PhaseCorrection {
	fn run(
		&mut self,
		ctx: &StepContext<'_>,
		mut properties: NodeProperties,
		input: StepInput,
	) -> Result<StepOutput, RunNodeError> {
		let mode = properties.pop_str("mode")?;
		let phase0 = properties.pop_float("phase0")?;
		let phase1 = properties.pop_float("phase1")?;
		properties.err_if_not_empty()?;

		let (phase0, phase1) = match mode.as_str() {
			"first-point" => {
				return Ok(StepOutput::data(input.data.map_fids(first_point)));
			}
			"manual" => (phase0, phase1),
			"ask" => Self::ask(ctx, phase0, phase1)?,
			_ => {
				return Err(RunNodeError::BadProperty {
					property: "mode".into(),
					error: Arc::new(PropertyError::NotAVariant { value: mode }),
				})
			}
		};

		debug!(message = "Applying phase", node_id = %ctx.node.id, phase0, phase1);

		let info = &input.data.info;
		let zero = phase0 * PI / 180.0;
		let first = phase1 * PI / 180.0 / info.f0;
		let dwell = info.dwell;

		return Ok(StepOutput::data(
			input.data.map_fids(|f| adjust_phase(f, zero, first, dwell)),
		));
	}
}
