use mrs_data::{Complex, Fid};
use mrs_pipeline::{
	base::{ProcessingNode, RunNodeError, StepContext, StepInput, StepOutput},
	helpers::NodeProperties,
};
use std::f64::consts::PI;

/// Exponential line broadening
pub struct LineBroadening {}

fn broaden(fid: &Fid, lb: f64, dwell: f64) -> Fid {
	Fid::new(
		fid.samples()
			.iter()
			.enumerate()
			.map(|(n, x)| x * (-PI * lb * n as f64 * dwell).exp())
			.collect::<Vec<Complex>>(),
	)
}

impl ProcessingNode for LineBroadening {
	fn run(
		&mut self,
		_ctx: &StepContext<'_>,
		mut properties: NodeProperties,
		input: StepInput,
	) -> Result<StepOutput, RunNodeError> {
		let lb = properties.pop_float("lb")?;
		properties.err_if_not_empty()?;

		let dwell = input.data.info.dwell;
		return Ok(StepOutput::data(
			input.data.map_fids(|f| broaden(f, lb, dwell)),
		));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::*;

	#[test]
	fn decays() {
		let f = fid(8, 1.0, 0.0);
		let out = broaden(&f, 5.0, 0.01);

		assert_eq!(out.samples()[0], f.samples()[0]);
		let expected = f.samples()[7].re * (-PI * 5.0 * 0.07f64).exp();
		assert!((out.samples()[7].re - expected).abs() < 1e-12);
	}

	#[test]
	fn zero_is_identity() {
		let f = fid(8, 2.0, 1.0);
		assert_eq!(broaden(&f, 0.0, 0.01), f);
	}
}
