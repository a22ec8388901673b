use mrs_data::shift_frequency;
use mrs_pipeline::{
	base::{ProcessingNode, RunNodeError, StepContext, StepInput, StepOutput},
	helpers::NodeProperties,
};

/// Shift every signal by a fixed number of ppm.
/// The water reference is shifted too.
pub struct FrequencyShift {}

impl ProcessingNode for FrequencyShift {
	fn run(
		&mut self,
		_ctx: &StepContext<'_>,
		mut properties: NodeProperties,
		input: StepInput,
	) -> Result<StepOutput, RunNodeError> {
		let shift = properties.pop_float("shift")?;
		properties.err_if_not_empty()?;

		let info = &input.data.info;
		let hz = shift * info.f0;
		let dwell = info.dwell;

		let data = input.data.map_fids(|f| shift_frequency(f, hz, dwell));
		let wref = input
			.wref
			.as_deref()
			.map(|w| w.map_fids(|f| shift_frequency(f, hz, w.info.dwell)));

		return Ok(StepOutput {
			data,
			wref,
			labels: None,
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::*;
	use mrs_pipeline::base::PropertyValue;
	use std::{collections::BTreeMap, sync::Arc};

	#[test]
	fn zero_shift_is_identity() {
		let data = single(vec![fid(16, 1.0, 0.4)]);
		let props = NodeProperties::new(BTreeMap::from([(
			"shift".into(),
			PropertyValue::Float(0.0),
		)]));

		let out = FrequencyShift {}
			.run(
				&ctx(),
				props,
				StepInput {
					data: Arc::new(data.clone()),
					wref: None,
				},
			)
			.unwrap();

		for (a, b) in out.data.iter_fids().zip(data.iter_fids()) {
			for (x, y) in a.samples().iter().zip(b.samples()) {
				assert!((x - y).norm() < 1e-12);
			}
		}
	}

	#[test]
	fn shift_moves_phase() {
		let data = single(vec![fid(4, 1.0, 0.0)]);
		let props = NodeProperties::new(BTreeMap::from([(
			"shift".into(),
			PropertyValue::Float(1.0),
		)]));

		let out = FrequencyShift {}
			.run(
				&ctx(),
				props,
				StepInput {
					data: Arc::new(data),
					wref: None,
				},
			)
			.unwrap();

		// The first point never moves, later points rotate
		let s = out.data.acquisitions[0].fids()[0].samples();
		assert!(s[0].im.abs() < 1e-12);
		assert!(s[1].im.abs() > 1e-3);
	}
}
