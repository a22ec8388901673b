use mrs_data::{Acquisition, Complex, Dataset, Fid};
use mrs_pipeline::{
	base::{ProcessingNode, RunNodeError, StepContext, StepInput, StepOutput},
	helpers::NodeProperties,
};
use tracing::debug;

pub struct CoilCombination {}

/// Phase-align and sum `channels`.
/// Phases and weights come from the first point of each `reference` channel.
fn combine(channels: &[Fid], reference: &[Fid], equal: bool) -> Fid {
	let n = channels.iter().map(|c| c.len()).min().unwrap_or(0);
	let mut out = vec![Complex::new(0.0, 0.0); n];
	let mut total = 0.0;

	for (c, r) in channels.iter().zip(reference.iter()) {
		let first = r.samples().first().copied().unwrap_or(Complex::new(1.0, 0.0));
		let mag = first.norm();
		if mag == 0.0 {
			continue;
		}

		let w = if equal { 1.0 } else { mag };
		let rot = first.conj() / mag * w;
		for (o, x) in out.iter_mut().zip(c.samples()) {
			*o += x * rot;
		}
		total += w;
	}

	if total > 0.0 {
		for o in out.iter_mut() {
			*o /= total;
		}
	}

	return Fid::new(out);
}

fn combine_dataset(data: &Dataset, reference: Option<&Dataset>, equal: bool) -> Dataset {
	// Water channels are a better phase reference, if they line up
	let water_channels = reference.and_then(|r| match r.acquisitions.first() {
		Some(Acquisition::SingleVoxel { channels }) => Some(channels),
		_ => None,
	});

	let acquisitions = data
		.acquisitions
		.iter()
		.map(|a| match a {
			Acquisition::SingleVoxel { channels } if channels.len() > 1 => {
				let reference = match water_channels {
					Some(w) if w.len() == channels.len() => w.as_slice(),
					_ => channels.as_slice(),
				};
				Acquisition::single(combine(channels, reference, equal))
			}
			other => other.clone(),
		})
		.collect();

	return data.with_acquisitions(acquisitions);
}

// Inputs:
// - "in", metabolite data with one or more channels
// Outputs:
// - "out", one channel per acquisition
impl ProcessingNode for CoilCombination {
	fn run(
		&mut self,
		ctx: &StepContext<'_>,
		mut properties: NodeProperties,
		input: StepInput,
	) -> Result<StepOutput, RunNodeError> {
		let weighting = properties.pop_str("weighting")?;
		properties.err_if_not_empty()?;

		let equal = match weighting.as_str() {
			"signal" => false,
			"equal" => true,
			_ => {
				return Err(RunNodeError::BadPropertyType {
					property: "weighting".into(),
				})
			}
		};

		let wref = input.wref.as_deref();
		debug!(
			message = "Combining channels",
			node_id = %ctx.node.id,
			water_reference = wref.is_some(),
			equal
		);

		let data = combine_dataset(&input.data, wref, equal);
		let wref = wref
			.filter(|w| w.is_multichannel())
			.map(|w| combine_dataset(w, Some(w), equal));

		return Ok(StepOutput {
			data,
			wref,
			labels: None,
		});
	}
}
