use mrs_data::{Acquisition, Fid};
use mrs_pipeline::{
	base::{ProcessingNode, RunNodeError, StepContext, StepInput, StepOutput},
	helpers::NodeProperties,
};

pub struct Average {}

impl ProcessingNode for Average {
	fn run(
		&mut self,
		_ctx: &StepContext<'_>,
		properties: NodeProperties,
		input: StepInput,
	) -> Result<StepOutput, RunNodeError> {
		properties.err_if_not_empty()?;

		let mut per_channel: Vec<Vec<&Fid>> = Vec::new();
		for a in &input.data.acquisitions {
			let channels = match a {
				Acquisition::SingleVoxel { channels } => channels,
				Acquisition::Grid { .. } => {
					return Err(RunNodeError::BadInput {
						message: "cannot average spectroscopic imaging data".into(),
					})
				}
			};

			if per_channel.is_empty() {
				per_channel = vec![Vec::new(); channels.len()];
			} else if per_channel.len() != channels.len() {
				return Err(RunNodeError::BadInput {
					message: "transients have different channel counts".into(),
				});
			}

			for (acc, c) in per_channel.iter_mut().zip(channels) {
				acc.push(c);
			}
		}

		let channels = per_channel
			.into_iter()
			.map(|c| {
				Fid::mean(c).ok_or_else(|| RunNodeError::BadInput {
					message: "transients have different lengths".into(),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		let data = input
			.data
			.with_acquisitions(vec![Acquisition::SingleVoxel { channels }]);
		return Ok(StepOutput::data(data));
	}
}
