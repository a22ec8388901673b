use mrs_pipeline::{
	base::{StepContext, StepInput, ThisNodeInfo},
	helpers::NodeProperties,
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, warn};

use super::Engine;
use crate::{context::RunContext, errors::RunError, history::Snapshot, output::export_step};

impl Engine {
	/// Run chain node `i` on snapshot `i` and commit snapshot `i + 1`
	pub(super) fn step(&self, ctx: &mut RunContext, i: usize) -> Result<(), RunError> {
		let node = ctx
			.chain
			.get(i)
			.ok_or(RunError::HistoryOutOfOrder { index: i + 1 })?;
		let current = ctx.history.get(i).ok_or(RunError::NotLoaded)?;

		let mut instance =
			self.registry
				.init_node(&node.node_type)
				.ok_or_else(|| RunError::UnknownNodeType {
					node_type: node.node_type.clone(),
				})?;

		let step_ctx = StepContext {
			node: ThisNodeInfo {
				id: node.id.clone(),
				node_type: node.node_type.clone(),
				step: i,
			},
			interactor: &*self.interactor,
		};

		info!(
			message = "Running step",
			step = i,
			node_id = %node.id,
			node_type = node.node_type.as_str()
		);
		let start = Instant::now();

		let out = instance
			.run(
				&step_ctx,
				NodeProperties::from(node.properties.clone()),
				StepInput {
					data: current.main.clone(),
					wref: current.water.clone(),
				},
			)
			.map_err(|error| RunError::Step {
				step: i,
				node_id: node.id.clone(),
				error,
			})?;

		debug!(message = "Step finished", step = i, elapsed = ?start.elapsed());

		let snapshot = Snapshot {
			main: Arc::new(out.data),
			water: out.wref.map(Arc::new).or(current.water),
			header: current.header,
			labels: out.labels.or(current.labels),
		};

		if self.settings.save_step_data {
			if let Some(dir) = &ctx.output_dir {
				if let Err(error) = export_step(dir, i + 1, &node.node_type, &snapshot) {
					warn!(message = "Could not export step data", step = i, ?error);
				}
			}
		}

		if !ctx.history.commit(i + 1, snapshot) {
			return Err(RunError::HistoryOutOfOrder { index: i + 1 });
		}

		return Ok(());
	}
}
