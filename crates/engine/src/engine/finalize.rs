use mrs_pipeline::base::{InteractionRequest, InteractionResponse};
use std::sync::Arc;
use tracing::{debug, info};

use super::Engine;
use crate::{
	context::{DriveMode, RunContext},
	errors::RunError,
};

impl Engine {
	/// Offer a manual adjustment and freeze the result to fit.
	/// The history is not touched.
	pub(super) fn finalize(&mut self, ctx: &mut RunContext) -> Result<(), RunError> {
		let mut result = ctx.history.last().ok_or(RunError::NotLoaded)?;

		if !result.main.is_single_voxel() {
			debug!(message = "Not offering manual adjustment for grid data");
		} else if ctx.mode == DriveMode::Batch && self.session.skip_manual_adjustment {
			debug!(message = "Manual adjustment was declined for this session, skipping");
		} else {
			let current = ctx
				.adjustment
				.or(ctx.definition.adjustment)
				.unwrap_or_default();

			match self
				.interactor
				.request(InteractionRequest::OfferManualAdjustment { current })
			{
				InteractionResponse::Adjustment(Some(adjustment)) => {
					adjustment.validate()?;
					if !adjustment.is_identity() {
						result.main = Arc::new(adjustment.apply(&result.main));
					}
					info!(message = "Applied manual adjustment", ?adjustment);
					ctx.adjustment = Some(adjustment);
				}

				InteractionResponse::Cancel => return Err(RunError::Cancelled),

				_ => {
					debug!(message = "Manual adjustment declined");
					if ctx.mode == DriveMode::Batch {
						info!(message = "Not offering manual adjustment for the rest of this batch");
						self.session.skip_manual_adjustment = true;
					}
				}
			}
		}

		ctx.final_result = Some(result);
		return Ok(());
	}
}
