use mrs_data::{AcquisitionInfo, Nucleus};
use mrs_lcmodel::{
	control::ControlParams,
	install::ensure_binary,
	orchestrator::{enumerate_jobs, FitSettings, Orchestrator},
	runner::{FitRunner, LcmodelProcess},
	summary::{write_maps, write_results_csv, MapOptions},
};
use mrs_pipeline::base::{InteractionRequest, InteractionResponse, NodeCategory};
use mrs_segment::{SegmentationFiles, SegmentationHelper};
use std::{
	path::{Path, PathBuf},
	sync::Arc,
};
use tracing::{debug, info, warn};

use super::Engine;
use crate::{
	context::RunContext,
	errors::RunError,
	output::{ADJUSTMENT_FILE, LCMODEL_DIR, MAPS_DIR, PIPELINE_FILE, RESULTS_FILE, WORK_DIR},
};

/// The name of the default basis set for this acquisition,
/// like `3T_PRESS_TE30ms.BASIS` or `3T_PRESS_31P_TE30ms.BASIS`.
///
/// `None` if the field strength or sequence is unknown.
pub fn basis_file_name(info: &AcquisitionInfo) -> Option<String> {
	let tesla = info.nucleus.field_strength(info.f0)?;
	let sequence = info.sequence?;
	let nucleus = if info.nucleus.is_proton() {
		String::new()
	} else {
		format!("_{}", info.nucleus)
	};

	return Some(format!(
		"{tesla}T_{}{nucleus}_TE{}ms.BASIS",
		sequence.name(),
		info.te
	));
}

fn default_control_name(nucleus: &Nucleus) -> String {
	if nucleus.is_proton() {
		"default.CONTROL".into()
	} else {
		format!("{nucleus}_default.CONTROL")
	}
}

impl Engine {
	/// Fit the frozen result and write the result summary
	pub(super) fn analyze(&self, ctx: &mut RunContext) -> Result<(), RunError> {
		let result = ctx.final_result.clone().ok_or(RunError::NotLoaded)?;
		let output = ctx.output_dir.clone().ok_or(RunError::NotLoaded)?;
		let info = result.main.info.clone();

		let gamma = info
			.nucleus
			.larmor()
			.ok_or_else(|| RunError::UnknownNucleus {
				nucleus: info.nucleus.to_string(),
			})?;
		info!(
			message = "Analyzing",
			nucleus = %info.nucleus,
			gamma,
			field = ?info.nucleus.field_strength(info.f0)
		);

		let water = if info.nucleus.is_proton() {
			result.water.as_ref().and_then(|w| w.mean_fid())
		} else {
			if result.water.is_some() {
				debug!(message = "Ignoring water reference for non-proton data");
			}
			None
		};

		// LCModel does its own eddy current correction and water scaling
		// unless the chain already corrected eddy currents.
		let has_ecc = ctx
			.chain
			.iter()
			.any(|n| n.category == NodeCategory::EddyCurrentCorrection);
		let dows = water.is_some() && !has_ecc;

		let basis = self.resolve_basis(ctx, &info)?;
		let control = self.resolve_control(ctx, &info.nucleus, dows)?;

		let work = output.join(WORK_DIR);
		let wconc = if water.is_some() {
			self.water_concentration(ctx, &info, &work.join("segmentation"))
		} else {
			None
		};

		let runner: Arc<dyn FitRunner> = match &self.runner {
			Some(x) => x.clone(),
			None => {
				let binary = ensure_binary(&self.settings.lcmodel_dir)?;
				Arc::new(LcmodelProcess::new(binary, self.settings.fit_timeout))
			}
		};

		let jobs = enumerate_jobs(&result.main, result.labels.as_deref());
		if jobs.is_empty() {
			warn!(message = "Nothing to fit", output = ?output);
		}

		let settings = FitSettings {
			info: info.clone(),
			sequence: info.sequence.map(|s| s.name().to_owned()),
			basis,
			control,
			water,
			dows,
			wconc,
		};

		let report =
			Orchestrator::new(&*runner, work, output.join(LCMODEL_DIR)).run(&jobs, &settings)?;

		if !report.completed.is_empty() {
			write_results_csv(&output.join(RESULTS_FILE), &report.completed)?;

			let options = MapOptions {
				max_crlb: self.settings.map_max_crlb,
				..Default::default()
			};
			let maps = write_maps(&output.join(MAPS_DIR), &report.completed, &options)?;
			if !maps.is_empty() {
				info!(message = "Wrote concentration maps", count = maps.len(), output = ?output);
			}
		}

		for failure in &report.failed {
			warn!(
				message = "Voxel was not fitted",
				label = failure.label.as_str(),
				error = %failure.error,
				output = ?output
			);
		}

		ctx.report = Some(report);
		return Ok(());
	}

	/// Write the pipeline and adjustment used for this run
	pub(super) fn complete(&self, ctx: &mut RunContext) -> Result<(), RunError> {
		let output = ctx.output_dir.as_ref().ok_or(RunError::NotLoaded)?;

		let mut definition = ctx.definition.clone();
		definition.adjustment = ctx.adjustment;
		definition.write(&output.join(PIPELINE_FILE))?;

		if let Some(adjustment) = &ctx.adjustment {
			std::fs::write(output.join(ADJUSTMENT_FILE), adjustment.report())?;
		}

		info!(
			message = "Run complete",
			output = ?output,
			fitted = ctx.report.as_ref().map(|r| r.completed.len()).unwrap_or(0),
			failed = ctx.report.as_ref().map(|r| r.failed.len()).unwrap_or(0),
		);
		return Ok(());
	}

	/// The user's basis set, a confirmed default, or one the user picks
	fn resolve_basis(&self, ctx: &RunContext, info: &AcquisitionInfo) -> Result<PathBuf, RunError> {
		if let Some(basis) = &ctx.inputs.basis {
			if basis.is_file() {
				info!(message = "Using user basis set", ?basis);
				return Ok(basis.clone());
			}
			warn!(message = "User basis set does not exist", ?basis);
		}

		let default = basis_file_name(info)
			.map(|x| self.settings.lcmodel_dir.join("basis").join(x))
			.filter(|x| x.is_file());

		let reason = match default {
			Some(path) => {
				match self
					.interactor
					.request(InteractionRequest::ConfirmBasisSet { path: path.clone() })
				{
					InteractionResponse::Yes => {
						info!(message = "Using default basis set", basis = ?path);
						return Ok(path);
					}
					InteractionResponse::Cancel => return Err(RunError::Cancelled),
					_ => "Default basis set rejected".to_owned(),
				}
			}

			None => {
				warn!(
					message = "No default basis set",
					expected = ?basis_file_name(info),
					sequence = ?info.sequence,
				);
				format!(
					"No basis set found for {} {} TE {} ms",
					info.nucleus,
					info.sequence.map(|s| s.name()).unwrap_or("unknown sequence"),
					info.te
				)
			}
		};

		match self
			.interactor
			.request(InteractionRequest::SelectBasisSet { reason })
		{
			InteractionResponse::Path(Some(path)) if path.is_file() => {
				info!(message = "Using selected basis set", basis = ?path);
				return Ok(path);
			}
			InteractionResponse::Cancel => return Err(RunError::Cancelled),
			_ => return Err(RunError::NoBasisSet),
		}
	}

	/// The user's control file, or the default one for this nucleus
	fn resolve_control(
		&self,
		ctx: &RunContext,
		nucleus: &Nucleus,
		doecc: bool,
	) -> Result<ControlParams, RunError> {
		if let Some(control) = &ctx.inputs.control {
			if control.is_file() {
				info!(message = "Using user control file", ?control);
				return Ok(ControlParams::read(control)?);
			}
			warn!(message = "User control file does not exist", ?control);
		}

		let path = self
			.settings
			.lcmodel_dir
			.join(default_control_name(nucleus));
		if !path.is_file() {
			return Err(RunError::NoControlFile { path });
		}

		let mut control = ControlParams::read(&path)?;
		control.insert("DOECC", doecc);
		debug!(message = "Using default control file", ?path, doecc);
		return Ok(control);
	}

	/// Water concentration from the run's segmentation images, if any
	fn water_concentration(
		&self,
		ctx: &RunContext,
		info: &AcquisitionInfo,
		workdir: &Path,
	) -> Option<f64> {
		if ctx.inputs.segmentation.is_empty() {
			return None;
		}

		let files = match SegmentationFiles::from_paths(&ctx.inputs.segmentation) {
			Some(x) => x,
			None => {
				warn!(
					message = "Segmentation needs wm, gm and csf files, ignoring it",
					files = ?ctx.inputs.segmentation
				);
				return None;
			}
		};

		let helper = SegmentationHelper::new(self.settings.seghelper.clone());
		return helper.water_concentration(workdir, &files, info.centre(), info.transform);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::info;
	use mrs_data::Sequence;

	#[test]
	fn basis_names() {
		let mut i = info();
		assert_eq!(basis_file_name(&i), None);

		i.sequence = Some(Sequence::Press);
		assert_eq!(
			basis_file_name(&i).as_deref(),
			Some("3T_PRESS_TE30ms.BASIS")
		);

		i.te = 30.5;
		i.sequence = Some(Sequence::Steam);
		assert_eq!(
			basis_file_name(&i).as_deref(),
			Some("3T_STEAM_TE30.5ms.BASIS")
		);

		i.te = 30.0;
		i.sequence = Some(Sequence::Press);
		i.nucleus = Nucleus::new("31P");
		i.f0 = 49.9;
		assert_eq!(
			basis_file_name(&i).as_deref(),
			Some("3T_PRESS_31P_TE30ms.BASIS")
		);
	}

	#[test]
	fn control_names() {
		assert_eq!(default_control_name(&Nucleus::proton()), "default.CONTROL");
		assert_eq!(
			default_control_name(&Nucleus::new("31P")),
			"31P_default.CONTROL"
		);
	}
}
