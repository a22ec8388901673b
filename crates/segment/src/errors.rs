use std::path::PathBuf;
use thiserror::Error;

use crate::nifti::NiftiError;

#[derive(Debug, Error)]
pub enum SegmentationError {
	//
	// MARK: Errors in input
	//
	#[error("segmentation file `{path}` does not exist")]
	MissingFile { path: PathBuf },

	#[error("dataset has no voxel position or transform")]
	NoVoxelGeometry,

	#[error("could not read segmentation image `{path}`")]
	BadImage {
		path: PathBuf,
		#[source]
		error: NiftiError,
	},

	//
	// MARK: Errors at the process boundary
	//
	#[error("i/o error")]
	Io(#[from] std::io::Error),

	#[error("could not encode or decode transfer file")]
	Json(#[from] serde_json::Error),

	#[error("could not start segmentation helper `{program}`")]
	Spawn {
		program: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("segmentation helper exited with {status}: {output}")]
	HelperFailed { status: String, output: String },

	#[error("segmentation helper did not write `{path}`")]
	NoResult { path: PathBuf },
}
