use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
	fs::File,
	io::{BufReader, BufWriter, Write},
	path::{Path, PathBuf},
};

use crate::SegmentationError;

/// One segmentation image per tissue class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentationFiles {
	pub wm: PathBuf,
	pub gm: PathBuf,
	pub csf: PathBuf,
}

impl SegmentationFiles {
	/// Pick segmentation files by name.
	/// A file is white matter if its name contains `wm`, grey matter
	/// if it contains `gm`, csf if it contains `csf` (case-insensitive,
	/// checked in that order). Returns `None` unless all three are found.
	pub fn from_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Option<Self> {
		let mut wm = None;
		let mut gm = None;
		let mut csf = None;

		for p in paths {
			let p = p.as_ref();
			let name = match p.file_name().and_then(|x| x.to_str()) {
				Some(x) => x.to_lowercase(),
				None => continue,
			};

			if name.contains("wm") {
				wm = Some(p.to_owned());
			} else if name.contains("gm") {
				gm = Some(p.to_owned());
			} else if name.contains("csf") {
				csf = Some(p.to_owned());
			}
		}

		return Some(Self {
			wm: wm?,
			gm: gm?,
			csf: csf?,
		});
	}

	pub fn iter(&self) -> impl Iterator<Item = &Path> {
		[self.wm.as_path(), self.gm.as_path(), self.csf.as_path()].into_iter()
	}
}

/// What the helper process is asked to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentationRequest {
	pub files: SegmentationFiles,

	/// Voxel centre in scanner coordinates (LPS, mm)
	pub centre: [f64; 3],

	/// The voxel's 4x4 transform. Column norms give its edge lengths.
	pub transform: [[f64; 4]; 4],

	/// Where the helper writes its [`TissueSums`]
	pub result: PathBuf,
}

/// Summed segmentation intensities inside the voxel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TissueSums {
	pub wm: f64,
	pub gm: f64,
	pub csf: f64,
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SegmentationError> {
	let mut f = BufWriter::new(File::create(path)?);
	serde_json::to_writer_pretty(&mut f, value)?;
	f.flush()?;
	return Ok(());
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SegmentationError> {
	let f = BufReader::new(File::open(path)?);
	return Ok(serde_json::from_reader(f)?);
}
