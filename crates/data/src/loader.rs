use serde::Deserialize;
use std::{
	collections::BTreeMap,
	fs::File,
	io::BufReader,
	path::{Path, PathBuf},
	sync::Arc,
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{Acquisition, AcquisitionInfo, Dataset, HeaderTable};

/// Every extension a subject folder may contain.
/// `coord` files are fitting results and are never loaded as input.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
	"ima", "dcm", "dat", "sdat", "rda", "coord", "nii", "nii.gz", "json",
];

/// An error we encounter while loading a dataset file
#[derive(Debug, Error)]
pub enum LoadError {
	#[error("i/o error while reading `{path}`")]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("could not parse `{path}`: {message}")]
	Parse { path: PathBuf, message: String },

	#[error("no loader is registered for `{path}`")]
	NoLoader { path: PathBuf },

	#[error("file `{path}` contains no signal data")]
	NoData { path: PathBuf },
}

/// A dataset and its raw header, as read from one file
#[derive(Debug, Clone)]
pub struct LoadedFile {
	pub data: Dataset,

	/// `None` if this file format carries no header
	pub header: Option<HeaderTable>,
}

/// Reads one file format.
///
/// Vendor formats (Siemens, Philips, GE, Bruker) live outside this workspace
/// and plug in through this trait.
pub trait DatasetLoader: Send + Sync {
	/// Read the file at `path`
	fn load(&self, path: &Path) -> Result<LoadedFile, LoadError>;
}

/// The lowercased extension of `path`, handling `.nii.gz`
pub fn file_extension(path: &Path) -> Option<String> {
	let name = path.file_name()?.to_str()?.to_lowercase();
	if name.ends_with(".nii.gz") {
		return Some("nii.gz".into());
	}
	return path.extension()?.to_str().map(|x| x.to_lowercase());
}

/// Picks a [`DatasetLoader`] by file extension
pub struct LoaderSet {
	loaders: BTreeMap<String, Arc<dyn DatasetLoader>>,
}

impl LoaderSet {
	/// A loader set that knows only the built-in json format
	pub fn new() -> Self {
		let mut s = Self {
			loaders: BTreeMap::new(),
		};
		s.register("json", Arc::new(JsonDatasetLoader {}));
		return s;
	}

	/// Use `loader` for files with extension `ext`, replacing any previous loader.
	pub fn register(&mut self, ext: &str, loader: Arc<dyn DatasetLoader>) {
		self.loaders.insert(ext.to_lowercase(), loader);
	}

	pub fn supports(&self, path: &Path) -> bool {
		file_extension(path).is_some_and(|e| self.loaders.contains_key(&e))
	}

	pub fn load(&self, path: &Path) -> Result<LoadedFile, LoadError> {
		let loader = file_extension(path)
			.and_then(|e| self.loaders.get(&e))
			.ok_or_else(|| LoadError::NoLoader { path: path.into() })?;

		trace!(message = "Loading file", ?path);
		let loaded = loader.load(path)?;
		if loaded.data.is_empty() {
			return Err(LoadError::NoData { path: path.into() });
		}

		debug!(
			message = "Loaded file",
			?path,
			acquisitions = loaded.data.acquisitions.len(),
			has_header = loaded.header.is_some()
		);
		return Ok(loaded);
	}
}

/// The on-disk shape of a json dataset
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasetJson {
	#[serde(default)]
	header: Option<HeaderTable>,
	info: AcquisitionInfo,
	acquisitions: Vec<Acquisition>,
}

/// Loads this workspace's own json dataset format
pub struct JsonDatasetLoader {}

impl DatasetLoader for JsonDatasetLoader {
	fn load(&self, path: &Path) -> Result<LoadedFile, LoadError> {
		let f = File::open(path).map_err(|error| LoadError::Io {
			path: path.into(),
			error,
		})?;

		let json: DatasetJson =
			serde_json::from_reader(BufReader::new(f)).map_err(|e| LoadError::Parse {
				path: path.into(),
				message: e.to_string(),
			})?;

		return Ok(LoadedFile {
			data: Dataset::new(Arc::new(json.info), json.acquisitions),
			header: json.header,
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const SAMPLE: &str = r#"{
		"header": [["SequenceString", "svs_se"], ["TE", "30"]],
		"info": { "f0": 123.2, "te": 30.0, "dwell": 0.0005, "nucleus": "1H" },
		"acquisitions": [
			{ "kind": "single_voxel", "channels": [[[1.0, 0.0], [0.5, 0.5]], [[1.0, 0.0], [0.5, 0.5]]] }
		]
	}"#;

	#[test]
	fn extensions() {
		assert_eq!(file_extension(Path::new("a/b.NII.GZ")), Some("nii.gz".into()));
		assert_eq!(file_extension(Path::new("a/b.IMA")), Some("ima".into()));
		assert_eq!(file_extension(Path::new("a/b")), None);

		// Matched against `file_extension`, so every entry is lowercase and listed once
		for (i, e) in SUPPORTED_EXTENSIONS.iter().enumerate() {
			assert_eq!(*e, e.to_lowercase());
			assert!(!SUPPORTED_EXTENSIONS[i + 1..].contains(e));
		}
	}

	#[test]
	fn load_json() {
		let dir = tempfile::tempdir().unwrap();
		let p = dir.path().join("svs.json");
		File::create(&p).unwrap().write_all(SAMPLE.as_bytes()).unwrap();

		let loaders = LoaderSet::new();
		let f = loaders.load(&p).unwrap();
		assert!(f.data.is_multichannel());
		assert_eq!(f.header.unwrap().get("TE"), Some("30"));
		assert_eq!(f.data.info.nucleus.as_str(), "1H");
	}

	#[test]
	fn unknown_format() {
		let loaders = LoaderSet::new();
		assert!(matches!(
			loaders.load(Path::new("x.dat")),
			Err(LoadError::NoLoader { .. })
		));
	}
}
