//! The persisted form of a pipeline graph (`.pipe` files)

use mrs_data::ManualAdjustment;
use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::{
	fs::File,
	io::{BufReader, BufWriter, Write},
	path::{Path, PathBuf},
};
use thiserror::Error;

use crate::base::{NodeId, PropertyValue, SocketName};

/// An error we encounter while reading or writing a pipeline definition
#[derive(Debug, Error)]
pub enum DefinitionError {
	#[error("i/o error on `{path}`")]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("could not parse pipeline definition `{path}`")]
	Parse {
		path: PathBuf,
		#[source]
		error: serde_json::Error,
	},

	#[error("could not encode pipeline definition")]
	Encode(#[source] serde_json::Error),
}

/// One node, in authoring order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeEntry {
	pub node_type: SmartString<LazyCompact>,
	pub id: NodeId,

	/// Editor position. Has no effect on execution.
	#[serde(default)]
	pub position: [f64; 2],

	#[serde(default)]
	pub properties: Vec<(SmartString<LazyCompact>, PropertyValue)>,
}

/// `(source node, source socket, target node, target socket)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry(pub NodeId, pub SocketName, pub NodeId, pub SocketName);

/// A serialized pipeline graph, plus optional session values
/// that have nothing to do with topology.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDefinition {
	pub nodes: Vec<NodeEntry>,
	pub wires: Vec<WireEntry>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub adjustment: Option<ManualAdjustment>,
}

impl PipelineDefinition {
	pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(s)
	}

	pub fn to_json(&self) -> Result<String, DefinitionError> {
		serde_json::to_string_pretty(self).map_err(DefinitionError::Encode)
	}

	pub fn read(path: &Path) -> Result<Self, DefinitionError> {
		let f = File::open(path).map_err(|error| DefinitionError::Io {
			path: path.into(),
			error,
		})?;

		return serde_json::from_reader(BufReader::new(f)).map_err(|error| {
			DefinitionError::Parse {
				path: path.into(),
				error,
			}
		});
	}

	pub fn write(&self, path: &Path) -> Result<(), DefinitionError> {
		let io = |error| DefinitionError::Io {
			path: path.into(),
			error,
		};

		let mut f = BufWriter::new(File::create(path).map_err(io)?);
		serde_json::to_writer_pretty(&mut f, self).map_err(DefinitionError::Encode)?;
		f.write_all(b"\n").map_err(io)?;
		f.flush().map_err(io)?;
		return Ok(());
	}
}
