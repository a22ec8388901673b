use smartstring::{LazyCompact, SmartString};
use std::{error::Error, sync::Arc};
use thiserror::Error;

use super::{NodeId, PropertyError};

/// An error we encounter while running a node
#[derive(Debug, Clone, Error)]
pub enum RunNodeError {
	//
	// MARK: Errors in node properties
	//
	/// We got a property this node doesn't know
	#[error("unexpected property `{property}`")]
	UnexpectedProperty { property: SmartString<LazyCompact> },

	/// A property had an unexpected type
	#[error("bad type for property `{property}`")]
	BadPropertyType { property: SmartString<LazyCompact> },

	/// We expected a property, but it wasn't there
	#[error("missing property `{property}`")]
	MissingProperty { property: SmartString<LazyCompact> },

	/// A property failed validation
	#[error("bad property `{property}`: {error}")]
	BadProperty {
		property: SmartString<LazyCompact>,
		error: Arc<PropertyError>,
	},

	//
	// MARK: Errors in node input
	//
	/// This node can't process the data it was given
	#[error("bad input: {message}")]
	BadInput { message: String },

	/// This node needs a water reference, but there is none
	#[error("node `{node_id}` needs a water reference")]
	MissingWaterReference { node_id: NodeId },

	//
	// MARK: Node runtime errors
	//
	/// A generic I/O error
	#[error("i/o error")]
	IoError(#[from] Arc<std::io::Error>),

	/// An external node command exited with an error
	#[error("node command failed with {status}: {stderr}")]
	CommandFailed { status: String, stderr: String },

	/// An external node command wrote something we can't read
	#[error("could not read node command output: {message}")]
	BadCommandOutput { message: String },

	/// The user cancelled this node's interaction request
	#[error("cancelled by user")]
	Cancelled,

	/// An arbitrary error
	#[error("generic error")]
	Other(#[from] Arc<dyn Error + Sync + Send + 'static>),
}

impl From<std::io::Error> for RunNodeError {
	fn from(value: std::io::Error) -> Self {
		Self::IoError(Arc::new(value))
	}
}
