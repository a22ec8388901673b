//! Helpful types

use mrs_util::names::{check_name, NameError};
use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::fmt::Display;

/// The unique id of a node in a pipeline graph
#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(SmartString<LazyCompact>);

impl NodeId {
	pub fn new(id: &str) -> Self {
		Self(id.into())
	}

	/// Make a new id, checking that it is a valid name
	pub fn checked(id: &str) -> Result<Self, NameError> {
		check_name(id)?;
		return Ok(Self::new(id));
	}

	pub fn id(&self) -> &SmartString<LazyCompact> {
		&self.0
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

impl From<String> for NodeId {
	fn from(value: String) -> Self {
		Self::new(&value)
	}
}

impl From<&str> for NodeId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// The name of an input or output socket on a node
#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SocketName(SmartString<LazyCompact>);

impl SocketName {
	pub fn new(id: &str) -> Self {
		Self(id.into())
	}

	pub fn id(&self) -> &SmartString<LazyCompact> {
		&self.0
	}
}

impl Display for SocketName {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

impl From<String> for SocketName {
	fn from(value: String) -> Self {
		Self::new(&value)
	}
}

impl From<&str> for SocketName {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// An output socket of a specific node
#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize, PartialOrd, Ord)]
pub struct OutputSocket {
	pub node: NodeId,
	pub socket: SocketName,
}

/// An input socket of a specific node
#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize, PartialOrd, Ord)]
pub struct InputSocket {
	pub node: NodeId,
	pub socket: SocketName,
}

impl OutputSocket {
	pub fn new(node: &str, socket: &str) -> Self {
		Self {
			node: node.into(),
			socket: socket.into(),
		}
	}
}

impl InputSocket {
	pub fn new(node: &str, socket: &str) -> Self {
		Self {
			node: node.into(),
			socket: socket.into(),
		}
	}
}

impl Display for OutputSocket {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}", self.node, self.socket)
	}
}

impl Display for InputSocket {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}", self.node, self.socket)
	}
}
