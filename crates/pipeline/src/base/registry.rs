use smartstring::{LazyCompact, SmartString};
use std::{collections::BTreeMap, path::PathBuf};
use thiserror::Error;
use tracing::debug;

use super::{NodeCategory, ProcessingNode, PropertySpec, SocketName};

/// The type name of the pipeline's single data source node
pub const INPUT_NODE_TYPE: &str = "Input";

/// The default socket names of single-input, single-output nodes
pub const DEFAULT_INPUT: &str = "in";
pub const DEFAULT_OUTPUT: &str = "out";

/// Makes fresh instances of one node type
pub trait NodeBuilder: Send + Sync {
	fn build(&self) -> Box<dyn ProcessingNode>;
}

impl<F> NodeBuilder for F
where
	F: Fn() -> Box<dyn ProcessingNode> + Send + Sync,
{
	fn build(&self) -> Box<dyn ProcessingNode> {
		self()
	}
}

/// The capability interface of a node type:
/// what it connects to and which properties it takes.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
	pub category: NodeCategory,
	pub description: String,
	pub inputs: Vec<SocketName>,
	pub outputs: Vec<SocketName>,
	pub properties: BTreeMap<SmartString<LazyCompact>, PropertySpec>,
}

impl NodeDescriptor {
	/// A descriptor with one `in` and one `out` socket and no properties
	pub fn new(category: NodeCategory, description: &str) -> Self {
		Self {
			category,
			description: description.into(),
			inputs: vec![SocketName::new(DEFAULT_INPUT)],
			outputs: vec![SocketName::new(DEFAULT_OUTPUT)],
			properties: BTreeMap::new(),
		}
	}

	pub fn with_property(mut self, name: &str, spec: PropertySpec) -> Self {
		self.properties.insert(name.into(), spec);
		self
	}

	/// The descriptor of the built-in input node
	pub fn input() -> Self {
		Self {
			category: NodeCategory::Input,
			description: "Loaded input data".into(),
			inputs: Vec::new(),
			outputs: vec![SocketName::new(DEFAULT_OUTPUT)],
			properties: BTreeMap::new(),
		}
	}

	pub fn has_input(&self, socket: &SocketName) -> bool {
		self.inputs.contains(socket)
	}

	pub fn has_output(&self, socket: &SocketName) -> bool {
		self.outputs.contains(socket)
	}
}

/// Where a registered node type came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOrigin {
	BuiltIn,
	Plugin { descriptor_path: PathBuf },
}

/// An error we encounter when trying to register a node
#[derive(Debug, Error)]
pub enum RegisterNodeError {
	/// We tried to register a node with a type string that is already used
	#[error("a node named `{type_name}` already exists")]
	AlreadyExists { type_name: SmartString<LazyCompact> },

	/// This node type's descriptor is invalid
	#[error("node `{type_name}` has an invalid descriptor: {message}")]
	BadDescriptor {
		type_name: SmartString<LazyCompact>,
		message: String,
	},
}

/// A node type we've registered inside a [`NodeRegistry`]
struct RegisteredNode {
	descriptor: NodeDescriptor,
	origin: NodeOrigin,
	builder: Box<dyn NodeBuilder>,
}

/// The set of node types a pipeline may use
pub struct NodeRegistry {
	nodes: BTreeMap<SmartString<LazyCompact>, RegisteredNode>,
	input_descriptor: NodeDescriptor,
}

impl NodeRegistry {
	pub fn new() -> Self {
		return Self {
			nodes: BTreeMap::new(),
			input_descriptor: NodeDescriptor::input(),
		};
	}

	/// Register a new node type.
	///
	/// `type_name` must be new, and the descriptor must have valid socket names.
	pub fn register_node(
		&mut self,
		type_name: &str,
		descriptor: NodeDescriptor,
		origin: NodeOrigin,
		builder: Box<dyn NodeBuilder>,
	) -> Result<(), RegisterNodeError> {
		if self.nodes.contains_key(type_name) || type_name == INPUT_NODE_TYPE {
			return Err(RegisterNodeError::AlreadyExists {
				type_name: type_name.into(),
			});
		}

		let bad = |message: String| RegisterNodeError::BadDescriptor {
			type_name: type_name.into(),
			message,
		};

		mrs_util::names::check_name(type_name).map_err(|e| bad(e.to_string()))?;

		if descriptor.category == NodeCategory::Input {
			return Err(bad("only the built-in input node may use the input category".into()));
		}

		if descriptor.outputs.is_empty() {
			return Err(bad("a node needs at least one output".into()));
		}

		for s in descriptor.inputs.iter().chain(descriptor.outputs.iter()) {
			mrs_util::names::check_name(s.id()).map_err(|e| bad(format!("socket `{s}`: {e}")))?;
		}

		debug!(message = "Registered node", type_name, category = %descriptor.category, ?origin);
		self.nodes.insert(
			type_name.into(),
			RegisteredNode {
				descriptor,
				origin,
				builder,
			},
		);

		return Ok(());
	}

	pub fn has_node(&self, type_name: &str) -> bool {
		return type_name == INPUT_NODE_TYPE || self.nodes.contains_key(type_name);
	}

	pub fn descriptor(&self, type_name: &str) -> Option<&NodeDescriptor> {
		if type_name == INPUT_NODE_TYPE {
			return Some(&self.input_descriptor);
		}
		return self.nodes.get(type_name).map(|x| &x.descriptor);
	}

	pub fn origin(&self, type_name: &str) -> Option<&NodeOrigin> {
		return self.nodes.get(type_name).map(|x| &x.origin);
	}

	/// Make a new instance of the given node type.
	/// The input node is never instantiated.
	pub fn init_node(&self, type_name: &str) -> Option<Box<dyn ProcessingNode>> {
		return self.nodes.get(type_name).map(|x| x.builder.build());
	}

	/// All registered types (the input node excluded), in name order
	pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeDescriptor, &NodeOrigin)> {
		self.nodes
			.iter()
			.map(|(k, v)| (k.as_str(), &v.descriptor, &v.origin))
	}

	/// The first built-in node type of the given category, by name
	pub fn first_of_category(&self, category: NodeCategory) -> Option<&str> {
		return self
			.iter()
			.find(|(_, d, o)| d.category == category && **o == NodeOrigin::BuiltIn)
			.map(|(k, _, _)| k);
	}

	/// Remove every plugin node. Returns how many were removed.
	pub fn remove_plugins(&mut self) -> usize {
		let before = self.nodes.len();
		self.nodes.retain(|_, v| v.origin == NodeOrigin::BuiltIn);
		return before - self.nodes.len();
	}
}
