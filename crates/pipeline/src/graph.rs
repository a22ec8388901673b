//! The editable pipeline graph and its reduction to a serial chain

use mrs_data::ManualAdjustment;
use mrs_util::{
	graph::{graph::Graph, util::GraphNodeIdx},
	names::NameError,
};
use smartstring::{LazyCompact, SmartString};
use std::{
	collections::{BTreeMap, BTreeSet, VecDeque},
	sync::Arc,
};
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::{
	base::{
		InputSocket, NodeCategory, NodeId, NodeRegistry, OutputSocket, PropertyError,
		PropertyValue, INPUT_NODE_TYPE,
	},
	definition::{NodeEntry, PipelineDefinition, WireEntry},
};

//
// MARK: Errors
//

/// An error we encounter while editing or reading a pipeline graph
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
	#[error("unknown node type `{node_type}`")]
	UnknownNodeType { node_type: SmartString<LazyCompact> },

	#[error("a node with id `{id}` already exists")]
	DuplicateNode { id: NodeId },

	#[error("invalid node id `{id}`: {error}")]
	BadNodeId { id: NodeId, error: NameError },

	#[error("a pipeline can only have one input node")]
	DuplicateInputNode,

	#[error("there is no node `{id}`")]
	NoNode { id: NodeId },

	#[error("there is no socket `{socket}`")]
	NoSocket { socket: String },

	#[error("node `{node}` cannot be wired to itself")]
	SelfWire { node: NodeId },

	#[error("wire from `{from}` to `{to}` already exists")]
	DuplicateWire { from: OutputSocket, to: InputSocket },

	/// Inputs take at most one wire
	#[error("input `{socket}` is already connected")]
	InputOccupied { socket: InputSocket },

	/// Outputs on the executed chain take at most one wire
	#[error("output `{socket}` already feeds the processing chain")]
	OutputOccupied { socket: OutputSocket },

	#[error("wire from `{from}` to `{to}` would create a cycle")]
	WouldCycle { from: OutputSocket, to: InputSocket },

	#[error("wire from `{from}` to `{to}` does not exist")]
	NoSuchWire { from: OutputSocket, to: InputSocket },

	#[error("node `{node}` has no property `{property}`")]
	UnknownProperty {
		node: NodeId,
		property: SmartString<LazyCompact>,
	},

	#[error("bad value for property `{property}` of node `{node}`: {error}")]
	BadProperty {
		node: NodeId,
		property: SmartString<LazyCompact>,
		error: PropertyError,
	},

	//
	// MARK: Chain errors
	//
	#[error("this pipeline has no input node")]
	NoInputNode,

	#[error("node `{node}` feeds {wires} nodes, a chain may not branch")]
	FanOut { node: NodeId, wires: usize },

	#[error("node `{node}` receives {wires} wires, a chain may not merge")]
	FanIn { node: NodeId, wires: usize },

	#[error("the chain loops back to node `{node}`")]
	Cycle { node: NodeId },
}

//
// MARK: Graph types
//

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
	pub node_type: SmartString<LazyCompact>,
	pub id: NodeId,
	pub position: [f64; 2],

	/// Always holds every property this node type declares
	pub properties: BTreeMap<SmartString<LazyCompact>, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
	pub from: OutputSocket,
	pub to: InputSocket,
}

/// One step of a linearized pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ChainNode {
	pub id: NodeId,
	pub node_type: SmartString<LazyCompact>,
	pub category: NodeCategory,
	pub properties: BTreeMap<SmartString<LazyCompact>, PropertyValue>,
}

/// An authored pipeline: nodes, and wires between their sockets.
///
/// The graph may hold anything while it is being edited.
/// Only [`PipelineGraph::linearize`] decides whether it is runnable.
#[derive(Clone)]
pub struct PipelineGraph {
	registry: Arc<NodeRegistry>,
	nodes: Vec<GraphNode>,
	wires: Vec<Wire>,
}

impl std::fmt::Debug for PipelineGraph {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PipelineGraph")
			.field("nodes", &self.nodes)
			.field("wires", &self.wires)
			.finish()
	}
}

impl PipelineGraph {
	pub fn new(registry: Arc<NodeRegistry>) -> Self {
		Self {
			registry,
			nodes: Vec::new(),
			wires: Vec::new(),
		}
	}

	pub fn registry(&self) -> &Arc<NodeRegistry> {
		&self.registry
	}

	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	pub fn wires(&self) -> &[Wire] {
		&self.wires
	}

	pub fn get_node(&self, id: &NodeId) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == *id)
	}

	pub fn input_node(&self) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.node_type == INPUT_NODE_TYPE)
	}

	/// Remove all nodes and wires
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.wires.clear();
	}

	//
	// MARK: Edit
	//

	/// Add a node of type `node_type`. All its properties start at their defaults.
	pub fn add_node(
		&mut self,
		node_type: &str,
		id: &str,
		position: [f64; 2],
	) -> Result<(), GraphError> {
		let descriptor =
			self.registry
				.descriptor(node_type)
				.ok_or_else(|| GraphError::UnknownNodeType {
					node_type: node_type.into(),
				})?;

		let id = NodeId::checked(id).map_err(|error| GraphError::BadNodeId {
			id: id.into(),
			error,
		})?;

		if self.get_node(&id).is_some() {
			return Err(GraphError::DuplicateNode { id });
		}

		if node_type == INPUT_NODE_TYPE && self.input_node().is_some() {
			return Err(GraphError::DuplicateInputNode);
		}

		let properties = descriptor
			.properties
			.iter()
			.map(|(k, v)| (k.clone(), v.default.clone()))
			.collect();

		trace!(message = "Adding node", node_type, %id);
		self.nodes.push(GraphNode {
			node_type: node_type.into(),
			id,
			position,
			properties,
		});

		return Ok(());
	}

	/// Remove a node and every wire touching it
	pub fn remove_node(&mut self, id: &NodeId) -> Result<GraphNode, GraphError> {
		let i = self
			.nodes
			.iter()
			.position(|n| n.id == *id)
			.ok_or_else(|| GraphError::NoNode { id: id.clone() })?;

		self.wires.retain(|w| w.from.node != *id && w.to.node != *id);
		return Ok(self.nodes.remove(i));
	}

	/// Check that both ends of a wire exist
	fn check_endpoints(&self, from: &OutputSocket, to: &InputSocket) -> Result<(), GraphError> {
		let from_node = self.get_node(&from.node).ok_or_else(|| GraphError::NoNode {
			id: from.node.clone(),
		})?;
		let to_node = self.get_node(&to.node).ok_or_else(|| GraphError::NoNode {
			id: to.node.clone(),
		})?;

		let has_output = self
			.registry
			.descriptor(&from_node.node_type)
			.is_some_and(|d| d.has_output(&from.socket));
		if !has_output {
			return Err(GraphError::NoSocket {
				socket: from.to_string(),
			});
		}

		let has_input = self
			.registry
			.descriptor(&to_node.node_type)
			.is_some_and(|d| d.has_input(&to.socket));
		if !has_input {
			return Err(GraphError::NoSocket {
				socket: to.to_string(),
			});
		}

		if from.node == to.node {
			return Err(GraphError::SelfWire {
				node: from.node.clone(),
			});
		}

		return Ok(());
	}

	/// Ids of all nodes reachable from the input node, the input node included.
	fn backbone(&self) -> BTreeSet<NodeId> {
		let mut seen = BTreeSet::new();
		let mut queue = VecDeque::new();
		if let Some(input) = self.input_node() {
			queue.push_back(input.id.clone());
		}

		while let Some(id) = queue.pop_front() {
			if !seen.insert(id.clone()) {
				continue;
			}
			for w in self.wires.iter().filter(|w| w.from.node == id) {
				queue.push_back(w.to.node.clone());
			}
		}

		return seen;
	}

	/// Would adding `from -> to` close a loop?
	fn would_cycle(&self, from: &OutputSocket, to: &InputSocket) -> bool {
		let mut g = Graph::<&NodeId, ()>::new();
		let idx: BTreeMap<&NodeId, GraphNodeIdx> =
			self.nodes.iter().map(|n| (&n.id, g.add_node(&n.id))).collect();

		let pairs = self
			.wires
			.iter()
			.map(|w| (&w.from.node, &w.to.node))
			.chain(std::iter::once((&from.node, &to.node)));

		for (a, b) in pairs {
			if let (Some(a), Some(b)) = (idx.get(a), idx.get(b)) {
				g.add_edge(*a, *b, ());
			}
		}

		return g.has_cycle();
	}

	/// Connect an output socket to an input socket.
	///
	/// Inputs take one wire. An output that already feeds the chain
	/// (reachable from the input node) cannot take a second one.
	/// Outputs of nodes off the chain may fan out freely.
	pub fn connect(&mut self, from: OutputSocket, to: InputSocket) -> Result<(), GraphError> {
		self.check_endpoints(&from, &to)?;

		if self.wires.iter().any(|w| w.from == from && w.to == to) {
			return Err(GraphError::DuplicateWire { from, to });
		}

		if self.wires.iter().any(|w| w.to == to) {
			return Err(GraphError::InputOccupied { socket: to });
		}

		if self.wires.iter().any(|w| w.from == from) && self.backbone().contains(&from.node) {
			return Err(GraphError::OutputOccupied { socket: from });
		}

		if self.would_cycle(&from, &to) {
			return Err(GraphError::WouldCycle { from, to });
		}

		trace!(message = "Connecting", %from, %to);
		self.wires.push(Wire { from, to });
		return Ok(());
	}

	pub fn disconnect(&mut self, wire: &Wire) -> Result<(), GraphError> {
		let i = self
			.wires
			.iter()
			.position(|w| w == wire)
			.ok_or_else(|| GraphError::NoSuchWire {
				from: wire.from.clone(),
				to: wire.to.clone(),
			})?;
		self.wires.remove(i);
		return Ok(());
	}

	pub fn set_property(
		&mut self,
		node_id: &NodeId,
		name: &str,
		value: PropertyValue,
	) -> Result<(), GraphError> {
		let registry = self.registry.clone();
		let node = self
			.nodes
			.iter_mut()
			.find(|n| n.id == *node_id)
			.ok_or_else(|| GraphError::NoNode {
				id: node_id.clone(),
			})?;

		let spec = registry
			.descriptor(&node.node_type)
			.and_then(|d| d.properties.get(name))
			.ok_or_else(|| GraphError::UnknownProperty {
				node: node_id.clone(),
				property: name.into(),
			})?;

		let value = spec
			.property_type
			.coerce(value)
			.map_err(|error| GraphError::BadProperty {
				node: node_id.clone(),
				property: name.into(),
				error,
			})?;

		node.properties.insert(name.into(), value);
		return Ok(());
	}

	//
	// MARK: Persist
	//

	/// Serialize this graph, attaching optional session values
	pub fn serialize(&self, adjustment: Option<ManualAdjustment>) -> PipelineDefinition {
		PipelineDefinition {
			nodes: self
				.nodes
				.iter()
				.map(|n| NodeEntry {
					node_type: n.node_type.clone(),
					id: n.id.clone(),
					position: n.position,
					properties: n
						.properties
						.iter()
						.map(|(k, v)| (k.clone(), v.clone()))
						.collect(),
				})
				.collect(),
			wires: self
				.wires
				.iter()
				.map(|w| {
					WireEntry(
						w.from.node.clone(),
						w.from.socket.clone(),
						w.to.node.clone(),
						w.to.socket.clone(),
					)
				})
				.collect(),
			adjustment,
		}
	}

	/// Build a graph from its serialized form.
	///
	/// Nodes, sockets and properties are checked. Wiring rules are not:
	/// a stored graph that cannot run must still load, so that
	/// [`PipelineGraph::linearize`] can report why.
	pub fn deserialize(
		registry: Arc<NodeRegistry>,
		definition: &PipelineDefinition,
	) -> Result<Self, GraphError> {
		let mut g = Self::new(registry);

		for entry in &definition.nodes {
			g.add_node(&entry.node_type, entry.id.id(), entry.position)?;
			for (name, value) in &entry.properties {
				g.set_property(&entry.id, name, value.clone())?;
			}
		}

		for WireEntry(a, b, c, d) in &definition.wires {
			let from = OutputSocket {
				node: a.clone(),
				socket: b.clone(),
			};
			let to = InputSocket {
				node: c.clone(),
				socket: d.clone(),
			};
			g.check_endpoints(&from, &to)?;
			g.wires.push(Wire { from, to });
		}

		return Ok(g);
	}

	/// Replace this graph with the one in `definition`.
	/// On error, this graph is left untouched.
	pub fn load(&mut self, definition: &PipelineDefinition) -> Result<(), GraphError> {
		*self = Self::deserialize(self.registry.clone(), definition)?;
		return Ok(());
	}

	//
	// MARK: Linearize
	//

	/// Walk from the input node along wires and return the nodes in execution order.
	/// The input node itself is not part of the chain.
	///
	/// Any branch, merge or loop on the way is an error; the chain
	/// is then empty. A partial chain is never returned.
	pub fn linearize(&self) -> Result<Vec<ChainNode>, GraphError> {
		let res = self.walk_chain();
		match &res {
			Ok(chain) => debug!(message = "Linearized pipeline", steps = chain.len()),
			Err(error) => error!(message = "Pipeline is not a serial chain", %error),
		}
		return res;
	}

	fn walk_chain(&self) -> Result<Vec<ChainNode>, GraphError> {
		let mut g = Graph::new();
		let mut idx = BTreeMap::new();
		for n in &self.nodes {
			idx.insert(&n.id, g.add_node(n));
		}
		for w in &self.wires {
			if let (Some(a), Some(b)) = (idx.get(&w.from.node), idx.get(&w.to.node)) {
				g.add_edge(*a, *b, w);
			}
		}
		let g = g.finalize();

		let input = self.input_node().ok_or(GraphError::NoInputNode)?;
		let mut current = *idx.get(&input.id).ok_or(GraphError::NoInputNode)?;
		let mut visited = BTreeSet::from([current]);
		let mut chain = Vec::new();

		loop {
			let out = g.edges_starting_at(current);
			let current_id = || {
				g.get_node(current)
					.map(|n| n.id.clone())
					.unwrap_or_else(|| input.id.clone())
			};

			let edge = match out {
				[] => break,
				[edge] => *edge,
				_ => {
					return Err(GraphError::FanOut {
						node: current_id(),
						wires: out.len(),
					})
				}
			};

			let next = match g.get_edge(edge) {
				Some((_, next, _)) => next,
				None => break,
			};

			let node = match g.get_node(next) {
				Some(n) => *n,
				None => break,
			};

			if !visited.insert(next) {
				return Err(GraphError::Cycle {
					node: node.id.clone(),
				});
			}

			let incoming = g.edges_ending_at(next).len();
			if incoming > 1 {
				return Err(GraphError::FanIn {
					node: node.id.clone(),
					wires: incoming,
				});
			}

			let category = self
				.registry
				.descriptor(&node.node_type)
				.map(|d| d.category)
				.ok_or_else(|| GraphError::UnknownNodeType {
					node_type: node.node_type.clone(),
				})?;

			chain.push(ChainNode {
				id: node.id.clone(),
				node_type: node.node_type.clone(),
				category,
				properties: node.properties.clone(),
			});
			current = next;
		}

		return Ok(chain);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		base::{
			NodeDescriptor, NodeOrigin, ProcessingNode, PropertySpec, PropertyType, RunNodeError,
			SocketName, StepContext, StepInput, StepOutput,
		},
		helpers::NodeProperties,
	};
	use rstest::rstest;

	struct Passthrough {}

	impl ProcessingNode for Passthrough {
		fn run(
			&mut self,
			_ctx: &StepContext<'_>,
			_properties: NodeProperties,
			input: StepInput,
		) -> Result<StepOutput, RunNodeError> {
			Ok(StepOutput::data((*input.data).clone()))
		}
	}

	fn registry() -> Arc<NodeRegistry> {
		let mut r = NodeRegistry::new();
		let b = || Box::new(|| Box::new(Passthrough {}) as Box<dyn ProcessingNode>);

		r.register_node(
			"CoilCombine",
			NodeDescriptor::new(NodeCategory::CoilCombination, ""),
			NodeOrigin::BuiltIn,
			b(),
		)
		.unwrap();

		r.register_node(
			"PhaseCorrect",
			NodeDescriptor::new(NodeCategory::PhaseCorrection, "").with_property(
				"phase",
				PropertySpec::new(
					PropertyType::Float {
						min: Some(-180.0),
						max: Some(180.0),
					},
					PropertyValue::Float(0.0),
					"",
				)
				.unwrap(),
			),
			NodeOrigin::BuiltIn,
			b(),
		)
		.unwrap();

		let mut split = NodeDescriptor::new(NodeCategory::Other, "");
		split.outputs = vec![SocketName::new("a"), SocketName::new("b")];
		r.register_node("Split", split, NodeOrigin::BuiltIn, b())
			.unwrap();

		Arc::new(r)
	}

	/// input -> n0 -> n1 -> ... -> n{len-1}
	fn serial(len: usize) -> PipelineGraph {
		let mut g = PipelineGraph::new(registry());
		g.add_node(INPUT_NODE_TYPE, "input", [0.0, 0.0]).unwrap();
		let mut prev = "input".to_owned();
		for i in 0..len {
			let id = format!("n{i}");
			let t = if i % 2 == 0 { "CoilCombine" } else { "PhaseCorrect" };
			g.add_node(t, &id, [i as f64, 0.0]).unwrap();
			g.connect(OutputSocket::new(&prev, "out"), InputSocket::new(&id, "in"))
				.unwrap();
			prev = id;
		}
		g
	}

	#[rstest]
	#[case(0)]
	#[case(1)]
	#[case(2)]
	#[case(5)]
	fn serial_round_trip(#[case] len: usize) {
		let g = serial(len);
		let chain = g.linearize().unwrap();
		assert_eq!(chain.len(), len);

		let def = g.serialize(None);
		let json = def.to_json().unwrap();
		let back = PipelineDefinition::from_json(&json).unwrap();
		let g2 = PipelineGraph::deserialize(g.registry().clone(), &back).unwrap();
		assert_eq!(g2.linearize().unwrap(), chain);
	}

	#[test]
	fn unreachable_nodes_are_not_in_chain() {
		let mut g = serial(2);
		g.add_node("CoilCombine", "loose", [0.0, 0.0]).unwrap();
		assert_eq!(g.linearize().unwrap().len(), 2);
	}

	#[test]
	fn fan_out_from_file_fails_closed() {
		let mut def = serial(2).serialize(None);
		def.nodes.push(NodeEntry {
			node_type: "PhaseCorrect".into(),
			id: "extra".into(),
			position: [0.0, 0.0],
			properties: Vec::new(),
		});
		def.wires.push(WireEntry(
			"n0".into(),
			"out".into(),
			"extra".into(),
			"in".into(),
		));

		let g = PipelineGraph::deserialize(registry(), &def).unwrap();
		assert_eq!(
			g.linearize(),
			Err(GraphError::FanOut {
				node: "n0".into(),
				wires: 2
			})
		);
	}

	#[test]
	fn fan_out_across_sockets_fails() {
		let mut g = serial(0);
		g.add_node("Split", "s", [0.0, 0.0]).unwrap();
		g.add_node("CoilCombine", "x", [0.0, 0.0]).unwrap();
		g.add_node("CoilCombine", "y", [0.0, 0.0]).unwrap();
		g.connect(OutputSocket::new("input", "out"), InputSocket::new("s", "in"))
			.unwrap();
		g.connect(OutputSocket::new("s", "a"), InputSocket::new("x", "in"))
			.unwrap();
		g.connect(OutputSocket::new("s", "b"), InputSocket::new("y", "in"))
			.unwrap();
		assert!(matches!(g.linearize(), Err(GraphError::FanOut { .. })));
	}

	#[test]
	fn fan_out_reaches_chain_later() {
		// Branching is allowed off the chain...
		let mut g = serial(0);
		for id in ["a", "b", "c"] {
			g.add_node("CoilCombine", id, [0.0, 0.0]).unwrap();
		}
		g.connect(OutputSocket::new("a", "out"), InputSocket::new("b", "in"))
			.unwrap();
		g.connect(OutputSocket::new("a", "out"), InputSocket::new("c", "in"))
			.unwrap();
		assert_eq!(g.linearize().unwrap().len(), 0);

		// ...until the branch is connected to the input
		g.connect(OutputSocket::new("input", "out"), InputSocket::new("a", "in"))
			.unwrap();
		assert!(g.linearize().is_err());
	}

	#[test]
	fn connect_rules() {
		let mut g = serial(2);
		g.add_node("CoilCombine", "x", [0.0, 0.0]).unwrap();

		assert_eq!(
			g.connect(OutputSocket::new("n0", "out"), InputSocket::new("x", "in")),
			Err(GraphError::OutputOccupied {
				socket: OutputSocket::new("n0", "out")
			})
		);
		assert_eq!(
			g.connect(OutputSocket::new("x", "out"), InputSocket::new("n1", "in")),
			Err(GraphError::InputOccupied {
				socket: InputSocket::new("n1", "in")
			})
		);
		assert!(matches!(
			g.connect(OutputSocket::new("n1", "out"), InputSocket::new("n0", "in")),
			Err(GraphError::InputOccupied { .. })
		));
		assert!(matches!(
			g.connect(OutputSocket::new("n1", "nope"), InputSocket::new("x", "in")),
			Err(GraphError::NoSocket { .. })
		));
		assert!(matches!(
			g.connect(OutputSocket::new("x", "out"), InputSocket::new("x", "in")),
			Err(GraphError::SelfWire { .. })
		));

		g.connect(OutputSocket::new("n1", "out"), InputSocket::new("x", "in"))
			.unwrap();
		assert_eq!(g.linearize().unwrap().len(), 3);
	}

	#[test]
	fn cycles_are_rejected() {
		let mut g = serial(0);
		g.add_node("CoilCombine", "a", [0.0, 0.0]).unwrap();
		g.add_node("Split", "b", [0.0, 0.0]).unwrap();
		g.connect(OutputSocket::new("a", "out"), InputSocket::new("b", "in"))
			.unwrap();
		assert!(matches!(
			g.connect(OutputSocket::new("b", "a"), InputSocket::new("a", "in")),
			Err(GraphError::WouldCycle { .. })
		));
	}

	#[test]
	fn remove_and_disconnect() {
		let mut g = serial(3);
		g.remove_node(&"n1".into()).unwrap();
		assert_eq!(g.linearize().unwrap().len(), 1);
		assert!(g.wires().iter().all(|w| w.to.node != NodeId::new("n1")));

		let w = Wire {
			from: OutputSocket::new("input", "out"),
			to: InputSocket::new("n0", "in"),
		};
		g.disconnect(&w).unwrap();
		assert!(matches!(
			g.disconnect(&w),
			Err(GraphError::NoSuchWire { .. })
		));
		assert_eq!(g.linearize().unwrap().len(), 0);
	}

	#[test]
	fn properties() {
		let mut g = serial(2);
		let n1 = NodeId::new("n1");
		g.set_property(&n1, "phase", PropertyValue::Integer(45))
			.unwrap();
		assert_eq!(
			g.get_node(&n1).unwrap().properties["phase"],
			PropertyValue::Float(45.0)
		);

		assert!(matches!(
			g.set_property(&n1, "phase", PropertyValue::Float(500.0)),
			Err(GraphError::BadProperty { .. })
		));
		assert!(matches!(
			g.set_property(&n1, "gain", PropertyValue::Float(1.0)),
			Err(GraphError::UnknownProperty { .. })
		));

		let chain = g.linearize().unwrap();
		assert_eq!(chain[1].properties["phase"], PropertyValue::Float(45.0));
	}

	#[test]
	fn add_node_errors() {
		let mut g = serial(1);
		assert!(matches!(
			g.add_node("Nope", "z", [0.0, 0.0]),
			Err(GraphError::UnknownNodeType { .. })
		));
		assert!(matches!(
			g.add_node("CoilCombine", "n0", [0.0, 0.0]),
			Err(GraphError::DuplicateNode { .. })
		));
		assert_eq!(
			g.add_node(INPUT_NODE_TYPE, "in2", [0.0, 0.0]),
			Err(GraphError::DuplicateInputNode)
		);
		assert!(matches!(
			g.add_node("CoilCombine", "a/b", [0.0, 0.0]),
			Err(GraphError::BadNodeId { .. })
		));
	}

	#[test]
	fn load_and_clear() {
		let src = serial(3);
		let mut g = serial(1);
		g.load(&src.serialize(None)).unwrap();
		assert_eq!(g.nodes().len(), 4);
		assert_eq!(g.linearize().unwrap().len(), 3);

		g.clear();
		assert!(g.nodes().is_empty());
		assert_eq!(g.linearize(), Err(GraphError::NoInputNode));
	}
}
