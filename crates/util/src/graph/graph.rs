use petgraph::{algo::toposort, graphmap::GraphMap, Directed};
use std::fmt::Debug;

use super::{
	finalized::FinalizedGraph,
	util::{GraphEdgeIdx, GraphNodeIdx},
};

/// A directed graph with parallel edges.
///
/// Nodes and edges may only be added, never removed.
/// Editable graphs (like a pipeline being authored) keep their
/// own storage and build one of these when they need to be walked.
#[derive(Debug, Clone)]
pub struct Graph<NodeType, EdgeType>
where
	NodeType: Debug,
	EdgeType: Debug,
{
	pub(super) nodes: Vec<NodeType>,
	pub(super) edges: Vec<(GraphNodeIdx, GraphNodeIdx, EdgeType)>,
}

impl<NodeType, EdgeType> Graph<NodeType, EdgeType>
where
	NodeType: Debug,
	EdgeType: Debug,
{
	/// Create an empty graph
	pub fn new() -> Self {
		Self {
			nodes: Vec::new(),
			edges: Vec::new(),
		}
	}

	/// Convert this graph to an immutable structure with fast reads.
	pub fn finalize(self) -> FinalizedGraph<NodeType, EdgeType> {
		let mut edge_map_in = vec![Vec::new(); self.nodes.len()];
		let mut edge_map_out = vec![Vec::new(); self.nodes.len()];
		for (i, (from, to, _)) in self.edges.iter().enumerate() {
			edge_map_out[from.0].push(GraphEdgeIdx(i));
			edge_map_in[to.0].push(GraphEdgeIdx(i));
		}

		FinalizedGraph {
			graph: self,
			edge_map_in,
			edge_map_out,
		}
	}

	/// Add a node to this graph.
	#[inline]
	pub fn add_node(&mut self, node: NodeType) -> GraphNodeIdx {
		let i = self.nodes.len();
		self.nodes.push(node);
		GraphNodeIdx(i)
	}

	/// Add an edge to this graph.
	/// Returns `None` if either endpoint is not a node of this graph.
	#[inline]
	pub fn add_edge(
		&mut self,
		from: GraphNodeIdx,
		to: GraphNodeIdx,
		edge_value: EdgeType,
	) -> Option<GraphEdgeIdx> {
		if from.0 >= self.nodes.len() || to.0 >= self.nodes.len() {
			return None;
		}

		let i = self.edges.len();
		self.edges.push((from, to, edge_value));
		Some(GraphEdgeIdx(i))
	}

	#[inline]
	pub fn get_node(&self, node_idx: GraphNodeIdx) -> Option<&NodeType> {
		self.nodes.get(node_idx.0)
	}

	#[inline]
	pub fn get_edge(
		&self,
		edge_idx: GraphEdgeIdx,
	) -> Option<(GraphNodeIdx, GraphNodeIdx, &EdgeType)> {
		self.edges.get(edge_idx.0).map(|(f, t, v)| (*f, *t, v))
	}

	#[inline]
	pub fn len_nodes(&self) -> usize {
		self.nodes.len()
	}

	#[inline]
	pub fn len_edges(&self) -> usize {
		self.edges.len()
	}

	/// Iterate over all nodes in this graph, with their indices
	#[inline]
	pub fn iter_nodes_idx(&self) -> impl Iterator<Item = (GraphNodeIdx, &NodeType)> {
		self.nodes
			.iter()
			.enumerate()
			.map(|(a, b)| (GraphNodeIdx(a), b))
	}

	/// Iterate over all edges in this graph
	#[inline]
	pub fn iter_edges(&self) -> impl Iterator<Item = (GraphNodeIdx, GraphNodeIdx, &EdgeType)> {
		self.edges.iter().map(|(f, t, v)| (*f, *t, v))
	}

	/// Returns `true` if this graph has a cycle.
	/// Self-loops count as cycles.
	pub fn has_cycle(&self) -> bool {
		let mut fake_graph = GraphMap::<usize, (), Directed>::new();
		for (i, _) in self.iter_nodes_idx() {
			fake_graph.add_node(i.0);
		}
		for (from, to, _) in self.iter_edges() {
			if from == to {
				return true;
			}
			fake_graph.add_edge(from.0, to.0, ());
		}
		toposort(&fake_graph, None).is_err()
	}
}
