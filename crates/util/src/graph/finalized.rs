use std::fmt::Debug;

use super::{
	graph::Graph,
	util::{GraphEdgeIdx, GraphNodeIdx},
};

/// An immutable directed graph with parallel edges.
/// All read operations are fast.
pub struct FinalizedGraph<NodeType, EdgeType>
where
	NodeType: Debug,
	EdgeType: Debug,
{
	pub(super) graph: Graph<NodeType, EdgeType>,

	/// Edge indices, grouped by start node.
	pub(super) edge_map_out: Vec<Vec<GraphEdgeIdx>>,

	/// Edge indices, grouped by end node.
	pub(super) edge_map_in: Vec<Vec<GraphEdgeIdx>>,
}

impl<NodeType, EdgeType> Debug for FinalizedGraph<NodeType, EdgeType>
where
	NodeType: Debug,
	EdgeType: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FinalizedGraph")
			.field("nodes", &self.graph.nodes)
			.field("edges", &self.graph.edges)
			.finish()
	}
}

impl<NodeType, EdgeType> FinalizedGraph<NodeType, EdgeType>
where
	NodeType: Debug,
	EdgeType: Debug,
{
	#[inline]
	pub fn get_node(&self, node_idx: GraphNodeIdx) -> Option<&NodeType> {
		self.graph.get_node(node_idx)
	}

	#[inline]
	pub fn get_edge(
		&self,
		edge_idx: GraphEdgeIdx,
	) -> Option<(GraphNodeIdx, GraphNodeIdx, &EdgeType)> {
		self.graph.get_edge(edge_idx)
	}

	#[inline]
	pub fn len_nodes(&self) -> usize {
		self.graph.len_nodes()
	}

	#[inline]
	pub fn iter_nodes_idx(&self) -> impl Iterator<Item = (GraphNodeIdx, &NodeType)> {
		self.graph.iter_nodes_idx()
	}

	/// Get all edges starting at the given node.
	/// Unknown nodes have no edges.
	pub fn edges_starting_at(&self, node: GraphNodeIdx) -> &[GraphEdgeIdx] {
		self.edge_map_out
			.get(node.0)
			.map(|x| x.as_slice())
			.unwrap_or(&[])
	}

	/// Get all edges ending at the given node.
	/// Unknown nodes have no edges.
	pub fn edges_ending_at(&self, node: GraphNodeIdx) -> &[GraphEdgeIdx] {
		self.edge_map_in
			.get(node.0)
			.map(|x| x.as_slice())
			.unwrap_or(&[])
	}

	/// The targets of all edges leaving `node`, in edge order
	pub fn successors(&self, node: GraphNodeIdx) -> impl Iterator<Item = GraphNodeIdx> + '_ {
		self.edges_starting_at(node)
			.iter()
			.filter_map(|e| self.graph.get_edge(*e).map(|(_, to, _)| to))
	}
}
