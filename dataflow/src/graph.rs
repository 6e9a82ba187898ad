use core::fmt::Debug;
use core::hash::Hash;
use std::collections::HashMap;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} is not part of the graph")]
    InvalidNode(String),
    #[error("operation `{0}` is not supported by this graph")]
    UnsupportedOperation(&'static str),
    #[error("graph is not well-formed: {0}")]
    Unsound(String),
}

impl GraphError {
    pub fn invalid_node<N: Debug + ?Sized>(node: &N) -> Self {
        Self::InvalidNode(format!("{node:?}"))
    }
}

//////////////////////////
// Traits for graphs.   //
//////////////////////////

/// A directed graph over opaque node identities. The graph never inspects
/// its nodes beyond equality and hashing.
///
/// Requirements:
/// * `has_edge(a, b)` holds exactly when `successors(a)` contains `b`, and
///   exactly when `predecessors(b)` contains `a`.
/// * Neighbours are reported without duplicates and in a deterministic order.
///
/// The edge mutation methods are optional. Read-only graphs and views keep
/// the default implementations, which fail with
/// [`GraphError::UnsupportedOperation`]. Nodes are never created or removed
/// through this trait.
pub trait Graph {
    type Node: Clone + Eq + Hash + Debug;

    /// All the nodes of the graph in a deterministic order.
    fn nodes(&self) -> Vec<Self::Node>;

    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    fn contains_node(&self, node: &Self::Node) -> bool;

    fn predecessors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError>;

    fn successors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError>;

    fn pred_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        Ok(self.predecessors(node)?.len())
    }

    fn succ_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        Ok(self.successors(node)?.len())
    }

    /// Total over all pairs of nodes, returns false when either node is not
    /// part of the graph.
    fn has_edge(&self, src: &Self::Node, dst: &Self::Node) -> bool;

    fn add_edge(&mut self, _src: &Self::Node, _dst: &Self::Node) -> Result<(), GraphError> {
        Err(GraphError::UnsupportedOperation("add_edge"))
    }

    fn remove_edge(&mut self, _src: &Self::Node, _dst: &Self::Node) -> Result<(), GraphError> {
        Err(GraphError::UnsupportedOperation("remove_edge"))
    }

    /// Removes both the incoming and the outgoing edges of a node. Either
    /// all the edges are removed or the graph is left untouched.
    fn remove_all_incident_edges(&mut self, _node: &Self::Node) -> Result<(), GraphError> {
        Err(GraphError::UnsupportedOperation("remove_all_incident_edges"))
    }

    fn remove_incoming_edges(&mut self, _node: &Self::Node) -> Result<(), GraphError> {
        Err(GraphError::UnsupportedOperation("remove_incoming_edges"))
    }

    fn remove_outgoing_edges(&mut self, _node: &Self::Node) -> Result<(), GraphError> {
        Err(GraphError::UnsupportedOperation("remove_outgoing_edges"))
    }
}

/// Graphs where every edge carries labels, e.g., the kinds of a dependence.
/// An edge may carry several labels, like a definition reaching a field
/// write both as its base pointer and as the stored value. Views forward the
/// labels of the graph they wrap.
pub trait EdgeLabels: Graph {
    type Label: Clone + Debug;

    /// The distinct labels of the edge in insertion order. Empty when there
    /// is no edge between the nodes.
    fn edge_labels(&self, src: &Self::Node, dst: &Self::Node) -> Vec<Self::Label>;
}

/// A shared reference to a graph is a read-only graph. This is how views
/// borrow the graph they wrap instead of copying it.
impl<G: Graph + ?Sized> Graph for &G {
    type Node = G::Node;

    fn nodes(&self) -> Vec<Self::Node> {
        (**self).nodes()
    }

    fn node_count(&self) -> usize {
        (**self).node_count()
    }

    fn contains_node(&self, node: &Self::Node) -> bool {
        (**self).contains_node(node)
    }

    fn predecessors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        (**self).predecessors(node)
    }

    fn successors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        (**self).successors(node)
    }

    fn pred_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        (**self).pred_count(node)
    }

    fn succ_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        (**self).succ_count(node)
    }

    fn has_edge(&self, src: &Self::Node, dst: &Self::Node) -> bool {
        (**self).has_edge(src, dst)
    }
}

/// An exclusive reference to a graph forwards the mutations as well.
impl<G: Graph + ?Sized> Graph for &mut G {
    type Node = G::Node;

    fn nodes(&self) -> Vec<Self::Node> {
        (**self).nodes()
    }

    fn node_count(&self) -> usize {
        (**self).node_count()
    }

    fn contains_node(&self, node: &Self::Node) -> bool {
        (**self).contains_node(node)
    }

    fn predecessors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        (**self).predecessors(node)
    }

    fn successors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        (**self).successors(node)
    }

    fn pred_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        (**self).pred_count(node)
    }

    fn succ_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        (**self).succ_count(node)
    }

    fn has_edge(&self, src: &Self::Node, dst: &Self::Node) -> bool {
        (**self).has_edge(src, dst)
    }

    fn add_edge(&mut self, src: &Self::Node, dst: &Self::Node) -> Result<(), GraphError> {
        (**self).add_edge(src, dst)
    }

    fn remove_edge(&mut self, src: &Self::Node, dst: &Self::Node) -> Result<(), GraphError> {
        (**self).remove_edge(src, dst)
    }

    fn remove_all_incident_edges(&mut self, node: &Self::Node) -> Result<(), GraphError> {
        (**self).remove_all_incident_edges(node)
    }

    fn remove_incoming_edges(&mut self, node: &Self::Node) -> Result<(), GraphError> {
        (**self).remove_incoming_edges(node)
    }

    fn remove_outgoing_edges(&mut self, node: &Self::Node) -> Result<(), GraphError> {
        (**self).remove_outgoing_edges(node)
    }
}

impl<G: EdgeLabels + ?Sized> EdgeLabels for &G {
    type Label = G::Label;

    fn edge_labels(&self, src: &Self::Node, dst: &Self::Node) -> Vec<Self::Label> {
        (**self).edge_labels(src, dst)
    }
}

impl<G: EdgeLabels + ?Sized> EdgeLabels for &mut G {
    type Label = G::Label;

    fn edge_labels(&self, src: &Self::Node, dst: &Self::Node) -> Vec<Self::Label> {
        (**self).edge_labels(src, dst)
    }
}

///////////////
// Utilities //
///////////////

/// Checks that the successor and predecessor relations of a graph mirror
/// each other, that every reported neighbour is a node of the graph, and
/// that the counts and [`Graph::has_edge`] agree with the enumeration.
pub fn check_integrity<G: Graph>(graph: &G) -> Result<(), GraphError> {
    let nodes = graph.nodes();
    if nodes.len() != graph.node_count() {
        return Err(GraphError::Unsound(format!(
            "{} nodes enumerated, but the node count is {}",
            nodes.len(),
            graph.node_count()
        )));
    }

    for node in &nodes {
        if !graph.contains_node(node) {
            return Err(GraphError::Unsound(format!(
                "enumerated node {node:?} is not contained in the graph"
            )));
        }

        let succs = graph.successors(node)?;
        if succs.len() != graph.succ_count(node)? {
            return Err(GraphError::Unsound(format!(
                "successor count of {node:?} disagrees with its successors"
            )));
        }
        for succ in &succs {
            if !graph.contains_node(succ) {
                return Err(GraphError::Unsound(format!(
                    "successor {succ:?} of {node:?} is not part of the graph"
                )));
            }
            if !graph.has_edge(node, succ) || !graph.predecessors(succ)?.contains(node) {
                return Err(GraphError::Unsound(format!(
                    "edge {node:?} -> {succ:?} has no matching predecessor edge"
                )));
            }
        }

        let preds = graph.predecessors(node)?;
        if preds.len() != graph.pred_count(node)? {
            return Err(GraphError::Unsound(format!(
                "predecessor count of {node:?} disagrees with its predecessors"
            )));
        }
        for pred in &preds {
            if !graph.contains_node(pred) {
                return Err(GraphError::Unsound(format!(
                    "predecessor {pred:?} of {node:?} is not part of the graph"
                )));
            }
            if !graph.has_edge(pred, node) || !graph.successors(pred)?.contains(node) {
                return Err(GraphError::Unsound(format!(
                    "edge {pred:?} -> {node:?} has no matching successor edge"
                )));
            }
        }
    }
    Ok(())
}

/// Render a graph in the graphviz dot format. Nodes are numbered in the
/// order of [`Graph::nodes`]. Fails when the successors of a node cannot be
/// enumerated.
pub fn print_dot<G, NodePrinter>(graph: &G, printer: NodePrinter) -> Result<String, GraphError>
where
    G: Graph,
    NodePrinter: Fn(&G::Node) -> String,
{
    let nodes = graph.nodes();
    let numbering: HashMap<&G::Node, usize> =
        nodes.iter().enumerate().map(|(id, n)| (n, id)).collect();

    let mut output = "digraph G {\n".to_owned();
    for (counter, node) in nodes.iter().enumerate() {
        let label = printer(node).replace('"', "\\\"");
        output.push_str(&format!("  Node_{counter}[label=\"{label}\"]\n"));
    }
    output.push('\n');
    for (counter, node) in nodes.iter().enumerate() {
        for next in graph.successors(node)? {
            if let Some(next) = numbering.get(&next) {
                output.push_str(&format!("  Node_{counter} -> Node_{next}\n"));
            }
        }
    }
    output.push_str("}\n");
    Ok(output)
}

mod sparse;
pub use sparse::*;

mod views;
pub use views::*;
