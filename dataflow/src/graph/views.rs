use super::{EdgeLabels, Graph, GraphError};

/// A view that reverses the edges of a graph. Both the queries and the
/// mutations are transposed, and the view has no edge storage of its own,
/// so mutations through the view are visible in the wrapped graph and vice
/// versa. Wrap a `&mut G` to mutate through the view.
///
/// This is how a backward analysis can reuse a forward solver unchanged.
#[derive(Clone, Copy, Debug)]
pub struct Inverted<G>(G);

pub fn invert<G: Graph>(graph: G) -> Inverted<G> {
    Inverted(graph)
}

impl<G> Inverted<G> {
    pub fn inner(&self) -> &G {
        &self.0
    }

    pub fn into_inner(self) -> G {
        self.0
    }
}

impl<G: Graph> Graph for Inverted<G> {
    type Node = G::Node;

    fn nodes(&self) -> Vec<Self::Node> {
        self.0.nodes()
    }

    fn node_count(&self) -> usize {
        self.0.node_count()
    }

    fn contains_node(&self, node: &Self::Node) -> bool {
        self.0.contains_node(node)
    }

    fn predecessors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        self.0.successors(node)
    }

    fn successors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        self.0.predecessors(node)
    }

    fn pred_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        self.0.succ_count(node)
    }

    fn succ_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        self.0.pred_count(node)
    }

    fn has_edge(&self, src: &Self::Node, dst: &Self::Node) -> bool {
        self.0.has_edge(dst, src)
    }

    fn add_edge(&mut self, src: &Self::Node, dst: &Self::Node) -> Result<(), GraphError> {
        self.0.add_edge(dst, src)
    }

    fn remove_edge(&mut self, src: &Self::Node, dst: &Self::Node) -> Result<(), GraphError> {
        self.0.remove_edge(dst, src)
    }

    fn remove_all_incident_edges(&mut self, node: &Self::Node) -> Result<(), GraphError> {
        self.0.remove_all_incident_edges(node)
    }

    fn remove_incoming_edges(&mut self, node: &Self::Node) -> Result<(), GraphError> {
        self.0.remove_outgoing_edges(node)
    }

    fn remove_outgoing_edges(&mut self, node: &Self::Node) -> Result<(), GraphError> {
        self.0.remove_incoming_edges(node)
    }
}

impl<G: EdgeLabels> EdgeLabels for Inverted<G> {
    type Label = G::Label;

    fn edge_labels(&self, src: &Self::Node, dst: &Self::Node) -> Vec<Self::Label> {
        self.0.edge_labels(dst, src)
    }
}

/// A read-only view where every node is its own successor and predecessor
/// in addition to the edges of the wrapped graph. Solving over this view
/// lets the local facts of a node participate in its own fixpoint.
///
/// Neighbours are reported as sets: the node itself is appended after the
/// neighbours of the wrapped graph unless it is already one of them.
#[derive(Clone, Copy, Debug)]
pub struct SelfLoops<G>(G);

pub fn with_self_loops<G: Graph>(graph: G) -> SelfLoops<G> {
    SelfLoops(graph)
}

impl<G> SelfLoops<G> {
    pub fn inner(&self) -> &G {
        &self.0
    }
}

fn add_self<N: PartialEq + Clone>(mut neighbours: Vec<N>, node: &N) -> Vec<N> {
    if !neighbours.contains(node) {
        neighbours.push(node.clone());
    }
    neighbours
}

impl<G: Graph> Graph for SelfLoops<G> {
    type Node = G::Node;

    fn nodes(&self) -> Vec<Self::Node> {
        self.0.nodes()
    }

    fn node_count(&self) -> usize {
        self.0.node_count()
    }

    fn contains_node(&self, node: &Self::Node) -> bool {
        self.0.contains_node(node)
    }

    fn predecessors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        Ok(add_self(self.0.predecessors(node)?, node))
    }

    fn successors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        Ok(add_self(self.0.successors(node)?, node))
    }

    fn pred_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        let count = self.0.pred_count(node)?;
        Ok(if self.0.has_edge(node, node) { count } else { count + 1 })
    }

    fn succ_count(&self, node: &Self::Node) -> Result<usize, GraphError> {
        let count = self.0.succ_count(node)?;
        Ok(if self.0.has_edge(node, node) { count } else { count + 1 })
    }

    fn has_edge(&self, src: &Self::Node, dst: &Self::Node) -> bool {
        if src == dst {
            self.0.contains_node(src)
        } else {
            self.0.has_edge(src, dst)
        }
    }
}

/// Only the edges of the wrapped graph are labeled, the added self loops
/// have no label unless the wrapped graph already had them.
impl<G: EdgeLabels> EdgeLabels for SelfLoops<G> {
    type Label = G::Label;

    fn edge_labels(&self, src: &Self::Node, dst: &Self::Node) -> Vec<Self::Label> {
        self.0.edge_labels(src, dst)
    }
}

/// A read-only view of the subgraph induced by the nodes satisfying a
/// predicate. An edge survives iff both of its endpoints are included.
///
/// Querying the neighbours of a node of the wrapped graph that is excluded
/// by the predicate is permitted and yields no neighbours. Nodes that are not
/// part of the wrapped graph at all are rejected with
/// [`GraphError::InvalidNode`].
#[derive(Clone, Copy, Debug)]
pub struct Pruned<G, P> {
    graph: G,
    predicate: P,
}

pub fn prune<G, P>(graph: G, predicate: P) -> Pruned<G, P>
where
    G: Graph,
    P: Fn(&G::Node) -> bool,
{
    Pruned { graph, predicate }
}

impl<G: Graph, P: Fn(&G::Node) -> bool> Pruned<G, P> {
    pub fn inner(&self) -> &G {
        &self.graph
    }

    fn filter(&self, node: &G::Node, neighbours: Vec<G::Node>) -> Vec<G::Node> {
        if !(self.predicate)(node) {
            return Vec::new();
        }
        neighbours
            .into_iter()
            .filter(|n| (self.predicate)(n))
            .collect()
    }
}

impl<G: Graph, P: Fn(&G::Node) -> bool> Graph for Pruned<G, P> {
    type Node = G::Node;

    fn nodes(&self) -> Vec<Self::Node> {
        self.graph
            .nodes()
            .into_iter()
            .filter(|n| (self.predicate)(n))
            .collect()
    }

    fn contains_node(&self, node: &Self::Node) -> bool {
        (self.predicate)(node) && self.graph.contains_node(node)
    }

    fn predecessors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        Ok(self.filter(node, self.graph.predecessors(node)?))
    }

    fn successors(&self, node: &Self::Node) -> Result<Vec<Self::Node>, GraphError> {
        Ok(self.filter(node, self.graph.successors(node)?))
    }

    fn has_edge(&self, src: &Self::Node, dst: &Self::Node) -> bool {
        (self.predicate)(src) && (self.predicate)(dst) && self.graph.has_edge(src, dst)
    }
}

impl<G: EdgeLabels, P: Fn(&G::Node) -> bool> EdgeLabels for Pruned<G, P> {
    type Label = G::Label;

    fn edge_labels(&self, src: &Self::Node, dst: &Self::Node) -> Vec<Self::Label> {
        if (self.predicate)(src) && (self.predicate)(dst) {
            self.graph.edge_labels(src, dst)
        } else {
            Vec::new()
        }
    }
}
