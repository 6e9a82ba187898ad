use core::fmt::Display;

use dataflow::graph::{Graph, GraphError, SparseGraph};

/// A node of the call graph: one method analyzed in one context. The same
/// method may have several nodes when the call graph is context sensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CgNode(pub usize);

impl Display for CgNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CG node {}", self.0)
    }
}

/// A call graph with an edge from every caller to each of its callees.
#[derive(Clone, Debug, Default)]
pub struct CallGraph {
    graph: SparseGraph<CgNode>,
    methods: Vec<String>,
    entrypoints: Vec<CgNode>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh node for the method.
    pub fn add_node(&mut self, method: impl Into<String>) -> CgNode {
        let node = CgNode(self.methods.len());
        self.methods.push(method.into());
        self.graph.add_node(node);
        node
    }

    pub fn add_call(&mut self, caller: CgNode, callee: CgNode) -> Result<(), GraphError> {
        self.graph.add_edge(&caller, &callee)
    }

    pub fn add_entrypoint(&mut self, node: CgNode) -> Result<(), GraphError> {
        if !self.contains_node(&node) {
            return Err(GraphError::invalid_node(&node));
        }
        if !self.entrypoints.contains(&node) {
            self.entrypoints.push(node);
        }
        Ok(())
    }

    pub fn entrypoints(&self) -> &[CgNode] {
        &self.entrypoints
    }

    pub fn method(&self, node: CgNode) -> Option<&str> {
        self.methods.get(node.0).map(String::as_str)
    }

    /// The first node created for a method with the given name.
    pub fn find_method(&self, name: &str) -> Option<CgNode> {
        self.methods
            .iter()
            .position(|method| method == name)
            .map(CgNode)
    }
}

impl Graph for CallGraph {
    type Node = CgNode;

    fn nodes(&self) -> Vec<CgNode> {
        self.graph.nodes()
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn contains_node(&self, node: &CgNode) -> bool {
        self.graph.contains_node(node)
    }

    fn predecessors(&self, node: &CgNode) -> Result<Vec<CgNode>, GraphError> {
        self.graph.predecessors(node)
    }

    fn successors(&self, node: &CgNode) -> Result<Vec<CgNode>, GraphError> {
        self.graph.successors(node)
    }

    fn has_edge(&self, src: &CgNode, dst: &CgNode) -> bool {
        self.graph.has_edge(src, dst)
    }

    fn add_edge(&mut self, src: &CgNode, dst: &CgNode) -> Result<(), GraphError> {
        self.graph.add_edge(src, dst)
    }

    fn remove_edge(&mut self, src: &CgNode, dst: &CgNode) -> Result<(), GraphError> {
        self.graph.remove_edge(src, dst)
    }

    fn remove_all_incident_edges(&mut self, node: &CgNode) -> Result<(), GraphError> {
        self.graph.remove_all_incident_edges(node)
    }

    fn remove_incoming_edges(&mut self, node: &CgNode) -> Result<(), GraphError> {
        self.graph.remove_incoming_edges(node)
    }

    fn remove_outgoing_edges(&mut self, node: &CgNode) -> Result<(), GraphError> {
        self.graph.remove_outgoing_edges(node)
    }
}
