use core::fmt::Display;
use core::hash::Hash;
use core::str::FromStr;
use std::collections::{HashSet, VecDeque};

use log::debug;
use thiserror::Error;

use super::graph::{EdgeLabels, Graph, GraphError, Pruned, check_integrity, invert, prune};

/// The closed set of dependence edge kinds in a dependence graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependenceKind {
    Control,
    /// Flow of a value from its definition to a use.
    Value,
    /// Flow into the base pointer of a field or array access.
    BasePointer,
    /// Flow through heap locations between heap parameter statements.
    Heap,
    /// Flow introduced by a checked cast.
    Cast,
    /// Flow of thrown exception objects.
    Exception,
}

impl DependenceKind {
    pub fn is_data(&self) -> bool {
        !matches!(self, DependenceKind::Control)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown {kind} option `{value}`")]
pub struct OptionParseError {
    kind: &'static str,
    value: String,
}

/// Which data dependences participate in a slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataDependenceOptions {
    #[default]
    Full,
    NoBasePtrs,
    NoBaseNoHeap,
    NoHeap,
    NoBaseNoHeapNoCast,
    NoExceptions,
    None,
}

impl DataDependenceOptions {
    const NAMES: [(&'static str, Self); 7] = [
        ("full", Self::Full),
        ("no_base_ptrs", Self::NoBasePtrs),
        ("no_base_no_heap", Self::NoBaseNoHeap),
        ("no_heap", Self::NoHeap),
        ("no_base_no_heap_no_cast", Self::NoBaseNoHeapNoCast),
        ("no_exceptions", Self::NoExceptions),
        ("none", Self::None),
    ];

    pub fn includes(&self, kind: DependenceKind) -> bool {
        use DataDependenceOptions as O;
        use DependenceKind as K;
        match kind {
            K::Control => false,
            K::Value => !matches!(self, O::None),
            K::BasePointer => matches!(self, O::Full | O::NoHeap | O::NoExceptions),
            K::Heap => matches!(self, O::Full | O::NoBasePtrs | O::NoExceptions),
            K::Cast => !matches!(self, O::NoBaseNoHeapNoCast | O::None),
            K::Exception => !matches!(self, O::NoExceptions | O::None),
        }
    }
}

/// Whether control dependences participate in a slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControlDependenceOptions {
    #[default]
    Full,
    None,
}

impl ControlDependenceOptions {
    const NAMES: [(&'static str, Self); 2] = [("full", Self::Full), ("none", Self::None)];

    pub fn includes(&self, kind: DependenceKind) -> bool {
        kind == DependenceKind::Control && *self == ControlDependenceOptions::Full
    }
}

/// Option spellings are accepted with or without a leading dash, e.g.,
/// `-no_base_ptrs` or `no_base_ptrs`.
fn parse_option<T: Copy>(
    names: &[(&'static str, T)],
    kind: &'static str,
    s: &str,
) -> Result<T, OptionParseError> {
    let name = s.strip_prefix('-').unwrap_or(s);
    names
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|&(_, value)| value)
        .ok_or_else(|| OptionParseError {
            kind,
            value: s.to_owned(),
        })
}

fn option_name<T: PartialEq>(names: &[(&'static str, T)], value: &T) -> &'static str {
    names
        .iter()
        .find(|(_, candidate)| candidate == value)
        .map_or("?", |&(name, _)| name)
}

impl FromStr for DataDependenceOptions {
    type Err = OptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_option(&Self::NAMES, "data dependence", s)
    }
}

impl Display for DataDependenceOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", option_name(&Self::NAMES, self))
    }
}

impl FromStr for ControlDependenceOptions {
    type Err = OptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_option(&Self::NAMES, "control dependence", s)
    }
}

impl Display for ControlDependenceOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", option_name(&Self::NAMES, self))
    }
}

/// Selects the dependence edges a closure may follow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SlicePolicy {
    pub data: DataDependenceOptions,
    pub control: ControlDependenceOptions,
}

impl SlicePolicy {
    pub fn new(data: DataDependenceOptions, control: ControlDependenceOptions) -> Self {
        Self { data, control }
    }

    pub fn accepts(&self, kind: DependenceKind) -> bool {
        self.data.includes(kind) || self.control.includes(kind)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Follow successor edges: what is affected by the seeds.
    Forward,
    /// Follow predecessor edges: what the seeds depend on.
    #[default]
    Backward,
}

impl Direction {
    const NAMES: [(&'static str, Self); 2] =
        [("forward", Self::Forward), ("backward", Self::Backward)];
}

impl FromStr for Direction {
    type Err = OptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_option(&Self::NAMES, "direction", s)
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", option_name(&Self::NAMES, self))
    }
}

/// A set of nodes remembering the order of insertion.
#[derive(Clone, Debug)]
pub struct Slice<N> {
    order: Vec<N>,
    members: HashSet<N>,
}

impl<N> Default for Slice<N> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            members: HashSet::new(),
        }
    }
}

impl<N: Clone + Eq + Hash> Slice<N> {
    /// Returns false when the node was already part of the slice.
    pub fn insert(&mut self, node: N) -> bool {
        if !self.members.insert(node.clone()) {
            return false;
        }
        self.order.push(node);
        true
    }

    pub fn contains(&self, node: &N) -> bool {
        self.members.contains(node)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, N> {
        self.order.iter()
    }

    pub fn into_vec(self) -> Vec<N> {
        self.order
    }
}

impl<'a, N> IntoIterator for &'a Slice<N> {
    type Item = &'a N;
    type IntoIter = core::slice::Iter<'a, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

/// Computes the set of nodes reachable from the seeds through the edges
/// with at least one kind accepted by the policy. Nodes are visited breadth first,
/// in the order of the seeds and then in neighbour order, and the slice
/// remembers this order. A backward closure runs the same traversal over
/// the inverted graph.
///
/// Seeds that are not part of the graph are rejected with
/// [`GraphError::InvalidNode`]. Any re-seeding (e.g., slicing forward from
/// the return value of a call instead of the call itself) is up to the
/// caller.
pub fn closure<G>(
    graph: &G,
    seeds: &[G::Node],
    direction: Direction,
    policy: &SlicePolicy,
) -> Result<Slice<G::Node>, GraphError>
where
    G: EdgeLabels<Label = DependenceKind>,
{
    debug!(
        "Computing {direction} closure from {} seeds, data: {}, control: {}.",
        seeds.len(),
        policy.data,
        policy.control
    );
    let slice = match direction {
        Direction::Forward => reachable(graph, seeds, policy)?,
        Direction::Backward => reachable(&invert(graph), seeds, policy)?,
    };
    debug!("Closure has {} nodes.", slice.len());
    Ok(slice)
}

fn reachable<G>(
    graph: &G,
    seeds: &[G::Node],
    policy: &SlicePolicy,
) -> Result<Slice<G::Node>, GraphError>
where
    G: EdgeLabels<Label = DependenceKind>,
{
    let mut slice = Slice::default();
    let mut queue = VecDeque::new();
    for seed in seeds {
        if !graph.contains_node(seed) {
            return Err(GraphError::invalid_node(seed));
        }
        if slice.insert(seed.clone()) {
            queue.push_back(seed.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        for next in graph.successors(&current)? {
            let followed = graph
                .edge_labels(&current, &next)
                .into_iter()
                .any(|kind| policy.accepts(kind));
            if followed && slice.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }
    Ok(slice)
}

/// A read-only view of the graph induced by the nodes of a slice.
pub fn prune_to_slice<G: Graph>(
    graph: G,
    slice: &Slice<G::Node>,
) -> Pruned<G, impl Fn(&G::Node) -> bool + '_> {
    prune(graph, move |node: &G::Node| slice.contains(node))
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SliceError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("the pruned graph has {nodes} nodes, but the slice has {slice}")]
    SizeMismatch { nodes: usize, slice: usize },
}

/// Checks that the graph is well-formed and has exactly one node per
/// element of the slice.
pub fn sanity_check<G: Graph>(slice: &Slice<G::Node>, graph: &G) -> Result<(), SliceError> {
    check_integrity(graph)?;
    if graph.node_count() != slice.len() {
        return Err(SliceError::SizeMismatch {
            nodes: graph.node_count(),
            slice: slice.len(),
        });
    }
    Ok(())
}
