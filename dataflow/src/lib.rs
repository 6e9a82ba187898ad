//! This crate contains the graph machinery to build whole-program static
//! analyses as [monotone dataflow frameworks](https://en.wikipedia.org/wiki/Data-flow_analysis)
//! over call graphs and dependence graphs.
//! The building blocks include a generic directed [graph](graph::Graph)
//! contract, zero-copy views that reshape a graph (inversion, self loops,
//! pruning), [lattice](https://en.wikipedia.org/wiki/Lattice_(order)) domains
//! with a bit vector lattice, a worklist based fixpoint solver, and a
//! dependence closure computation to produce
//! [program slices](https://en.wikipedia.org/wiki/Program_slicing).
//!
//! Views never copy edges, they borrow the graph they wrap. This makes it
//! possible to run a backward analysis with the forward solver by solving
//! over `invert(&graph)`, or to let the local facts of a node participate in
//! its own fixpoint by solving over `with_self_loops(invert(&graph))`.
//!
//! Look at the callgraph-lib crate for an example how to define analyses using
//! the helpers in this crate.
//!
//! Some resources to learn more about dataflow analysis and slicing:
//! * [Static Program Analysis, Anders Møller and Michael I. Schwartzbach](https://cs.au.dk/~amoeller/spa/)
//! * [Data Flow Analysis: Theory and Practice](https://www.amazon.com/Data-Flow-Analysis-Theory-Practice/dp/0849328802)
//! * [Interprocedural slicing using dependence graphs](https://dl.acm.org/doi/10.1145/77606.77608)
//!
//! Other libraries to help implement static analysis tools:
//! * [WALA](https://github.com/wala/WALA)
//! * [SPARTA](https://github.com/facebook/SPARTA)
//! * [PHASAR](https://phasar.org/)

/// Trait for defining a directed graph, views to reshape graphs without
/// copying them, and some utilities like integrity checking and printing.
pub mod graph;

/// Join semi-lattices and lattices, most importantly the bit set lattice
/// used by the bit vector frameworks.
pub mod domains;

/// Monotone fixed-point iteration over graphs using worklists.
pub mod solvers;

/// Bit vector frameworks: a value universe mapped to bit positions, and a
/// closed family of monotone bit vector transfer functions.
pub mod bitvector;

/// Reachability closure over dependence graphs with edge kind policies.
pub mod slicer;


#[cfg(test)]
mod solvers_tests;
