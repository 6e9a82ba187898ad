//! Clients of the dataflow engine working on whole programs: an exception
//! flow analysis over call graphs and a slicer over system dependence
//! graphs. Building call graphs and dependence graphs from source code is
//! the job of an upstream builder, this crate only consumes them.

pub mod call_graph;
pub mod exceptions;
pub mod sdg;



#[cfg(test)]
mod sdg_tests;
