use core::fmt::Display;

use dataflow::graph::{Graph, GraphError, LabeledGraph, Pruned, print_dot};
use dataflow::slicer::{
    DependenceKind, Direction, Slice, SliceError, SlicePolicy, closure, prune_to_slice,
    sanity_check,
};
use log::{debug, info};
use thiserror::Error;

use crate::call_graph::{CallGraph, CgNode};

/// What a statement of the system dependence graph represents. Parameter
/// and return statements model the flow of values across calls, the heap
/// variants model the flow through a heap location.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// An instruction of the method. Invocations carry the name of the
    /// declared target.
    Normal {
        instruction: String,
        call: Option<String>,
    },
    Phi {
        value: usize,
    },
    ParamCaller {
        value: usize,
        call: String,
    },
    ParamCallee {
        value: usize,
    },
    NormalRetCaller {
        call: String,
    },
    NormalRetCallee,
    ExcRetCaller {
        call: String,
    },
    ExcRetCallee,
    HeapParamCaller {
        location: String,
    },
    HeapParamCallee {
        location: String,
    },
    HeapRetCaller {
        location: String,
    },
    HeapRetCallee {
        location: String,
    },
    MethodEntry,
    MethodExit,
}

impl StatementKind {
    pub fn name(&self) -> &'static str {
        match self {
            StatementKind::Normal { .. } => "NORMAL",
            StatementKind::Phi { .. } => "PHI",
            StatementKind::ParamCaller { .. } => "PARAM_CALLER",
            StatementKind::ParamCallee { .. } => "PARAM_CALLEE",
            StatementKind::NormalRetCaller { .. } => "NORMAL_RET_CALLER",
            StatementKind::NormalRetCallee => "NORMAL_RET_CALLEE",
            StatementKind::ExcRetCaller { .. } => "EXC_RET_CALLER",
            StatementKind::ExcRetCallee => "EXC_RET_CALLEE",
            StatementKind::HeapParamCaller { .. } => "HEAP_PARAM_CALLER",
            StatementKind::HeapParamCallee { .. } => "HEAP_PARAM_CALLEE",
            StatementKind::HeapRetCaller { .. } => "HEAP_RET_CALLER",
            StatementKind::HeapRetCallee { .. } => "HEAP_RET_CALLEE",
            StatementKind::MethodEntry => "METHOD_ENTRY",
            StatementKind::MethodExit => "METHOD_EXIT",
        }
    }
}

/// A statement of a call graph node. The index is the position of the
/// instruction in the method. The caller side statements of a call share the
/// index of the invocation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Statement {
    pub node: CgNode,
    pub index: usize,
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(node: CgNode, index: usize, kind: StatementKind) -> Self {
        Self { node, index, kind }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{} {}", self.node, self.index, self.kind.name())
    }
}

/// Statements connected by data and control dependences. The edges go from
/// the definition (or the controlling statement) to the dependent statement.
pub type SystemDependenceGraph = LabeledGraph<Statement, DependenceKind>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SdgError {
    #[error("no method named `{0}` in the call graph")]
    MethodNotFound(String),
    #[error("no call to `{callee}` in {caller}")]
    CallNotFound { caller: CgNode, callee: String },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Slice(#[from] SliceError),
}

/// The first invocation of `callee` among the statements of `caller`.
pub fn find_call_to(sdg: &SystemDependenceGraph, caller: CgNode, callee: &str) -> Option<Statement> {
    sdg.nodes()
        .into_iter()
        .filter(|s| s.node == caller)
        .filter(|s| match &s.kind {
            StatementKind::Normal {
                call: Some(target), ..
            } => target == callee,
            _ => false,
        })
        .min_by_key(|s| s.index)
}

/// Forward slices from a call start at the value returned by the call, not
/// at the invocation itself. Other statements are returned unchanged.
pub fn return_statement_for_call(statement: &Statement) -> Statement {
    match &statement.kind {
        StatementKind::Normal {
            call: Some(target), ..
        } => Statement::new(
            statement.node,
            statement.index,
            StatementKind::NormalRetCaller {
                call: target.clone(),
            },
        ),
        _ => statement.clone(),
    }
}

/// The statements the seed depends on.
pub fn compute_backward_slice(
    sdg: &SystemDependenceGraph,
    seed: &Statement,
    policy: &SlicePolicy,
) -> Result<Slice<Statement>, GraphError> {
    closure(sdg, core::slice::from_ref(seed), Direction::Backward, policy)
}

/// The statements affected by the seed. A call is replaced by its normal
/// return statement before slicing.
pub fn compute_forward_slice(
    sdg: &SystemDependenceGraph,
    seed: &Statement,
    policy: &SlicePolicy,
) -> Result<Slice<Statement>, GraphError> {
    let seed = return_statement_for_call(seed);
    closure(sdg, &[seed], Direction::Forward, policy)
}

/// The dependence graph restricted to the statements of the slice.
pub fn prune_sdg<'a>(
    sdg: &'a SystemDependenceGraph,
    slice: &'a Slice<Statement>,
) -> Pruned<&'a SystemDependenceGraph, impl Fn(&Statement) -> bool + 'a> {
    prune_to_slice(sdg, slice)
}

/// The text of a statement in the rendered graph. Lines are separated by the
/// DOT line break escape.
pub fn statement_label(call_graph: &CallGraph, statement: &Statement) -> String {
    let method = call_graph.method(statement.node).unwrap_or("?");
    let kind = statement.kind.name();
    match &statement.kind {
        StatementKind::HeapParamCaller { location }
        | StatementKind::HeapParamCallee { location }
        | StatementKind::HeapRetCaller { location }
        | StatementKind::HeapRetCallee { location } => {
            format!("{kind}\\n{}\\n{location}", statement.node)
        }
        StatementKind::Normal { instruction, .. } => format!("{instruction}\\n{method}"),
        StatementKind::ParamCaller { value, call } => format!("{kind} {value}\\n{method}\\n{call}"),
        StatementKind::ParamCallee { value } => format!("{kind} {value}\\n{method}"),
        StatementKind::Phi { .. }
        | StatementKind::NormalRetCaller { .. }
        | StatementKind::NormalRetCallee
        | StatementKind::ExcRetCaller { .. }
        | StatementKind::ExcRetCallee
        | StatementKind::MethodEntry
        | StatementKind::MethodExit => statement.to_string(),
    }
}

/// Slice the dependence graph starting at the call from one method to
/// another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceRequest {
    pub caller: String,
    pub callee: String,
    pub direction: Direction,
    pub policy: SlicePolicy,
}

/// A checked slice and its rendering.
#[derive(Clone, Debug)]
pub struct SliceResult {
    pub seed: Statement,
    pub slice: Slice<Statement>,
    pub dot: String,
}

impl SliceRequest {
    pub fn new(caller: impl Into<String>, callee: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            callee: callee.into(),
            direction: Direction::default(),
            policy: SlicePolicy::default(),
        }
    }

    pub fn run(
        &self,
        call_graph: &CallGraph,
        sdg: &SystemDependenceGraph,
    ) -> Result<SliceResult, SdgError> {
        let caller = call_graph
            .find_method(&self.caller)
            .ok_or_else(|| SdgError::MethodNotFound(self.caller.clone()))?;
        let seed = find_call_to(sdg, caller, &self.callee).ok_or_else(|| {
            SdgError::CallNotFound {
                caller,
                callee: self.callee.clone(),
            }
        })?;
        info!("Statement: {seed}");

        let slice = match self.direction {
            Direction::Backward => compute_backward_slice(sdg, &seed, &self.policy)?,
            Direction::Forward => compute_forward_slice(sdg, &seed, &self.policy)?,
        };
        for statement in &slice {
            debug!("{statement}");
        }

        // The pruned view borrows the slice until it is rendered.
        let dot = {
            let pruned = prune_sdg(sdg, &slice);
            sanity_check(&slice, &pruned)?;
            print_dot(&pruned, |s| statement_label(call_graph, s))?
        };
        Ok(SliceResult { seed, slice, dot })
    }
}
