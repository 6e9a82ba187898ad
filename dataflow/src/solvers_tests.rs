use core::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::bitvector::{BitVectorFunction, BitVectorProblem, BitVectorTransferProvider};
use crate::domains::{BitSet, BitSetTop, JoinSemiLattice};
use crate::graph::*;
use crate::solvers::*;

const ORDERS: [WorklistOrder; 3] = [
    WorklistOrder::Fifo,
    WorklistOrder::Lifo,
    WorklistOrder::ReversePostOrder,
];

fn tangled() -> SparseGraph<u32> {
    //   0 -> 1 -> 2 -> 3 -> 4
    //        ^    |    ^    |
    //        +----+    +----+
    //   5 -> 6 -> 2,   6 -> 6,   7 (isolated)
    let mut graph = SparseGraph::new();
    graph
        .connect(0, 1)
        .connect(1, 2)
        .connect(2, 1)
        .connect(2, 3)
        .connect(3, 4)
        .connect(4, 3)
        .connect(5, 6)
        .connect(6, 2)
        .connect(6, 6);
    graph.add_node(7);
    graph
}

/// Node `n` generates the fact `n % 3`, edges out of even nodes drop the
/// fact 0.
struct ModuloFacts {
    ctx: BitSetTop,
}

impl BitVectorTransferProvider<u32> for ModuloFacts {
    fn edge_function(&self, pred: &u32, _succ: &u32) -> BitVectorFunction {
        if pred % 2 == 0 {
            BitVectorFunction::KillGen {
                kill: BitSet::from(&self.ctx, &[0]),
                generate: BitSet::bottom(&self.ctx),
            }
        } else {
            BitVectorFunction::Identity
        }
    }

    fn local_value(&self, node: &u32) -> Option<BitSet> {
        Some(BitSet::from(&self.ctx, &[(node % 3) as usize]))
    }
}

#[test]
fn reachability_over_bool() -> Result<(), SolverError> {
    //     0
    //    / \
    //   1   2      3 -> 4
    let mut graph = SparseGraph::<u32>::new();
    graph.connect(0, 1).connect(0, 2).connect(3, 4);
    let looped = with_self_loops(&graph);
    let transfer = EdgeTransfer::new(|pred: &u32, succ: &u32, input: &bool, _: &()| {
        *input || (pred == succ && *succ == 0)
    });

    let solution = WorklistSolver::default().solve(&looped, &(), &transfer, &CancelToken::new())?;
    assert_eq!(solution.len(), 5);
    assert!(*solution.get_in(&0)?);
    assert!(*solution.get_in(&1)?);
    assert!(*solution.get_in(&2)?);
    assert!(!*solution.get_in(&3)?);
    assert!(!*solution.get_in(&4)?);
    Ok(())
}

#[test]
fn fifo_worklist_iterations() -> Result<(), SolverError> {
    // A -> B -> C
    let mut graph = SparseGraph::new();
    graph.connect('A', 'B').connect('B', 'C');
    let looped = with_self_loops(&graph);
    let transfer = EdgeTransfer::new(|pred: &char, succ: &char, input: &bool, _: &()| {
        *input || (pred == succ && *succ == 'A')
    });

    let solution = WorklistSolver::new(WorklistOrder::Fifo).solve(
        &looped,
        &(),
        &transfer,
        &CancelToken::new(),
    )?;
    // Every node changes once and is reevaluated once through its self loop.
    assert_eq!(solution.iterations(), 6);
    assert!(solution.iter().all(|(_, &reached)| reached));
    Ok(())
}

#[test]
fn fixpoint_determinism() -> Result<(), SolverError> {
    let graph = tangled();
    let ctx = BitSetTop(3);
    let provider = ModuloFacts { ctx };
    let problem = BitVectorProblem::new(&provider);
    let looped = with_self_loops(&graph);

    let mut results = Vec::new();
    for order in ORDERS {
        let solution = WorklistSolver::new(order).solve(&looped, &ctx, &problem, &CancelToken::new())?;
        results.push(solution.into_map());
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], results[2]);

    let fixpoint = &results[0];
    assert_eq!(fixpoint[&0], BitSet::from(&ctx, &[0]));
    assert_eq!(fixpoint[&1], BitSet::from(&ctx, &[1, 2]));
    assert_eq!(fixpoint[&7], BitSet::from(&ctx, &[1]));
    assert_eq!(fixpoint[&6], BitSet::from(&ctx, &[0, 2]));
    assert_eq!(fixpoint[&3], BitSet::from(&ctx, &[0, 1, 2]));

    // The result is stable under one more application of every transfer function.
    for node in looped.nodes() {
        let mut value = BitSet::bottom(&ctx);
        for pred in looped.predecessors(&node)? {
            value.union_with(&provider.transfer_function(&pred, &node).apply(&fixpoint[&pred]));
        }
        assert_eq!(value, fixpoint[&node]);
    }
    Ok(())
}

/// Remembers every value that flowed out of a node.
struct Recording<'a> {
    inner: BitVectorProblem<'a, ModuloFacts>,
    seen: RefCell<HashMap<u32, Vec<BitSet>>>,
}

impl TransferFunctionProvider<u32, BitSet> for Recording<'_> {
    fn transfer(&self, pred: &u32, succ: &u32, input: &BitSet, ctx: &BitSetTop) -> BitSet {
        self.seen
            .borrow_mut()
            .entry(*pred)
            .or_default()
            .push(input.clone());
        self.inner.transfer(pred, succ, input, ctx)
    }
}

#[test]
fn fixpoint_monotonicity() -> Result<(), SolverError> {
    let graph = tangled();
    let ctx = BitSetTop(3);
    let provider = ModuloFacts { ctx };
    for order in ORDERS {
        let recording = Recording {
            inner: BitVectorProblem::new(&provider),
            seen: RefCell::new(HashMap::new()),
        };
        WorklistSolver::new(order).solve(
            &with_self_loops(&graph),
            &ctx,
            &recording,
            &CancelToken::new(),
        )?;
        for values in recording.seen.borrow().values() {
            assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }
    Ok(())
}

#[test]
fn unknown_nodes() -> Result<(), SolverError> {
    let graph = tangled();
    let ctx = BitSetTop(3);
    let provider = ModuloFacts { ctx };
    let solution = WorklistSolver::default().solve(
        &graph,
        &ctx,
        &BitVectorProblem::new(&provider),
        &CancelToken::new(),
    )?;
    assert_eq!(
        solution.get_in(&42),
        Err(SolverError::UnknownNode("42".to_owned()))
    );

    let pruned = prune(&graph, |&n| n < 5);
    let solution = WorklistSolver::default().solve(
        &pruned,
        &ctx,
        &BitVectorProblem::new(&provider),
        &CancelToken::new(),
    )?;
    assert_eq!(solution.len(), 5);
    assert!(solution.get_in(&4).is_ok());
    assert!(matches!(
        solution.get_in(&6),
        Err(SolverError::UnknownNode(_))
    ));
    Ok(())
}

#[test]
fn cancelled_before_first_iteration() {
    let graph = tangled();
    let ctx = BitSetTop(3);
    let provider = ModuloFacts { ctx };
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = WorklistSolver::default().solve(
        &with_self_loops(&graph),
        &ctx,
        &BitVectorProblem::new(&provider),
        &cancel,
    );
    assert!(matches!(result, Err(SolverError::Cancelled)));

    let empty = SparseGraph::<u32>::new();
    let result = WorklistSolver::default().solve(
        &empty,
        &ctx,
        &BitVectorProblem::new(&provider),
        &cancel,
    );
    assert!(matches!(result, Err(SolverError::Cancelled)));
}

#[test]
fn cancelled_mid_solve() {
    let graph = tangled();
    let cancel = CancelToken::new();
    let calls = Cell::new(0);
    let transfer = EdgeTransfer::new(|_: &u32, _: &u32, _: &bool, _: &()| {
        calls.set(calls.get() + 1);
        if calls.get() == 3 {
            cancel.cancel();
        }
        true
    });
    let result = WorklistSolver::default().solve(&graph, &(), &transfer, &cancel);
    assert_eq!(result.map(|s| s.len()), Err(SolverError::Cancelled));
}

#[test]
fn neighbours_outside_the_graph() {
    // Reports a successor that is not one of its nodes.
    struct Dangling;

    impl Graph for Dangling {
        type Node = u8;

        fn nodes(&self) -> Vec<u8> {
            vec![0]
        }

        fn contains_node(&self, node: &u8) -> bool {
            *node == 0
        }

        fn predecessors(&self, _node: &u8) -> Result<Vec<u8>, GraphError> {
            Ok(vec![])
        }

        fn successors(&self, _node: &u8) -> Result<Vec<u8>, GraphError> {
            Ok(vec![9])
        }

        fn has_edge(&self, src: &u8, dst: &u8) -> bool {
            *src == 0 && *dst == 9
        }
    }

    let transfer = EdgeTransfer::new(|_: &u8, _: &u8, input: &bool, _: &()| *input);
    let result = WorklistSolver::default().solve(&Dangling, &(), &transfer, &CancelToken::new());
    assert_eq!(
        result.map(|s| s.len()),
        Err(SolverError::Graph(GraphError::InvalidNode("9".to_owned())))
    );
}

#[test]
fn test_rpo_order() {
    //     0
    //    / \
    //   1   2
    //   |   |
    //   |   3
    //    \ /
    //     4
    let succs = vec![vec![1, 2], vec![4], vec![3], vec![4], vec![]];
    let order = reverse_post_order(&succs);
    assert_eq!(order, vec![0, 3, 1, 2, 4]);

    // Nodes only reachable through a cycle still get a position.
    let succs = vec![vec![1], vec![0], vec![]];
    let order = reverse_post_order(&succs);
    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn worklist_deduplicates() {
    let succs = vec![vec![1, 2], vec![4], vec![3], vec![4], vec![]];
    for (order, expected) in [
        (WorklistOrder::Fifo, vec![3, 0, 4]),
        (WorklistOrder::Lifo, vec![4, 0, 3]),
        (WorklistOrder::ReversePostOrder, vec![0, 3, 4]),
    ] {
        let mut worklist = Worklist::new(order, &succs);
        assert!(worklist.is_empty());
        assert!(worklist.push(3));
        assert!(worklist.push(0));
        assert!(!worklist.push(3));
        assert!(worklist.push(4));
        assert!(!worklist.push(0));
        let mut popped = Vec::new();
        while let Some(node) = worklist.pop() {
            popped.push(node);
        }
        assert_eq!(popped, expected);
        assert!(worklist.push(3));
    }
}
