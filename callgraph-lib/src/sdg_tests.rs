use dataflow::graph::*;
use dataflow::slicer::*;

use crate::call_graph::*;
use crate::sdg::*;

struct Program {
    cg: CallGraph,
    sdg: SystemDependenceGraph,
    main: CgNode,
    compute: CgNode,
}

fn normal(node: CgNode, index: usize, instruction: &str, call: Option<&str>) -> Statement {
    Statement::new(
        node,
        index,
        StatementKind::Normal {
            instruction: instruction.to_owned(),
            call: call.map(str::to_owned),
        },
    )
}

impl Program {
    fn def(&self) -> Statement {
        normal(self.main, 0, "v1 = 5", None)
    }

    fn call(&self) -> Statement {
        normal(self.main, 1, "v2 = invoke compute(v1)", Some("compute"))
    }

    fn print(&self) -> Statement {
        normal(self.main, 2, "invoke print(v2)", Some("print"))
    }

    fn param_caller(&self) -> Statement {
        let kind = StatementKind::ParamCaller {
            value: 1,
            call: "compute".to_owned(),
        };
        Statement::new(self.main, 1, kind)
    }

    fn param_callee(&self) -> Statement {
        Statement::new(self.compute, 0, StatementKind::ParamCallee { value: 1 })
    }

    fn body(&self) -> Statement {
        normal(self.compute, 1, "v3 = v1 * 2", None)
    }

    fn ret_callee(&self) -> Statement {
        Statement::new(self.compute, 2, StatementKind::NormalRetCallee)
    }

    fn ret_caller(&self) -> Statement {
        let kind = StatementKind::NormalRetCaller {
            call: "compute".to_owned(),
        };
        Statement::new(self.main, 1, kind)
    }

    fn entry(&self) -> Statement {
        Statement::new(self.compute, 0, StatementKind::MethodEntry)
    }

    fn heap(&self) -> Statement {
        let kind = StatementKind::HeapParamCaller {
            location: "Counter.count".to_owned(),
        };
        Statement::new(self.main, 3, kind)
    }
}

fn program() -> Program {
    // main:    def ---------> call <--heap-- heap
    //           |
    //           +--> param_caller        ret_caller --> print
    //                     |                  ^
    // compute:            v                  |
    //                param_callee --> body --> ret_callee
    //                                  ^
    //                       entry -----+ (control)
    let mut cg = CallGraph::new();
    let main = cg.add_node("main");
    let compute = cg.add_node("compute");
    cg.add_call(main, compute).unwrap();
    let mut p = Program {
        cg,
        sdg: SystemDependenceGraph::new(),
        main,
        compute,
    };

    let mut sdg = SystemDependenceGraph::new();
    sdg.connect(p.def(), p.param_caller(), DependenceKind::Value)
        .connect(p.def(), p.call(), DependenceKind::Value)
        .connect(p.param_caller(), p.param_callee(), DependenceKind::Value)
        .connect(p.param_callee(), p.body(), DependenceKind::Value)
        .connect(p.body(), p.ret_callee(), DependenceKind::Value)
        .connect(p.ret_callee(), p.ret_caller(), DependenceKind::Value)
        .connect(p.ret_caller(), p.print(), DependenceKind::Value)
        .connect(p.entry(), p.body(), DependenceKind::Control)
        .connect(p.heap(), p.call(), DependenceKind::Heap);
    p.sdg = sdg;
    p
}

#[test]
fn calls_and_returns() {
    let p = program();
    assert_eq!(find_call_to(&p.sdg, p.main, "compute"), Some(p.call()));
    assert_eq!(find_call_to(&p.sdg, p.main, "print"), Some(p.print()));
    assert_eq!(find_call_to(&p.sdg, p.main, "missing"), None);
    assert_eq!(find_call_to(&p.sdg, p.compute, "compute"), None);

    assert_eq!(return_statement_for_call(&p.call()), p.ret_caller());
    assert_eq!(return_statement_for_call(&p.def()), p.def());
    assert_eq!(return_statement_for_call(&p.heap()), p.heap());
}

#[test]
fn backward_slices() -> Result<(), GraphError> {
    let p = program();
    let slice = compute_backward_slice(&p.sdg, &p.call(), &SlicePolicy::default())?;
    assert_eq!(slice.into_vec(), vec![p.call(), p.def(), p.heap()]);

    let no_heap = SlicePolicy::new(
        DataDependenceOptions::NoHeap,
        ControlDependenceOptions::Full,
    );
    let slice = compute_backward_slice(&p.sdg, &p.call(), &no_heap)?;
    assert_eq!(slice.into_vec(), vec![p.call(), p.def()]);

    let slice = compute_backward_slice(&p.sdg, &p.print(), &SlicePolicy::default())?;
    assert_eq!(
        slice.into_vec(),
        vec![
            p.print(),
            p.ret_caller(),
            p.ret_callee(),
            p.body(),
            p.param_callee(),
            p.entry(),
            p.param_caller(),
            p.def(),
        ]
    );

    let no_control = SlicePolicy::new(
        DataDependenceOptions::Full,
        ControlDependenceOptions::None,
    );
    let slice = compute_backward_slice(&p.sdg, &p.print(), &no_control)?;
    assert_eq!(slice.len(), 7);
    assert!(!slice.contains(&p.entry()));
    Ok(())
}

#[test]
fn forward_slices_start_at_the_return_value() -> Result<(), GraphError> {
    let p = program();
    let slice = compute_forward_slice(&p.sdg, &p.call(), &SlicePolicy::default())?;
    assert_eq!(slice.into_vec(), vec![p.ret_caller(), p.print()]);

    let slice = compute_forward_slice(&p.sdg, &p.def(), &SlicePolicy::default())?;
    // Statements without a call are used as they are.
    assert_eq!(slice.iter().next(), Some(&p.def()));
    assert_eq!(slice.len(), 8);
    assert!(slice.contains(&p.print()));
    assert!(!slice.contains(&p.heap()));
    Ok(())
}

#[test]
fn pruned_dependence_graph() -> Result<(), SliceError> {
    let p = program();
    let slice = compute_backward_slice(&p.sdg, &p.body(), &SlicePolicy::default())?;
    let pruned = prune_sdg(&p.sdg, &slice);
    sanity_check(&slice, &pruned)?;
    assert_eq!(pruned.node_count(), 5);
    assert_eq!(pruned.successors(&p.def())?, vec![p.param_caller()]);
    assert_eq!(
        pruned.edge_labels(&p.entry(), &p.body()),
        vec![DependenceKind::Control]
    );
    Ok(())
}

#[test]
fn field_write_depends_on_base_and_value() -> Result<(), GraphError> {
    // def is both the base pointer and the stored value of the write.
    let p = program();
    let write = normal(p.main, 4, "v1.f = v1", None);
    let mut sdg = p.sdg.clone();
    sdg.connect(p.def(), write.clone(), DependenceKind::BasePointer)
        .connect(p.def(), write.clone(), DependenceKind::Value);

    let no_base = SlicePolicy::new(
        DataDependenceOptions::NoBasePtrs,
        ControlDependenceOptions::None,
    );
    let slice = compute_backward_slice(&sdg, &write, &no_base)?;
    assert_eq!(slice.into_vec(), vec![write.clone(), p.def()]);

    let none = SlicePolicy::new(DataDependenceOptions::None, ControlDependenceOptions::Full);
    let slice = compute_backward_slice(&sdg, &write, &none)?;
    assert_eq!(slice.into_vec(), vec![write]);
    Ok(())
}

#[test]
fn statement_labels() {
    let p = program();
    assert_eq!(statement_label(&p.cg, &p.def()), "v1 = 5\\nmain");
    assert_eq!(
        statement_label(&p.cg, &p.param_caller()),
        "PARAM_CALLER 1\\nmain\\ncompute"
    );
    assert_eq!(
        statement_label(&p.cg, &p.param_callee()),
        "PARAM_CALLEE 1\\ncompute"
    );
    assert_eq!(
        statement_label(&p.cg, &p.heap()),
        "HEAP_PARAM_CALLER\\nCG node 0\\nCounter.count"
    );
    assert_eq!(
        statement_label(&p.cg, &p.ret_callee()),
        "CG node 1:2 NORMAL_RET_CALLEE"
    );
}

#[test]
fn slice_requests() -> Result<(), SdgError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let p = program();

    let request = SliceRequest::new("main", "compute");
    let result = request.run(&p.cg, &p.sdg)?;
    assert_eq!(result.seed, p.call());
    assert_eq!(result.slice.len(), 3);
    let expected = r#"digraph G {
  Node_0[label="v1 = 5\nmain"]
  Node_1[label="v2 = invoke compute(v1)\nmain"]
  Node_2[label="HEAP_PARAM_CALLER\nCG node 0\nCounter.count"]

  Node_0 -> Node_1
  Node_2 -> Node_1
}
"#;
    assert_eq!(result.dot, expected);

    let mut request = SliceRequest::new("main", "compute");
    request.direction = "forward".parse().unwrap();
    request.policy = SlicePolicy::new("-no_heap".parse().unwrap(), "none".parse().unwrap());
    let result = request.run(&p.cg, &p.sdg)?;
    assert_eq!(result.seed, p.call());
    assert_eq!(result.slice.into_vec(), vec![p.ret_caller(), p.print()]);
    Ok(())
}

#[test]
fn slice_request_errors() {
    let p = program();
    assert_eq!(
        SliceRequest::new("nope", "compute").run(&p.cg, &p.sdg).map(|r| r.seed),
        Err(SdgError::MethodNotFound("nope".to_owned()))
    );
    let error = SliceRequest::new("compute", "print")
        .run(&p.cg, &p.sdg)
        .unwrap_err();
    assert_eq!(
        error,
        SdgError::CallNotFound {
            caller: p.compute,
            callee: "print".to_owned(),
        }
    );
    assert_eq!(error.to_string(), "no call to `print` in CG node 1");
}
