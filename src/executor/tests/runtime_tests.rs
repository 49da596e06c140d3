//! Tests for runtime construction, the value stack, invocation and frames

use super::helpers::{build_runtime, call, load, main_fn, op, push_int, store, MAIN};
use crate::executor::{
    FunctionDef, InternalError, Instr, Lifecycle, Outcome, Runtime, Scope, Step, Value, VmError,
};

#[test]
fn test_push_copies_and_pop_returns_in_lifo_order() {
    let mut runtime = Runtime::new(vec![]);
    let list = Value::list(vec![]);
    runtime.push(&Value::integer(1));
    runtime.push(&list);

    let top = runtime.pop().unwrap();
    assert!(Value::same_instance(&top, &list));
    assert_eq!(runtime.pop().unwrap(), Value::integer(1));
}

#[test]
fn test_pop_on_empty_stack_is_internal() {
    let mut runtime = Runtime::new(vec![]);
    let err = runtime.pop().unwrap_err();
    assert_eq!(err, VmError::Internal(InternalError::StackUnderflow));
    assert!(err.is_internal());
}

#[test]
fn test_pop_n_keeps_push_order() {
    let mut runtime = Runtime::new(vec![]);
    for i in 1..=3 {
        runtime.push(&Value::integer(i));
    }
    let values = runtime.pop_n(2).unwrap();
    assert_eq!(values, vec![Value::integer(2), Value::integer(3)]);
    assert_eq!(runtime.stack().len(), 1);
    assert!(runtime.pop_n(2).is_err());
}

#[test]
fn test_interpreted_arity_mismatch_is_internal() {
    let add = FunctionDef::new("add", ["A", "B"], vec![op(1, Instr::Return)]);
    let mut runtime = Runtime::new(vec![add]);

    let err = runtime.call("add", vec![Value::integer(1)]).unwrap_err();
    assert_eq!(
        err,
        VmError::Internal(InternalError::Arity {
            function: "add".to_string(),
            expected: 2,
            got: 1,
        })
    );
    assert_eq!(runtime.frame_depth(), 0);
}

#[test]
fn test_native_arity_mismatch_is_internal() {
    let (mut runtime, _events) = build_runtime(vec![], false);
    let err = runtime.call("length", vec![]).unwrap_err();
    assert!(matches!(
        err,
        VmError::Internal(InternalError::Arity { expected: 1, got: 0, .. })
    ));
    assert!(runtime.stack().is_empty());
}

#[test]
fn test_invoke_binds_parameters_in_new_frame() {
    let f = FunctionDef::new("f", ["X", "Y"], vec![op(1, Instr::Return)]);
    let mut runtime = Runtime::new(vec![f]);
    runtime
        .call("f", vec![Value::integer(1), Value::string("y")])
        .unwrap();

    let frame = runtime.current_frame().unwrap();
    assert_eq!(frame.function(), "f");
    assert_eq!(frame.locals()["X"], Value::integer(1));
    assert_eq!(frame.locals()["Y"], Value::string("y"));
}

#[test]
fn test_native_runs_immediately() {
    let mut runtime = Runtime::builder(vec![])
        .native("seven", Vec::<String>::new(), |runtime, _args| {
            runtime.push(&Value::integer(7));
            Ok(())
        })
        .build();
    runtime.call("seven", vec![]).unwrap();
    assert_eq!(runtime.frame_depth(), 0);
    assert_eq!(runtime.pop().unwrap(), Value::integer(7));
}

#[test]
fn test_unknown_function_is_internal() {
    let mut runtime = Runtime::new(vec![]);
    let err = runtime.start("missing").unwrap_err();
    assert_eq!(
        err,
        VmError::Internal(InternalError::UnknownFunction("missing".to_string()))
    );
}

#[test]
fn test_native_entry_is_rejected() {
    let (mut runtime, _events) = build_runtime(vec![], false);
    let err = runtime.start("length").unwrap_err();
    assert_eq!(
        err,
        VmError::Internal(InternalError::NativeEntry("length".to_string()))
    );
}

#[test]
fn test_tick_before_start_is_internal() {
    let mut runtime = Runtime::new(vec![main_fn(vec![])]);
    assert_eq!(
        runtime.tick(10),
        Err(VmError::Internal(InternalError::NoFrame))
    );
}

#[test]
fn test_step_pops_exhausted_frame() {
    let mut runtime = Runtime::new(vec![main_fn(vec![push_int(1, 1)])]);
    runtime.start(MAIN).unwrap();

    assert_eq!(runtime.step(), Ok(Step::Continue));
    assert_eq!(runtime.current_frame().unwrap().pc(), 1);
    assert_eq!(runtime.step(), Ok(Step::Done));
    assert_eq!(runtime.frame_depth(), 0);
    assert_eq!(runtime.stack(), &[Value::integer(1)]);
}

#[test]
fn test_return_finishes_frame_early() {
    let code = vec![op(1, Instr::Return), push_int(2, 99)];
    let mut runtime = Runtime::new(vec![main_fn(code)]);
    assert_eq!(runtime.run_main(MAIN), Ok(Outcome::Finished));
    assert!(runtime.stack().is_empty());
}

#[test]
fn test_run_main_finishes_and_notifies_exit() {
    let code = vec![push_int(1, 2), store(1, "X", Scope::Global)];
    let (mut runtime, mut events) = build_runtime(vec![main_fn(code)], false);

    assert_eq!(runtime.run_main(MAIN), Ok(Outcome::Finished));
    assert_eq!(runtime.lifecycle(), Lifecycle::Finished);
    assert_eq!(
        super::helpers::drain(&mut events),
        vec![crate::executor::DebugEvent::Exited]
    );
    // Further ticks are no-ops
    assert_eq!(runtime.tick(5), Ok(Outcome::Finished));
    assert!(super::helpers::drain(&mut events).is_empty());
}

#[test]
fn test_callee_runs_before_caller_continues() {
    // double(X): X * 2, result left on the stack
    let double = FunctionDef::new(
        "double",
        ["X"],
        vec![
            load(10, "X", Scope::Local),
            push_int(10, 2),
            op(
                10,
                Instr::Binary {
                    operator: crate::executor::types::BinaryOp::Mul,
                },
            ),
            op(11, Instr::Return),
        ],
    );
    let main = main_fn(vec![
        push_int(1, 21),
        call(1, "double", 1),
        store(1, "R", Scope::Global),
        op(2, Instr::Breakpoint),
    ]);
    let (mut runtime, _events) = build_runtime(vec![main, double], true);

    assert_eq!(runtime.run_main(MAIN), Ok(Outcome::Paused));
    assert_eq!(runtime.variables().global["R"], Value::integer(42));
}

#[test]
fn test_local_and_global_scopes() {
    // set(V) stores V both locally and globally
    let set = FunctionDef::new(
        "set",
        ["V"],
        vec![
            load(5, "V", Scope::Local),
            store(5, "G", Scope::Global),
            load(6, "V", Scope::Local),
            store(6, "L", Scope::Local),
            op(7, Instr::Breakpoint),
            op(8, Instr::Return),
        ],
    );
    let main = main_fn(vec![
        push_int(1, 5),
        call(1, "set", 1),
        op(2, Instr::Breakpoint),
    ]);
    let (mut runtime, _events) = build_runtime(vec![main, set], true);
    runtime.start(MAIN).unwrap();

    // Paused inside `set`
    assert_eq!(runtime.run_to_completion(), Ok(Outcome::Paused));
    let vars = runtime.variables();
    assert_eq!(vars.global["G"], Value::integer(5));
    assert!(!vars.global.contains_key("L"));
    let local = vars.local.expect("callee locals should be visible");
    assert_eq!(local["L"], Value::integer(5));
    assert_eq!(local["V"], Value::integer(5));

    // Paused back in `$main`: only globals
    runtime.resume();
    assert_eq!(runtime.run_to_completion(), Ok(Outcome::Paused));
    let vars = runtime.variables();
    assert!(vars.local.is_none());
    assert_eq!(vars.global["G"], Value::integer(5));
}

#[test]
fn test_start_discards_previous_state() {
    let code = vec![push_int(1, 1)];
    let mut runtime = Runtime::new(vec![main_fn(code)]);
    runtime.push(&Value::integer(42));
    runtime.start(MAIN).unwrap();
    assert!(runtime.stack().is_empty());
    assert_eq!(runtime.frame_depth(), 1);
}
