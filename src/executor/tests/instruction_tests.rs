//! Tests for the reference instruction set and the bundled natives

use super::helpers::{build_runtime, call, load, main_fn, op, push_int, store, MAIN};
use crate::executor::types::BinaryOp;
use crate::executor::{
    FunctionDef, Instr, Op, Outcome, Primitive, Runtime, Scope, Value, VmError,
};

#[test]
fn test_op_json_format() {
    let ops: Vec<Op> = serde_json::from_str(
        r#"[
            {"line": 1, "op": "push", "value": 1},
            {"line": 1, "op": "push", "value": 2.5},
            {"line": 1, "op": "push", "value": "hi"},
            {"line": 1, "op": "push", "value": null},
            {"line": 2, "op": "load", "name": "X"},
            {"line": 2, "op": "store", "name": "X", "scope": "global"},
            {"line": 3, "op": "binary", "operator": "int_div"},
            {"line": 4, "op": "jump_if_false", "target": 0},
            {"line": 5, "op": "call", "name": "f", "argc": 2},
            {"line": 6, "op": "return"}
        ]"#,
    )
    .unwrap();

    assert_eq!(ops[0].instr, Instr::Push { value: Primitive::Integer(1) });
    assert_eq!(ops[1].instr, Instr::Push { value: Primitive::Real(2.5) });
    assert_eq!(
        ops[2].instr,
        Instr::Push {
            value: Primitive::Str("hi".to_string())
        }
    );
    assert_eq!(ops[3].instr, Instr::Push { value: Primitive::Null });
    assert_eq!(
        ops[4].instr,
        Instr::Load {
            name: "X".to_string(),
            scope: Scope::Local
        }
    );
    assert_eq!(
        ops[5].instr,
        Instr::Store {
            name: "X".to_string(),
            scope: Scope::Global
        }
    );
    assert_eq!(
        ops[6].instr,
        Instr::Binary {
            operator: BinaryOp::IntDiv
        }
    );
    assert_eq!(ops[7].instr, Instr::JumpIfFalse { target: 0 });
    assert_eq!(ops[9], op(6, Instr::Return));

    let json = serde_json::to_value(&ops[8]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"line": 5, "op": "call", "name": "f", "argc": 2})
    );
}

#[test]
fn test_list_instruction_keeps_order() {
    let code = vec![
        push_int(1, 1),
        push_int(1, 2),
        push_int(1, 3),
        op(1, Instr::List { len: 3 }),
    ];
    let mut runtime = Runtime::new(vec![main_fn(code)]);
    assert_eq!(runtime.run_main(MAIN), Ok(Outcome::Finished));
    let list = runtime.pop().unwrap();
    assert_eq!(list.to_string(), "[1, 2, 3]");
}

#[test]
fn test_loop_with_jumps() {
    // I = 0; S = 0; while I < 5: S = S + I; I = I + 1
    let code = vec![
        push_int(1, 0),
        store(1, "I", Scope::Local),
        push_int(1, 0),
        store(1, "S", Scope::Local),
        // 4: condition
        load(2, "I", Scope::Local),
        push_int(2, 5),
        op(2, Instr::Binary { operator: BinaryOp::Lt }),
        op(2, Instr::JumpIfFalse { target: 17 }),
        load(3, "S", Scope::Local),
        load(3, "I", Scope::Local),
        op(3, Instr::Binary { operator: BinaryOp::Add }),
        store(3, "S", Scope::Local),
        load(4, "I", Scope::Local),
        push_int(4, 1),
        op(4, Instr::Binary { operator: BinaryOp::Add }),
        store(4, "I", Scope::Local),
        op(5, Instr::Jump { target: 4 }),
        // 17
        op(6, Instr::Breakpoint),
    ];
    let (mut runtime, _events) = build_runtime(vec![main_fn(code)], true);
    assert_eq!(runtime.run_main(MAIN), Ok(Outcome::Paused));
    assert_eq!(runtime.variables().global["S"], Value::integer(10));
}

#[test]
fn test_recursive_function() {
    // fact(N): if N < 2 then 1 else N * fact(N - 1)
    let fact = FunctionDef::new(
        "fact",
        ["N"],
        vec![
            load(1, "N", Scope::Local),
            push_int(1, 2),
            op(1, Instr::Binary { operator: BinaryOp::Lt }),
            op(1, Instr::JumpIfFalse { target: 6 }),
            push_int(2, 1),
            op(2, Instr::Return),
            // 6
            load(3, "N", Scope::Local),
            load(3, "N", Scope::Local),
            push_int(3, 1),
            op(3, Instr::Binary { operator: BinaryOp::Sub }),
            call(3, "fact", 1),
            op(3, Instr::Binary { operator: BinaryOp::Mul }),
            op(3, Instr::Return),
        ],
    );
    let main = main_fn(vec![push_int(10, 10), call(10, "fact", 1)]);
    let mut runtime = Runtime::new(vec![main, fact]);

    assert_eq!(runtime.run_main(MAIN), Ok(Outcome::Finished));
    assert_eq!(runtime.pop().unwrap(), Value::integer(3_628_800));
}

#[test]
fn test_pop_discards_top() {
    let code = vec![push_int(1, 1), push_int(1, 2), op(1, Instr::Pop)];
    let mut runtime = Runtime::new(vec![main_fn(code)]);
    runtime.run_main(MAIN).unwrap();
    assert_eq!(runtime.stack(), &[Value::integer(1)]);
}

/* ===================== Natives ===================== */

#[test]
fn test_every_native_pushes_one_value() {
    let (mut runtime, _events) = build_runtime(vec![], false);
    let list = Value::list(vec![Value::integer(1)]);

    runtime.call("append", vec![list.copy(), Value::integer(2)]).unwrap();
    assert_eq!(runtime.pop().unwrap(), Value::null());

    runtime.call("length", vec![list.copy()]).unwrap();
    assert_eq!(runtime.pop().unwrap(), Value::integer(2));

    runtime.call("str", vec![list]).unwrap();
    assert_eq!(runtime.pop().unwrap(), Value::string("[1, 2]"));
    assert!(runtime.stack().is_empty());
}

#[test]
fn test_length_of_string_and_integer() {
    let (mut runtime, _events) = build_runtime(vec![], false);
    runtime.call("length", vec![Value::string("héllo")]).unwrap();
    assert_eq!(runtime.pop().unwrap(), Value::integer(5));

    let err = runtime.call("length", vec![Value::integer(3)]).unwrap_err();
    assert_eq!(err, VmError::type_error("Type 'integer' has no length"));
}

#[test]
fn test_append_requires_list() {
    let (mut runtime, _events) = build_runtime(vec![], false);
    let err = runtime
        .call("append", vec![Value::integer(1), Value::integer(2)])
        .unwrap_err();
    assert_eq!(
        err,
        VmError::type_error("Type 'integer' cannot be interpreted as a List")
    );
}
