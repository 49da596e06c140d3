//! Test helpers for executor tests
//!
//! Builds runtimes around hand-written or compiled instruction sequences.
//! `compile_expr`/`compile_program` are a minimal AST-to-bytecode lowering
//! so that parsed source can be executed end to end.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::executor::types::{Expr, Literal, Program, Stmt};
use crate::executor::{
    ChannelHandle, DebugEvent, FunctionDef, Instr, Op, Outcome, Primitive, Report, Runtime,
    Scope, Value,
};
use crate::parser;

pub const MAIN: &str = "$main";

pub fn op(line: usize, instr: Instr) -> Op {
    Op::new(line, instr)
}

pub fn push_int(line: usize, value: i64) -> Op {
    op(
        line,
        Instr::Push {
            value: Primitive::Integer(value),
        },
    )
}

pub fn load(line: usize, name: &str, scope: Scope) -> Op {
    op(
        line,
        Instr::Load {
            name: name.to_string(),
            scope,
        },
    )
}

pub fn store(line: usize, name: &str, scope: Scope) -> Op {
    op(
        line,
        Instr::Store {
            name: name.to_string(),
            scope,
        },
    )
}

pub fn call(line: usize, name: &str, argc: usize) -> Op {
    op(
        line,
        Instr::Call {
            name: name.to_string(),
            argc,
        },
    )
}

pub fn main_fn(code: Vec<Op>) -> FunctionDef {
    FunctionDef::new(MAIN, Vec::<String>::new(), code)
}

/// Runtime with the stdlib and a channel handle
pub fn build_runtime(
    functions: Vec<FunctionDef>,
    debug: bool,
) -> (Runtime, UnboundedReceiver<DebugEvent>) {
    let (handle, events) = ChannelHandle::new();
    let runtime = Runtime::builder(functions)
        .with_stdlib()
        .debug_mode(debug)
        .handle(handle)
        .build();
    (runtime, events)
}

/// Collect every event sent so far
pub fn drain(events: &mut UnboundedReceiver<DebugEvent>) -> Vec<DebugEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/* ===================== Lowering ===================== */

pub fn compile_expr(expr: &Expr, code: &mut Vec<Op>) {
    match expr {
        Expr::Literal {
            value: Literal::Integer(i),
            line,
        } => code.push(push_int(*line, *i)),
        Expr::Literal {
            value: Literal::List(items),
            line,
        } => {
            for item in items {
                compile_expr(item, code);
            }
            code.push(op(*line, Instr::List { len: items.len() }));
        }
        Expr::Ident { name, line } => code.push(load(*line, name, Scope::Global)),
        Expr::Binary {
            op: operator,
            left,
            right,
            line,
        } => {
            compile_expr(left, code);
            compile_expr(right, code);
            code.push(op(*line, Instr::Binary { operator: *operator }));
        }
        Expr::Unary {
            op: operator,
            operand,
            line,
        } => {
            compile_expr(operand, code);
            code.push(op(*line, Instr::Unary { operator: *operator }));
        }
        Expr::Call {
            name, args, line, ..
        } => {
            for arg in args {
                compile_expr(arg, code);
            }
            code.push(call(*line, name, args.len()));
        }
        Expr::Index {
            target,
            index,
            line,
        } => {
            compile_expr(target, code);
            compile_expr(index, code);
            code.push(op(*line, Instr::Index));
        }
    }
}

fn compile_block(body: &[Stmt], code: &mut Vec<Op>) {
    for stmt in body {
        compile_stmt(stmt, code);
    }
}

fn compile_stmt(stmt: &Stmt, code: &mut Vec<Op>) {
    match stmt {
        Stmt::Assign { name, expr, line } => {
            compile_expr(expr, code);
            code.push(store(*line, name, Scope::Global));
        }
        Stmt::Expr { expr, line } => {
            compile_expr(expr, code);
            code.push(op(*line, Instr::Pop));
        }
        Stmt::If {
            cond,
            then_body,
            else_body,
            line,
        } => {
            compile_expr(cond, code);
            let branch = code.len();
            code.push(op(*line, Instr::JumpIfFalse { target: 0 }));
            compile_block(then_body, code);
            let skip = code.len();
            code.push(op(*line, Instr::Jump { target: 0 }));
            let else_start = code.len();
            compile_block(else_body, code);
            let end = code.len();
            code[branch].instr = Instr::JumpIfFalse { target: else_start };
            code[skip].instr = Instr::Jump { target: end };
        }
    }
}

pub fn compile_program(program: &Program) -> Vec<Op> {
    let mut code = Vec::new();
    compile_block(&program.body, &mut code);
    code
}

/* ===================== End to end ===================== */

/// Parse, lower and run an expression, returning its value or the error
/// report produced by the runtime
pub fn eval(source: &str) -> Result<Value, Report> {
    let expr = parser::parse_expression(source).expect("Parse expression failed");
    let mut code = Vec::new();
    compile_expr(&expr, &mut code);
    code.push(call(expr.line(), "capture", 1));
    code.push(op(expr.line(), Instr::Pop));
    run_capturing(code)
}

/// Run `code` as `$main` with a `capture(X)` native that records X
pub fn run_capturing(code: Vec<Op>) -> Result<Value, Report> {
    let captured = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&captured);
    let (handle, mut events) = ChannelHandle::new();
    let mut runtime = Runtime::builder(vec![main_fn(code)])
        .with_stdlib()
        .native("capture", ["X"], move |runtime, mut args| {
            *sink.lock().unwrap() = args.pop();
            runtime.push(&Value::null());
            Ok(())
        })
        .handle(handle)
        .build();

    let outcome = runtime.run_main(MAIN).expect("Internal runtime failure");
    if outcome == Outcome::Halted {
        let report = drain(&mut events)
            .into_iter()
            .find_map(|event| match event {
                DebugEvent::Error(report) => Some(report),
                _ => None,
            })
            .expect("Halted without an error report");
        return Err(report);
    }
    assert_eq!(outcome, Outcome::Finished);
    let value = captured.lock().unwrap().take();
    Ok(value.expect("capture was never called"))
}

/// Parse and run a whole program; returns the globals observed by a final
/// `breakpoint`
pub fn run_source(source: &str) -> crate::executor::Variables {
    let program = parser::parse(source).expect("Parse failed");
    let mut code = compile_program(&program);
    code.push(op(0, Instr::Breakpoint));
    let (mut runtime, _events) = build_runtime(vec![main_fn(code)], true);
    let outcome = runtime.run_main(MAIN).expect("Internal runtime failure");
    assert_eq!(outcome, Outcome::Paused, "program did not reach the final breakpoint");
    runtime.variables()
}
