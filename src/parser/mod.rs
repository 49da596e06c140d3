//! PEST-based parser for the Pseudo language
//!
//! Produces the AST consumed by codegen. Every node carries the source line of
//! the token that introduced it (operator, `=`, `if`, call name, ...).
//!
//! Parsing never recovers: the first syntax error aborts the whole parse and
//! reports the furthest position the grammar reached together with what it
//! expected there.

use pest::error::{ErrorVariant, InputLocation, LineColLocation};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;
use tracing::debug;

use crate::executor::types::ast::{BinaryOp, Expr, Literal, Program, Stmt, UnaryOp};


/// Words that can never be used as variable identifiers
pub const KEYWORDS: &[&str] = &[
    "if", "else", "then", "do", "for", "while", "from", "to", "loop", "input", "output", "end",
    "div", "mod", "and", "or",
];

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/pseudo.pest"]
struct PseudoParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The grammar could not match the input
    #[error("Syntax Error: Line {line}, column {column}: expected {expected}")]
    Syntax {
        line: usize,
        column: usize,
        expected: String,
    },

    /// A reserved keyword was used as a variable identifier
    #[error("Syntax Error: Line {line}, column {column}: Identifier name cannot be a keyword ('{name}')")]
    Keyword {
        line: usize,
        column: usize,
        name: String,
    },

    /// The input matched but could not be turned into an AST
    #[error("Syntax Error: Line {line}, column {column}: {message}")]
    Build {
        line: usize,
        column: usize,
        message: String,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::Syntax { line, .. }
            | ParseError::Keyword { line, .. }
            | ParseError::Build { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ParseError::Syntax { column, .. }
            | ParseError::Keyword { column, .. }
            | ParseError::Build { column, .. } => *column,
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        let expected = match &err.variant {
            ErrorVariant::ParsingError {
                positives,
                negatives,
            } => describe_expectation(positives, negatives),
            ErrorVariant::CustomError { message } => message.clone(),
        };

        ParseError::Syntax {
            line,
            column,
            expected,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

fn describe_expectation(positives: &[Rule], negatives: &[Rule]) -> String {
    let mut expected: Vec<&str> = positives.iter().map(|rule| describe_rule(*rule)).collect();
    expected.sort_unstable();
    expected.dedup();

    match expected.as_slice() {
        [] if negatives.is_empty() => "valid syntax".to_string(),
        [] => {
            let mut unexpected: Vec<&str> =
                negatives.iter().map(|rule| describe_rule(*rule)).collect();
            unexpected.sort_unstable();
            unexpected.dedup();
            format!("anything but {}", unexpected.join(" or "))
        }
        [single] => (*single).to_string(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

/// Human-readable name of a grammar rule, as shown in syntax errors
fn describe_rule(rule: Rule) -> &'static str {
    match rule {
        Rule::EOI => "end of input",
        Rule::statement | Rule::assign_stmt | Rule::expr_stmt | Rule::block => "statement",
        Rule::if_stmt | Rule::if_piece | Rule::kw_if => "'if'",
        Rule::else_if_piece => "'else if'",
        Rule::else_piece | Rule::kw_else => "'else'",
        Rule::kw_then => "'then'",
        Rule::end_if => "'end if'",
        Rule::assign_op => "'='",
        Rule::expression
        | Rule::or_expr
        | Rule::and_expr
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative
        | Rule::unary
        | Rule::postfix
        | Rule::primary => "expression",
        Rule::op_or => "'or'",
        Rule::op_and => "'and'",
        Rule::cmp_op => "comparison operator",
        Rule::add_op | Rule::mul_op => "arithmetic operator",
        Rule::unary_op => "unary operator",
        Rule::suffix | Rule::index_suffix | Rule::method_suffix => "index or method call",
        Rule::call => "function call",
        Rule::paren => "'('",
        Rule::list_lit => "list",
        Rule::arg_list => "arguments",
        Rule::variable => "identifier",
        Rule::function_name => "function name",
        Rule::integer => "integer",
        _ => "token",
    }
}

/* ===================== Public API ===================== */

/// Parse a source file into a program
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut pairs = PseudoParser::parse(Rule::program, source)
        .map_err(|err| program_syntax_error(source, err))?;
    let program = pairs
        .next()
        .ok_or_else(|| build_error((1, 1), "empty parse tree"))?;

    let body = program
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::statement)
        .map(build_statement)
        .collect::<ParseResult<Vec<_>>>()?;

    debug!(statements = body.len(), "parsed program");
    Ok(Program { body })
}

/// Blocks close on a fresh line, so a failure at the end of an unterminated
/// last line is reported as if the line break were there.
fn program_syntax_error(source: &str, err: pest::error::Error<Rule>) -> ParseError {
    let at_end = matches!(err.location, InputLocation::Pos(pos) if pos == source.len());
    if at_end && !source.is_empty() && !source.ends_with('\n') {
        if let Err(terminated) = PseudoParser::parse(Rule::program, &format!("{source}\n")) {
            return terminated.into();
        }
    }
    err.into()
}

/// Parse a single expression (tooling and testing API)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut pairs = PseudoParser::parse(Rule::expression_input, source)?;
    let input = pairs
        .next()
        .ok_or_else(|| build_error((1, 1), "empty parse tree"))?;
    let pos = position(&input);
    let expr = input
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::expression)
        .ok_or_else(|| build_error(pos, "missing expression"))?;

    build_expression(expr)
}

/// Reject reserved keywords used as variable identifiers
pub fn ensure_not_keyword(name: &str, (line, column): (usize, usize)) -> ParseResult<()> {
    if KEYWORDS.contains(&name) {
        return Err(ParseError::Keyword {
            line,
            column,
            name: name.to_string(),
        });
    }
    Ok(())
}

/* ===================== Position Helpers ===================== */

/// 1-based (line, column) of the start of a pair
fn position(pair: &Pair<Rule>) -> (usize, usize) {
    pair.as_span().start_pos().line_col()
}

fn line_of(pair: &Pair<Rule>) -> usize {
    position(pair).0
}

fn build_error((line, column): (usize, usize), message: impl Into<String>) -> ParseError {
    ParseError::Build {
        line,
        column,
        message: message.into(),
    }
}

fn expect_next<'i>(
    inner: &mut Pairs<'i, Rule>,
    parent: (usize, usize),
    what: &str,
) -> ParseResult<Pair<'i, Rule>> {
    inner
        .next()
        .ok_or_else(|| build_error(parent, format!("missing {what}")))
}

/* ===================== Statement Builders ===================== */

fn build_statement(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let pos = position(&pair);

    match pair.as_rule() {
        Rule::statement => {
            let inner = expect_next(&mut pair.into_inner(), pos, "statement")?;
            build_statement(inner)
        }
        Rule::assign_stmt => build_assign_stmt(pair),
        Rule::if_stmt => build_if_stmt(pair),
        Rule::expr_stmt => {
            let expr_pair = expect_next(&mut pair.into_inner(), pos, "expression")?;
            Ok(Stmt::Expr {
                expr: build_expression(expr_pair)?,
                line: pos.0,
            })
        }
        other => Err(build_error(
            pos,
            format!("unexpected statement rule: {other:?}"),
        )),
    }
}

fn build_assign_stmt(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let pos = position(&pair);
    let mut inner = pair.into_inner();

    let target = expect_next(&mut inner, pos, "assignment target")?;
    let name = build_variable_name(&target)?;
    let eq = expect_next(&mut inner, pos, "'='")?;
    let expr = build_expression(expect_next(&mut inner, pos, "assigned expression")?)?;

    Ok(Stmt::Assign {
        name,
        expr,
        line: line_of(&eq),
    })
}

fn build_block(pair: Pair<Rule>) -> ParseResult<Vec<Stmt>> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::statement)
        .map(build_statement)
        .collect()
}

/// One `if <cond> then <block>` clause before folding
struct Clause {
    cond: Expr,
    body: Vec<Stmt>,
    line: usize,
}

fn build_if_piece(pair: Pair<Rule>) -> ParseResult<Clause> {
    let pos = position(&pair);
    let mut line = pos.0;
    let mut cond = None;
    let mut body = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::kw_if => line = line_of(&part),
            Rule::expression => cond = Some(build_expression(part)?),
            Rule::block => body = build_block(part)?,
            _ => {}
        }
    }

    let cond = cond.ok_or_else(|| build_error(pos, "if statement requires a condition"))?;
    Ok(Clause { cond, body, line })
}

fn build_if_stmt(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let pos = position(&pair);
    let mut clauses = Vec::new();
    let mut else_body = Vec::new();

    for piece in pair.into_inner() {
        match piece.as_rule() {
            Rule::if_piece => clauses.push(build_if_piece(piece)?),
            Rule::else_if_piece => {
                let piece_pos = position(&piece);
                let if_piece = piece
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::if_piece)
                    .ok_or_else(|| build_error(piece_pos, "missing 'if' after 'else'"))?;
                clauses.push(build_if_piece(if_piece)?);
            }
            Rule::else_piece => {
                if let Some(block) = piece.into_inner().find(|p| p.as_rule() == Rule::block) {
                    else_body = build_block(block)?;
                }
            }
            _ => {}
        }
    }

    // Fold right to left: each clause's else branch is the next clause, the
    // last clause gets the trailing else block.
    let mut tail = else_body;
    while let Some(clause) = clauses.pop() {
        tail = vec![Stmt::If {
            cond: clause.cond,
            then_body: clause.body,
            else_body: tail,
            line: clause.line,
        }];
    }

    tail.pop()
        .ok_or_else(|| build_error(pos, "if statement without clauses"))
}

/* ===================== Expression Builders ===================== */

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    let pos = position(&pair);

    match pair.as_rule() {
        Rule::expression | Rule::primary | Rule::paren => {
            let inner = expect_next(&mut pair.into_inner(), pos, "expression")?;
            build_expression(inner)
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative => build_binary_chain(pair),
        Rule::unary => build_unary(pair),
        Rule::postfix => build_postfix(pair),
        Rule::call => {
            let mut inner = pair.into_inner();
            let name_pair = expect_next(&mut inner, pos, "function name")?;
            let args = build_arg_list(expect_next(&mut inner, pos, "arguments")?)?;
            Ok(Expr::Call {
                name: name_pair.as_str().to_string(),
                args,
                is_method: false,
                line: line_of(&name_pair),
            })
        }
        Rule::variable => Ok(Expr::Ident {
            name: build_variable_name(&pair)?,
            line: pos.0,
        }),
        Rule::integer => {
            let text = pair.as_str();
            let value = text.parse::<i64>().map_err(|e| {
                build_error(pos, format!("integer literal '{text}' is out of range: {e}"))
            })?;
            Ok(Expr::Literal {
                value: Literal::Integer(value),
                line: pos.0,
            })
        }
        Rule::list_lit => {
            let items = build_arg_list(expect_next(&mut pair.into_inner(), pos, "list items")?)?;
            Ok(Expr::Literal {
                value: Literal::List(items),
                line: pos.0,
            })
        }
        other => Err(build_error(
            pos,
            format!("unexpected expression rule: {other:?}"),
        )),
    }
}

/// Fold `a op b op c` left to right into nested binary nodes
fn build_binary_chain(pair: Pair<Rule>) -> ParseResult<Expr> {
    let pos = position(&pair);
    let mut inner = pair.into_inner();
    let mut left = build_expression(expect_next(&mut inner, pos, "operand")?)?;

    while let Some(op_pair) = inner.next() {
        let op_pos = position(&op_pair);
        let op = BinaryOp::from_token(op_pair.as_str()).ok_or_else(|| {
            build_error(op_pos, format!("unknown operator '{}'", op_pair.as_str()))
        })?;
        let right = build_expression(expect_next(&mut inner, op_pos, "right operand")?)?;

        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            line: op_pos.0,
        };
    }

    Ok(left)
}

fn build_unary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let pos = position(&pair);
    let mut inner = pair.into_inner();
    let first = expect_next(&mut inner, pos, "operand")?;

    if first.as_rule() != Rule::unary_op {
        return build_expression(first);
    }

    let op_pos = position(&first);
    let op = UnaryOp::from_token(first.as_str())
        .ok_or_else(|| build_error(op_pos, format!("unknown operator '{}'", first.as_str())))?;
    let operand_pair = expect_next(&mut inner, op_pos, "operand")?;

    // i64::MIN has no positive counterpart, so its literal is folded here
    if op == UnaryOp::Neg {
        let digits = operand_pair.as_str().trim();
        if digits.bytes().all(|b| b.is_ascii_digit()) && digits.parse::<i64>().is_err() {
            if let Ok(value) = format!("-{digits}").parse::<i64>() {
                return Ok(Expr::Literal {
                    value: Literal::Integer(value),
                    line: op_pos.0,
                });
            }
        }
    }

    let operand = build_expression(operand_pair)?;
    Ok(Expr::Unary {
        op,
        operand: Box::new(operand),
        line: op_pos.0,
    })
}

/// Apply `[index]` and `.method(args)` suffixes left to right
fn build_postfix(pair: Pair<Rule>) -> ParseResult<Expr> {
    let pos = position(&pair);
    let mut inner = pair.into_inner();
    let mut expr = build_expression(expect_next(&mut inner, pos, "expression")?)?;

    for suffix in inner {
        let suffix_pos = position(&suffix);
        let suffix_inner = expect_next(&mut suffix.into_inner(), suffix_pos, "suffix")?;

        expr = match suffix_inner.as_rule() {
            Rule::index_suffix => {
                let index_pair =
                    expect_next(&mut suffix_inner.into_inner(), suffix_pos, "index")?;
                Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(build_expression(index_pair)?),
                    line: suffix_pos.0,
                }
            }
            Rule::method_suffix => {
                let mut parts = suffix_inner.into_inner();
                let name_pair = expect_next(&mut parts, suffix_pos, "method name")?;
                let rest = build_arg_list(expect_next(&mut parts, suffix_pos, "arguments")?)?;

                let mut args = Vec::with_capacity(rest.len() + 1);
                args.push(expr);
                args.extend(rest);

                Expr::Call {
                    name: name_pair.as_str().to_string(),
                    args,
                    is_method: true,
                    line: line_of(&name_pair),
                }
            }
            other => {
                return Err(build_error(
                    suffix_pos,
                    format!("unexpected suffix rule: {other:?}"),
                ))
            }
        };
    }

    Ok(expr)
}

fn build_arg_list(pair: Pair<Rule>) -> ParseResult<Vec<Expr>> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::expression)
        .map(build_expression)
        .collect()
}

fn build_variable_name(pair: &Pair<Rule>) -> ParseResult<String> {
    let name = pair.as_str();
    ensure_not_keyword(name, position(pair))?;
    Ok(name.to_string())
}
