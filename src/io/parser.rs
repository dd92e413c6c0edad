// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Infix expression parser using pest

use crate::ast::BinaryOp;
use crate::error::{EquationError, Result};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use std::fmt;
use std::sync::OnceLock;

#[derive(Parser)]
#[grammar = "io/equation.pest"]
struct EquationParser;

/// Parsed expression, before any name is resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Syntax {
    Number(f64),
    Name(String),
    /// Quoted text; only meaningful as a tag parameter
    Str(String),
    Bool(bool),
    Negate(Box<Syntax>),
    Binary {
        op: BinaryOp,
        lhs: Box<Syntax>,
        rhs: Box<Syntax>,
    },
    Call {
        name: String,
        args: Vec<Syntax>,
        keywords: Vec<(String, Syntax)>,
    },
}

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    PRATT.get_or_init(|| {
        // Lowest precedence first. Unary minus binds looser than `**`.
        PrattParser::new()
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::infix(Rule::mul, Assoc::Left) | Op::infix(Rule::div, Assoc::Left))
            .op(Op::prefix(Rule::neg) | Op::prefix(Rule::pos))
            .op(Op::infix(Rule::pow, Assoc::Right))
    })
}

/// Parse expression text into a syntax tree
pub fn parse_equation(source: &str) -> Result<Syntax> {
    let mut pairs =
        EquationParser::parse(Rule::equation, source).map_err(|e| EquationError::Parse(e.to_string()))?;

    let expr = pairs
        .next()
        .and_then(|equation| equation.into_inner().find(|p| p.as_rule() == Rule::expr))
        .ok_or_else(|| EquationError::Parse("empty expression".to_string()))?;

    parse_expr(expr.into_inner())
}

fn parse_expr(pairs: Pairs<Rule>) -> Result<Syntax> {
    pratt()
        .map_primary(parse_primary)
        .map_prefix(|op, operand| match op.as_rule() {
            Rule::neg => Ok(Syntax::Negate(Box::new(operand?))),
            _ => operand,
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Subtract,
                Rule::mul => BinaryOp::Multiply,
                Rule::div => BinaryOp::Divide,
                Rule::pow => BinaryOp::Power,
                rule => return Err(unexpected(rule)),
            };
            Ok(Syntax::Binary {
                op,
                lhs: Box::new(lhs?),
                rhs: Box::new(rhs?),
            })
        })
        .parse(pairs)
}

fn parse_primary(pair: Pair<Rule>) -> Result<Syntax> {
    match pair.as_rule() {
        Rule::expr => parse_expr(pair.into_inner()),
        Rule::number => parse_number(pair),
        Rule::name => Ok(Syntax::Name(pair.as_str().to_string())),
        Rule::call => parse_call(pair),
        rule => Err(unexpected(rule)),
    }
}

fn parse_number(pair: Pair<Rule>) -> Result<Syntax> {
    pair.as_str()
        .parse::<f64>()
        .map(Syntax::Number)
        .map_err(|e| EquationError::Parse(format!("invalid number '{}': {}", pair.as_str(), e)))
}

fn parse_call(pair: Pair<Rule>) -> Result<Syntax> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| EquationError::Parse("call without a name".to_string()))?;

    let mut args = Vec::new();
    let mut keywords = Vec::new();
    for arg in inner {
        if arg.as_rule() == Rule::keyword {
            let mut parts = arg.into_inner();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                return Err(EquationError::Parse(format!("malformed keyword in call to '{}'", name)));
            };
            keywords.push((key.as_str().to_string(), parse_argument(value)?));
        } else if keywords.is_empty() {
            args.push(parse_argument(arg)?);
        } else {
            return Err(EquationError::Parse(format!(
                "positional argument follows keyword argument in call to '{}'",
                name
            )));
        }
    }

    Ok(Syntax::Call { name, args, keywords })
}

fn parse_argument(pair: Pair<Rule>) -> Result<Syntax> {
    match pair.as_rule() {
        Rule::string => Ok(Syntax::Str(
            pair.into_inner().next().map(|s| s.as_str().to_string()).unwrap_or_default(),
        )),
        Rule::boolean => Ok(Syntax::Bool(pair.as_str().eq_ignore_ascii_case("true"))),
        Rule::expr => parse_expr(pair.into_inner()),
        rule => Err(unexpected(rule)),
    }
}

fn unexpected(rule: Rule) -> EquationError {
    EquationError::Parse(format!("unexpected {:?}", rule))
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Number(n) => write!(f, "{}", n),
            Syntax::Name(name) => write!(f, "{}", name),
            Syntax::Str(s) => write!(f, "'{}'", s),
            Syntax::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Syntax::Negate(operand) => write!(f, "(-{})", operand),
            Syntax::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Syntax::Call { name, args, keywords } => {
                write!(f, "{}(", name)?;
                let mut first = true;
                for arg in args {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", arg)?;
                }
                for (key, value) in keywords {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}={}", key, value)?;
                }
                write!(f, ")")
            }
        }
    }
}
