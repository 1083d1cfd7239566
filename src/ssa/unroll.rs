//! Bounded loop unrolling.
//!
//! A `while` loop becomes a chain of nested `if` statements, one per
//! permitted iteration, with no `else` arms. Executions needing more
//! iterations than the bound are cut off, so equivalence verdicts only
//! cover behavior within the bound.

use crate::ast::{Block, Expr, Stmt};
use crate::span::Spanned;

/// Unroll `while (cond) { body }` to `bound` nested guarded iterations.
pub fn unroll_while(
    cond: &Spanned<Expr>,
    body: &Spanned<Block>,
    bound: u32,
) -> Vec<Spanned<Stmt>> {
    if bound == 0 {
        return Vec::new();
    }
    let mut stmts = body.node.stmts.clone();
    stmts.extend(unroll_while(cond, body, bound - 1));
    let then_block = Spanned::new(Block { stmts }, body.span);
    vec![Spanned::new(
        Stmt::If {
            cond: cond.clone(),
            then_block,
            else_block: None,
        },
        body.span,
    )]
}

/// Unroll `for (init; cond; step) { body }`: the init runs once, then the
/// loop unrolls as a `while` whose body ends with the step.
pub fn unroll_for(
    init: &Spanned<Stmt>,
    cond: &Spanned<Expr>,
    step: &Spanned<Stmt>,
    body: &Spanned<Block>,
    bound: u32,
) -> Vec<Spanned<Stmt>> {
    let mut stepped = body.node.stmts.clone();
    stepped.push(step.clone());
    let stepped_body = Spanned::new(Block { stmts: stepped }, body.span);

    let mut stmts = vec![init.clone()];
    stmts.extend(unroll_while(cond, &stepped_body, bound));
    stmts
}
