//! Decision procedure over linear integer arithmetic with ite.
//!
//! Queries are combined formulas: a list of functional defines plus a
//! goal. The built-in backend inlines the defines, rewrites the goal with
//! sound simplifications, and answers:
//!
//!   - `Unsat` only when the goal rewrites to `false`,
//!   - `Sat` when model search finds a satisfying assignment,
//!   - `Unknown` otherwise.
//!
//! It is deliberately incomplete. Completeness, when needed, comes from
//! the external SMT backend instead.

pub mod search;
pub mod simplify;


use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ast::{BinOp, CmpOp};

/// A quantifier-free formula over integer symbols.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Formula {
    Bool(bool),
    Int(i64),
    Sym(String),
    Bin {
        op: BinOp,
        lhs: Box<Formula>,
        rhs: Box<Formula>,
    },
    Cmp {
        op: CmpOp,
        lhs: Box<Formula>,
        rhs: Box<Formula>,
    },
    Ite {
        cond: Box<Formula>,
        then_branch: Box<Formula>,
        else_branch: Box<Formula>,
    },
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

impl Formula {
    pub fn bin(op: BinOp, lhs: Formula, rhs: Formula) -> Formula {
        Formula::Bin {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn cmp(op: CmpOp, lhs: Formula, rhs: Formula) -> Formula {
        Formula::Cmp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn ite(cond: Formula, then_branch: Formula, else_branch: Formula) -> Formula {
        Formula::Ite {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn not(inner: Formula) -> Formula {
        Formula::Not(Box::new(inner))
    }

    /// Collect every symbol occurring in the formula.
    pub fn symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Formula::Bool(_) | Formula::Int(_) => {}
            Formula::Sym(name) => {
                out.insert(name.clone());
            }
            Formula::Bin { lhs, rhs, .. } | Formula::Cmp { lhs, rhs, .. } => {
                lhs.symbols(out);
                rhs.symbols(out);
            }
            Formula::Ite {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.symbols(out);
                then_branch.symbols(out);
                else_branch.symbols(out);
            }
            Formula::Not(inner) => inner.symbols(out),
            Formula::And(items) | Formula::Or(items) => {
                for item in items {
                    item.symbols(out);
                }
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Bool(b) => write!(f, "{}", b),
            Formula::Int(n) => write!(f, "{}", n),
            Formula::Sym(name) => write!(f, "{}", name),
            Formula::Bin { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.as_str(), rhs),
            Formula::Cmp { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.as_str(), rhs),
            Formula::Ite {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "ite({}, {}, {})", cond, then_branch, else_branch),
            Formula::Not(inner) => write!(f, "!{}", inner),
            Formula::And(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "({})", parts.join(" && "))
            }
            Formula::Or(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "({})", parts.join(" || "))
            }
        }
    }
}

/// A satisfiability query: functional defines plus a goal formula.
///
/// Each define binds a symbol to a formula over free symbols and earlier
/// defines, so inlining them in order yields a closed goal over the free
/// symbols alone.
#[derive(Clone, Debug)]
pub struct Query {
    pub defs: Vec<(String, Formula)>,
    pub goal: Formula,
}

impl Query {
    /// Symbols not bound by any define.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut all = BTreeSet::new();
        self.goal.symbols(&mut all);
        for (_, formula) in &self.defs {
            formula.symbols(&mut all);
        }
        for (name, _) in &self.defs {
            all.remove(name);
        }
        all
    }
}

/// An assignment of integers to free symbols.
pub type Model = BTreeMap<String, i64>;

/// The answer to a query.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Sat(Model),
    Unsat,
    Unknown(String),
}

/// Knobs for the built-in backend.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Random search rounds after the deterministic phases.
    pub rounds: u32,
    /// Seed for the random phase. Fixed by default so runs reproduce.
    pub seed: u64,
    /// Wall-clock budget for model search.
    pub timeout_ms: u64,
    /// Exhaustive grid search only below this many free symbols.
    pub max_exhaustive_vars: usize,
    /// Cap on grid combinations before falling back to random search.
    pub max_combinations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rounds: 200,
            seed: 0x5eed_1234_abcd_0001,
            timeout_ms: 5000,
            max_exhaustive_vars: 6,
            max_combinations: 20_000,
        }
    }
}

/// Substitute the defines into the goal, in order, yielding a closed
/// formula over the free symbols.
pub fn inline_defs(query: &Query) -> Formula {
    let mut bindings: BTreeMap<String, Formula> = BTreeMap::new();
    for (name, formula) in &query.defs {
        let inlined = substitute(formula, &bindings);
        bindings.insert(name.clone(), inlined);
    }
    substitute(&query.goal, &bindings)
}

fn substitute(formula: &Formula, bindings: &BTreeMap<String, Formula>) -> Formula {
    match formula {
        Formula::Bool(_) | Formula::Int(_) => formula.clone(),
        Formula::Sym(name) => match bindings.get(name) {
            Some(bound) => bound.clone(),
            None => formula.clone(),
        },
        Formula::Bin { op, lhs, rhs } => Formula::bin(
            *op,
            substitute(lhs, bindings),
            substitute(rhs, bindings),
        ),
        Formula::Cmp { op, lhs, rhs } => Formula::cmp(
            *op,
            substitute(lhs, bindings),
            substitute(rhs, bindings),
        ),
        Formula::Ite {
            cond,
            then_branch,
            else_branch,
        } => Formula::ite(
            substitute(cond, bindings),
            substitute(then_branch, bindings),
            substitute(else_branch, bindings),
        ),
        Formula::Not(inner) => Formula::not(substitute(inner, bindings)),
        Formula::And(items) => {
            Formula::And(items.iter().map(|i| substitute(i, bindings)).collect())
        }
        Formula::Or(items) => {
            Formula::Or(items.iter().map(|i| substitute(i, bindings)).collect())
        }
    }
}

/// Decide a query with the built-in backend.
pub fn solve(query: &Query, config: &SolverConfig) -> Outcome {
    let inlined = inline_defs(query);
    let reduced = simplify::simplify(&inlined);

    match reduced {
        Formula::Bool(false) => Outcome::Unsat,
        Formula::Bool(true) => {
            // Any assignment works; pin the free symbols to zero.
            let model = query.free_symbols().into_iter().map(|s| (s, 0)).collect();
            Outcome::Sat(model)
        }
        goal => match search::find_model(&goal, config) {
            Some(model) => Outcome::Sat(model),
            None => Outcome::Unknown(
                "could not refute the goal or find a model within limits".to_string(),
            ),
        },
    }
}
