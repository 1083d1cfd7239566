//! Model search for the built-in backend.
//!
//! Candidate values are mined from the goal's comparison boundaries,
//! widened by the usual suspects, then tried as an exhaustive grid when
//! the variable count permits and as seeded random assignments otherwise.
//! Evaluation is three-valued: division by zero and i64 overflow make a
//! subterm undefined, and an undefined goal never counts as a model.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::ast::BinOp;

use super::simplify::compare;
use super::{Formula, Model, SolverConfig};

/// Values worth trying regardless of what the goal mentions.
const SPECIAL_VALUES: [i64; 9] = [-10, -3, -2, -1, 0, 1, 2, 3, 10];

/// xorshift64* generator. Deterministic given the seed.
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed | 1,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Pick an index in `0..len`.
    pub fn pick(&mut self, len: usize) -> usize {
        (self.next_u64() % len.max(1) as u64) as usize
    }
}

/// Search for an assignment making `goal` true.
pub fn find_model(goal: &Formula, config: &SolverConfig) -> Option<Model> {
    let mut syms = BTreeSet::new();
    goal.symbols(&mut syms);
    let syms: Vec<String> = syms.into_iter().collect();

    if syms.is_empty() {
        // A closed goal that did not fold to a constant cannot be decided
        // by assignment.
        return match eval_bool(goal, &BTreeMap::new()) {
            Some(true) => Some(Model::new()),
            _ => None,
        };
    }

    let deadline = Instant::now() + Duration::from_millis(config.timeout_ms);
    let candidates = mine_candidates(goal);

    if syms.len() <= config.max_exhaustive_vars {
        let total = candidates.len().checked_pow(syms.len() as u32);
        if total.is_some_and(|t| t <= config.max_combinations) {
            if let Some(model) = grid_search(goal, &syms, &candidates, deadline) {
                return Some(model);
            }
        }
    }

    random_search(goal, &syms, &candidates, config, deadline)
}

/// Boundary values of the goal's comparisons, each widened by one in both
/// directions, plus the special values.
fn mine_candidates(goal: &Formula) -> Vec<i64> {
    let mut values: BTreeSet<i64> = SPECIAL_VALUES.iter().copied().collect();
    mine_into(goal, &mut values);
    values.into_iter().collect()
}

fn mine_into(formula: &Formula, out: &mut BTreeSet<i64>) {
    match formula {
        Formula::Bool(_) | Formula::Sym(_) => {}
        Formula::Int(n) => {
            widen(*n, out);
        }
        Formula::Cmp { lhs, rhs, .. } => {
            if let Some(boundary) = single_var_boundary(lhs, rhs) {
                widen(boundary, out);
            }
            mine_into(lhs, out);
            mine_into(rhs, out);
        }
        Formula::Bin { lhs, rhs, .. } => {
            mine_into(lhs, out);
            mine_into(rhs, out);
        }
        Formula::Ite {
            cond,
            then_branch,
            else_branch,
        } => {
            mine_into(cond, out);
            mine_into(then_branch, out);
            mine_into(else_branch, out);
        }
        Formula::Not(inner) => mine_into(inner, out),
        Formula::And(items) | Formula::Or(items) => {
            for item in items {
                mine_into(item, out);
            }
        }
    }
}

fn widen(n: i64, out: &mut BTreeSet<i64>) {
    out.insert(n);
    if let Some(lo) = n.checked_sub(1) {
        out.insert(lo);
    }
    if let Some(hi) = n.checked_add(1) {
        out.insert(hi);
    }
}

/// For a canonical atom `c*x + k <= 0` (or `== 0`), the value of `x` at
/// the boundary with the other variables at zero.
fn single_var_boundary(lhs: &Formula, rhs: &Formula) -> Option<i64> {
    if *rhs != Formula::Int(0) {
        return None;
    }
    let (coeff, constant) = match lhs {
        Formula::Sym(_) => (1, 0),
        Formula::Bin {
            op: BinOp::Add,
            lhs: l,
            rhs: r,
        } => match (l.as_ref(), r.as_ref()) {
            (Formula::Sym(_), Formula::Int(k)) => (1, *k),
            (
                Formula::Bin {
                    op: BinOp::Mul,
                    lhs: cl,
                    rhs: _,
                },
                Formula::Int(k),
            ) => match cl.as_ref() {
                Formula::Int(c) => (*c, *k),
                _ => return None,
            },
            _ => return None,
        },
        Formula::Bin {
            op: BinOp::Mul,
            lhs: cl,
            rhs: _,
        } => match cl.as_ref() {
            Formula::Int(c) => (*c, 0),
            _ => return None,
        },
        _ => return None,
    };
    if coeff == 0 {
        return None;
    }
    constant.checked_neg().map(|k| k.div_euclid(coeff))
}

fn grid_search(
    goal: &Formula,
    syms: &[String],
    candidates: &[i64],
    deadline: Instant,
) -> Option<Model> {
    let mut indices = vec![0usize; syms.len()];
    let mut tried: usize = 0;
    loop {
        let model: Model = syms
            .iter()
            .zip(&indices)
            .map(|(name, idx)| (name.clone(), candidates[*idx]))
            .collect();
        if eval_bool(goal, &model) == Some(true) {
            return Some(model);
        }

        tried += 1;
        if tried % 256 == 0 && Instant::now() >= deadline {
            return None;
        }

        // Odometer step over the candidate grid.
        let mut pos = 0;
        loop {
            if pos == indices.len() {
                return None;
            }
            indices[pos] += 1;
            if indices[pos] < candidates.len() {
                break;
            }
            indices[pos] = 0;
            pos += 1;
        }
    }
}

fn random_search(
    goal: &Formula,
    syms: &[String],
    candidates: &[i64],
    config: &SolverConfig,
    deadline: Instant,
) -> Option<Model> {
    let mut rng = Rng::new(config.seed);
    for round in 0..config.rounds {
        if round % 16 == 0 && Instant::now() >= deadline {
            return None;
        }
        let model: Model = syms
            .iter()
            .map(|name| {
                // Mostly mined candidates, occasionally a wider draw.
                let value = if rng.pick(4) == 0 {
                    (rng.next_u64() % 201) as i64 - 100
                } else {
                    candidates[rng.pick(candidates.len())]
                };
                (name.clone(), value)
            })
            .collect();
        if eval_bool(goal, &model) == Some(true) {
            return Some(model);
        }
    }
    None
}

// ─── Three-valued evaluation ─────────────────────────────────────────

pub fn eval_int(formula: &Formula, model: &Model) -> Option<i64> {
    match formula {
        Formula::Int(n) => Some(*n),
        Formula::Sym(name) => model.get(name).copied(),
        Formula::Bin { op, lhs, rhs } => {
            let a = eval_int(lhs, model)?;
            let b = eval_int(rhs, model)?;
            match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Sub => a.checked_sub(b),
                BinOp::Mul => a.checked_mul(b),
                BinOp::Div => {
                    if b == 0 {
                        None
                    } else {
                        a.checked_div_euclid(b)
                    }
                }
            }
        }
        Formula::Ite {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval_bool(cond, model)? {
                eval_int(then_branch, model)
            } else {
                eval_int(else_branch, model)
            }
        }
        Formula::Bool(_) | Formula::Cmp { .. } | Formula::Not(_) | Formula::And(_)
        | Formula::Or(_) => None,
    }
}

pub fn eval_bool(formula: &Formula, model: &Model) -> Option<bool> {
    match formula {
        Formula::Bool(b) => Some(*b),
        Formula::Cmp { op, lhs, rhs } => {
            let a = eval_int(lhs, model)?;
            let b = eval_int(rhs, model)?;
            Some(compare(*op, a, b))
        }
        Formula::Not(inner) => eval_bool(inner, model).map(|b| !b),
        Formula::And(items) => {
            // Kleene conjunction: false wins over undefined.
            let mut undefined = false;
            for item in items {
                match eval_bool(item, model) {
                    Some(false) => return Some(false),
                    Some(true) => {}
                    None => undefined = true,
                }
            }
            if undefined {
                None
            } else {
                Some(true)
            }
        }
        Formula::Or(items) => {
            let mut undefined = false;
            for item in items {
                match eval_bool(item, model) {
                    Some(true) => return Some(true),
                    Some(false) => {}
                    None => undefined = true,
                }
            }
            if undefined {
                None
            } else {
                Some(false)
            }
        }
        Formula::Ite {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval_bool(cond, model)? {
                eval_bool(then_branch, model)
            } else {
                eval_bool(else_branch, model)
            }
        }
        Formula::Int(_) | Formula::Sym(_) | Formula::Bin { .. } => None,
    }
}
