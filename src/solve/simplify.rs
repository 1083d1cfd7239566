//! Sound formula rewriting.
//!
//! Every rule preserves satisfiability exactly, so a goal that rewrites
//! to `false` is genuinely unsatisfiable. The workhorse is linear atom
//! canonicalization: comparisons over linear integer terms normalize to
//! `lin <= 0` or `lin == 0` with gcd-reduced coefficients and floor
//! tightening, which makes equivalent atoms like `x > 0` and `x >= 1`
//! structurally identical.

use std::collections::BTreeMap;

use crate::ast::{BinOp, CmpOp};

use super::Formula;

pub fn simplify(formula: &Formula) -> Formula {
    match formula {
        Formula::Bool(_) | Formula::Int(_) | Formula::Sym(_) => formula.clone(),

        Formula::Bin { op, lhs, rhs } => {
            simplify_bin(*op, simplify(lhs), simplify(rhs))
        }

        Formula::Cmp { op, lhs, rhs } => {
            simplify_cmp(*op, simplify(lhs), simplify(rhs))
        }

        Formula::Ite {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond = simplify(cond);
            let then_branch = simplify(then_branch);
            let else_branch = simplify(else_branch);
            match cond {
                Formula::Bool(true) => then_branch,
                Formula::Bool(false) => else_branch,
                cond => {
                    if then_branch == else_branch {
                        then_branch
                    } else if negative_polarity(&cond) {
                        // Orient the condition so complementary guards
                        // with swapped branches compare equal.
                        Formula::ite(simplify_not(cond), else_branch, then_branch)
                    } else {
                        Formula::ite(cond, then_branch, else_branch)
                    }
                }
            }
        }

        Formula::Not(inner) => simplify_not(simplify(inner)),

        Formula::And(items) => {
            let mut flat = Vec::new();
            for item in items {
                match simplify(item) {
                    Formula::Bool(true) => {}
                    Formula::Bool(false) => return Formula::Bool(false),
                    Formula::And(nested) => flat.extend(nested),
                    other => {
                        if !flat.contains(&other) {
                            flat.push(other);
                        }
                    }
                }
            }
            if has_complement(&flat) {
                return Formula::Bool(false);
            }
            match flat.len() {
                0 => Formula::Bool(true),
                1 => flat.pop().unwrap_or(Formula::Bool(true)),
                _ => Formula::And(flat),
            }
        }

        Formula::Or(items) => {
            let mut flat = Vec::new();
            for item in items {
                match simplify(item) {
                    Formula::Bool(false) => {}
                    Formula::Bool(true) => return Formula::Bool(true),
                    Formula::Or(nested) => flat.extend(nested),
                    other => {
                        if !flat.contains(&other) {
                            flat.push(other);
                        }
                    }
                }
            }
            if has_complement(&flat) {
                return Formula::Bool(true);
            }
            match flat.len() {
                0 => Formula::Bool(false),
                1 => flat.pop().unwrap_or(Formula::Bool(false)),
                _ => Formula::Or(flat),
            }
        }
    }
}

/// Whether an ite condition is the negatively-oriented member of a
/// complement pair: an explicit `Not`, or a canonical `<= 0` atom whose
/// leading coefficient is negative.
fn negative_polarity(cond: &Formula) -> bool {
    match cond {
        Formula::Not(_) => true,
        Formula::Cmp { op: CmpOp::Le, lhs, rhs } => {
            **rhs == Formula::Int(0) && leading_coefficient_negative(lhs)
        }
        _ => false,
    }
}

fn leading_coefficient_negative(formula: &Formula) -> bool {
    match formula {
        Formula::Sym(_) => false,
        Formula::Int(n) => *n < 0,
        Formula::Bin {
            op: BinOp::Add, lhs, ..
        } => leading_coefficient_negative(lhs),
        Formula::Bin {
            op: BinOp::Mul, lhs, ..
        } => match lhs.as_ref() {
            Formula::Int(c) => *c < 0,
            _ => false,
        },
        _ => false,
    }
}

/// A literal and its simplified negation appearing side by side.
fn has_complement(items: &[Formula]) -> bool {
    items.iter().any(|item| {
        let negated = simplify_not(item.clone());
        items.iter().any(|other| *other == negated)
    })
}

fn simplify_bin(op: BinOp, lhs: Formula, rhs: Formula) -> Formula {
    if let (Formula::Int(a), Formula::Int(b)) = (&lhs, &rhs) {
        // Constant folding with checked arithmetic. Overflow and division
        // by zero stay symbolic.
        let folded = match op {
            BinOp::Add => a.checked_add(*b),
            BinOp::Sub => a.checked_sub(*b),
            BinOp::Mul => a.checked_mul(*b),
            BinOp::Div => {
                if *b == 0 {
                    None
                } else {
                    a.checked_div_euclid(*b)
                }
            }
        };
        if let Some(n) = folded {
            return Formula::Int(n);
        }
    }

    match (op, &lhs, &rhs) {
        (BinOp::Add, Formula::Int(0), _) => rhs,
        (BinOp::Add, _, Formula::Int(0)) => lhs,
        (BinOp::Sub, _, Formula::Int(0)) => lhs,
        (BinOp::Mul, Formula::Int(1), _) => rhs,
        (BinOp::Mul, _, Formula::Int(1)) => lhs,
        (BinOp::Mul, Formula::Int(0), _) | (BinOp::Mul, _, Formula::Int(0)) => Formula::Int(0),
        (BinOp::Div, _, Formula::Int(1)) => lhs,
        _ => Formula::bin(op, lhs, rhs),
    }
}

fn simplify_cmp(op: CmpOp, lhs: Formula, rhs: Formula) -> Formula {
    if let (Formula::Int(a), Formula::Int(b)) = (&lhs, &rhs) {
        return Formula::Bool(compare(op, *a, *b));
    }

    // Structurally identical sides decide reflexive operators.
    if lhs == rhs {
        return match op {
            CmpOp::Eq | CmpOp::Le | CmpOp::Ge => Formula::Bool(true),
            CmpOp::Ne | CmpOp::Lt | CmpOp::Gt => Formula::Bool(false),
        };
    }

    if let Some(canonical) = canonicalize_linear(op, &lhs, &rhs) {
        return canonical;
    }

    Formula::cmp(op, lhs, rhs)
}

fn simplify_not(inner: Formula) -> Formula {
    match inner {
        Formula::Bool(b) => Formula::Bool(!b),
        Formula::Not(nested) => *nested,
        Formula::Cmp { op, lhs, rhs } => simplify_cmp(op.negated(), *lhs, *rhs),
        other => Formula::not(other),
    }
}

pub fn compare(op: CmpOp, a: i64, b: i64) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

// ─── Linear atom canonicalization ────────────────────────────────────

/// A linear integer term: sum of coefficient * symbol, plus a constant.
struct Lin {
    coeffs: BTreeMap<String, i64>,
    constant: i64,
}

impl Lin {
    fn constant(n: i64) -> Lin {
        Lin {
            coeffs: BTreeMap::new(),
            constant: n,
        }
    }

    fn sym(name: &str) -> Lin {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(name.to_string(), 1);
        Lin {
            coeffs,
            constant: 0,
        }
    }

    fn add(mut self, other: Lin) -> Option<Lin> {
        for (name, c) in other.coeffs {
            let entry = self.coeffs.entry(name).or_insert(0);
            *entry = entry.checked_add(c)?;
        }
        self.constant = self.constant.checked_add(other.constant)?;
        self.coeffs.retain(|_, c| *c != 0);
        Some(self)
    }

    fn negate(mut self) -> Option<Lin> {
        for c in self.coeffs.values_mut() {
            *c = c.checked_neg()?;
        }
        self.constant = self.constant.checked_neg()?;
        Some(self)
    }

    fn scale(mut self, factor: i64) -> Option<Lin> {
        for c in self.coeffs.values_mut() {
            *c = c.checked_mul(factor)?;
        }
        self.constant = self.constant.checked_mul(factor)?;
        self.coeffs.retain(|_, c| *c != 0);
        Some(self)
    }
}

fn linearize(formula: &Formula) -> Option<Lin> {
    match formula {
        Formula::Int(n) => Some(Lin::constant(*n)),
        Formula::Sym(name) => Some(Lin::sym(name)),
        Formula::Bin { op, lhs, rhs } => match op {
            BinOp::Add => linearize(lhs)?.add(linearize(rhs)?),
            BinOp::Sub => linearize(lhs)?.add(linearize(rhs)?.negate()?),
            BinOp::Mul => {
                let l = linearize(lhs)?;
                let r = linearize(rhs)?;
                if l.coeffs.is_empty() {
                    r.scale(l.constant)
                } else if r.coeffs.is_empty() {
                    l.scale(r.constant)
                } else {
                    None
                }
            }
            BinOp::Div => None,
        },
        _ => None,
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a as i64
}

/// Normalize `lhs op rhs` over a linear difference `d = lhs - rhs`:
///
///   - `Eq` becomes `d' == 0` with gcd-reduced coefficients, refuted
///     outright when the gcd does not divide the constant,
///   - `Ne` becomes the negation of the `Eq` form,
///   - every inequality becomes `d' <= 0`, using that for integers
///     `g*x <= c` is equivalent to `x <= floor(c/g)`.
fn canonicalize_linear(op: CmpOp, lhs: &Formula, rhs: &Formula) -> Option<Formula> {
    let diff = linearize(lhs)?.add(linearize(rhs)?.negate()?)?;

    match op {
        CmpOp::Eq => canonical_eq(diff),
        CmpOp::Ne => match canonical_eq(diff)? {
            Formula::Bool(b) => Some(Formula::Bool(!b)),
            eq => Some(Formula::not(eq)),
        },
        CmpOp::Le => canonical_le(diff),
        CmpOp::Lt => canonical_le(bump(diff, 1)?),
        CmpOp::Ge => canonical_le(diff.negate()?),
        CmpOp::Gt => canonical_le(bump(diff.negate()?, 1)?),
    }
}

/// `d + n`, used to turn strict inequalities into non-strict ones.
fn bump(mut diff: Lin, n: i64) -> Option<Lin> {
    diff.constant = diff.constant.checked_add(n)?;
    Some(diff)
}

fn canonical_eq(mut diff: Lin) -> Option<Formula> {
    if diff.coeffs.is_empty() {
        return Some(Formula::Bool(diff.constant == 0));
    }
    let g = diff.coeffs.values().fold(0, |acc, c| gcd(acc, *c));
    if diff.constant % g != 0 {
        // No integer point: the gcd of the coefficients must divide the
        // constant for a solution to exist.
        return Some(Formula::Bool(false));
    }
    for c in diff.coeffs.values_mut() {
        *c /= g;
    }
    diff.constant /= g;
    // Sign-normalize so `x == y` and `y == x` agree: first coefficient
    // positive.
    let leading_negative = diff.coeffs.values().next().is_some_and(|c| *c < 0);
    if leading_negative {
        diff = diff.negate()?;
    }
    Some(Formula::cmp(CmpOp::Eq, rebuild(&diff), Formula::Int(0)))
}

fn canonical_le(mut diff: Lin) -> Option<Formula> {
    if diff.coeffs.is_empty() {
        return Some(Formula::Bool(diff.constant <= 0));
    }
    let g = diff.coeffs.values().fold(0, |acc, c| gcd(acc, *c));
    if g > 1 {
        for c in diff.coeffs.values_mut() {
            *c /= g;
        }
        // sum(c*x) <= -k  tightens to  sum(c/g * x) <= floor(-k/g)
        diff.constant = diff.constant.checked_neg()?.div_euclid(g).checked_neg()?;
    }
    Some(Formula::cmp(CmpOp::Le, rebuild(&diff), Formula::Int(0)))
}

/// Rebuild a canonical linear formula: coefficient-weighted symbols in
/// name order, constant last.
fn rebuild(lin: &Lin) -> Formula {
    let mut acc: Option<Formula> = None;
    for (name, c) in &lin.coeffs {
        let term = if *c == 1 {
            Formula::Sym(name.clone())
        } else {
            Formula::bin(BinOp::Mul, Formula::Int(*c), Formula::Sym(name.clone()))
        };
        acc = Some(match acc {
            Some(prev) => Formula::bin(BinOp::Add, prev, term),
            None => term,
        });
    }
    let base = match acc {
        Some(f) => f,
        None => return Formula::Int(lin.constant),
    };
    if lin.constant == 0 {
        base
    } else {
        Formula::bin(BinOp::Add, base, Formula::Int(lin.constant))
    }
}
