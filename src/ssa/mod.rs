//! Static single assignment conversion.
//!
//! Programs are lowered to a flat list of versioned defines plus proof
//! obligations. Loops are unrolled to a fixed depth first, so the result
//! is loop-free and every variable is written exactly once.

pub mod unroll;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ast::{BinOp, Block, CmpOp, Expr, Program, Stmt};
use crate::span::Spanned;

/// Default loop unroll depth.
pub const DEFAULT_UNROLL_BOUND: u32 = 3;

/// A versioned variable. Version 0 is reserved for the initial (free)
/// value of a variable read before any write.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SsaVar {
    pub name: String,
    pub version: u32,
}

impl SsaVar {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    pub fn is_free(&self) -> bool {
        self.version == 0
    }
}

impl fmt::Display for SsaVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}", self.name, self.version)
    }
}

/// A pure integer- or boolean-valued term over SSA variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Const(i64),
    Var(SsaVar),
    Bin {
        op: BinOp,
        lhs: Box<Term>,
        rhs: Box<Term>,
    },
    Cmp {
        op: CmpOp,
        lhs: Box<Term>,
        rhs: Box<Term>,
    },
    Ite {
        cond: Box<Term>,
        then_term: Box<Term>,
        else_term: Box<Term>,
    },
}

impl Term {
    pub fn bin(op: BinOp, lhs: Term, rhs: Term) -> Term {
        Term::Bin {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn cmp(op: CmpOp, lhs: Term, rhs: Term) -> Term {
        Term::Cmp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn ite(cond: Term, then_term: Term, else_term: Term) -> Term {
        Term::Ite {
            cond: Box::new(cond),
            then_term: Box::new(then_term),
            else_term: Box::new(else_term),
        }
    }

    /// Negate a boolean-valued term. Conditions are always comparisons,
    /// so negation flips the operator.
    pub fn negate(&self) -> Term {
        match self {
            Term::Cmp { op, lhs, rhs } => Term::Cmp {
                op: op.negated(),
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
            other => Term::cmp(CmpOp::Eq, other.clone(), Term::Const(0)),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Const(n) => write!(f, "{}", n),
            Term::Var(v) => write!(f, "{}", v),
            Term::Bin { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.as_str(), rhs),
            Term::Cmp { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.as_str(), rhs),
            Term::Ite {
                cond,
                then_term,
                else_term,
            } => write!(f, "ite({}, {}, {})", cond, then_term, else_term),
        }
    }
}

/// One step of the SSA form.
#[derive(Clone, Debug, PartialEq)]
pub enum SsaStmt {
    /// `var := value`. Each var is defined at most once.
    Define { var: SsaVar, value: Term },
    /// An assertion that must hold whenever all of `path` hold. The path
    /// records the branch guards enclosing the original assert, so an
    /// assert inside an untaken branch carries no weight.
    Obligation { path: Vec<Term>, cond: Term },
}

/// The SSA form of a whole program.
#[derive(Clone, Debug)]
pub struct SsaProgram {
    pub stmts: Vec<SsaStmt>,
    /// Final version of every variable the program writes.
    pub exit_versions: BTreeMap<String, u32>,
    /// Variables read before any write. Their version-0 values are the
    /// program's inputs.
    pub free_vars: BTreeSet<String>,
}

impl SsaProgram {
    /// All obligations with their enclosing branch guards.
    pub fn obligations(&self) -> impl Iterator<Item = (&[Term], &Term)> + '_ {
        self.stmts.iter().filter_map(|s| match s {
            SsaStmt::Obligation { path, cond } => Some((path.as_slice(), cond)),
            SsaStmt::Define { .. } => None,
        })
    }
}

impl fmt::Display for SsaProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.stmts {
            match stmt {
                SsaStmt::Define { var, value } => writeln!(f, "{} := {}", var, value)?,
                SsaStmt::Obligation { path, cond } => {
                    if path.is_empty() {
                        writeln!(f, "obligation {}", cond)?;
                    } else {
                        let guards: Vec<String> = path.iter().map(|g| g.to_string()).collect();
                        writeln!(f, "obligation [{}] {}", guards.join(" && "), cond)?;
                    }
                }
            }
        }
        for (name, version) in &self.exit_versions {
            writeln!(f, "exit {} = {}__{}", name, name, version)?;
        }
        for name in &self.free_vars {
            writeln!(f, "free {}", name)?;
        }
        Ok(())
    }
}

/// Convert a program to SSA form, unrolling loops to `bound` iterations.
pub fn convert(program: &Program, bound: u32) -> SsaProgram {
    let mut converter = Converter::new(bound);
    for stmt in &program.stmts {
        converter.convert_stmt(stmt);
    }
    SsaProgram {
        stmts: converter.stmts,
        exit_versions: converter
            .env
            .into_iter()
            .filter(|(_, v)| *v > 0)
            .collect(),
        free_vars: converter.free,
    }
}

struct Converter {
    /// Highest version issued per name, across all branches.
    counters: BTreeMap<String, u32>,
    /// Version currently visible per name.
    env: BTreeMap<String, u32>,
    free: BTreeSet<String>,
    /// Branch guards enclosing the current statement.
    path: Vec<Term>,
    stmts: Vec<SsaStmt>,
    bound: u32,
}

impl Converter {
    fn new(bound: u32) -> Self {
        Self {
            counters: BTreeMap::new(),
            env: BTreeMap::new(),
            free: BTreeSet::new(),
            path: Vec::new(),
            stmts: Vec::new(),
            bound,
        }
    }

    fn convert_stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Assign { name, value } => {
                // The value reads the pre-assignment versions, so
                // `x := x + 1` picks up the old x.
                let value = self.convert_expr(&value.node);
                let var = self.define(&name.node);
                self.stmts.push(SsaStmt::Define { var, value });
            }
            Stmt::Assert { cond } => {
                let cond = self.convert_condition(&cond.node);
                self.stmts.push(SsaStmt::Obligation {
                    path: self.path.clone(),
                    cond,
                });
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let guard = self.convert_condition(&cond.node);
                self.convert_if(guard, then_block, else_block.as_ref());
            }
            Stmt::While { cond, body } => {
                let unrolled = unroll::unroll_while(cond, body, self.bound);
                for s in &unrolled {
                    self.convert_stmt(s);
                }
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                let unrolled = unroll::unroll_for(init, cond, step, body, self.bound);
                for s in &unrolled {
                    self.convert_stmt(s);
                }
            }
            Stmt::Block(block) => self.convert_block(&block.node),
        }
    }

    fn convert_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.convert_stmt(stmt);
        }
    }

    /// Convert both branches from the same entry environment, then merge
    /// with one ite define per variable assigned in either branch.
    fn convert_if(
        &mut self,
        guard: Term,
        then_block: &Spanned<Block>,
        else_block: Option<&Spanned<Block>>,
    ) {
        let entry = self.env.clone();

        self.path.push(guard.clone());
        self.convert_block(&then_block.node);
        let then_env = std::mem::replace(&mut self.env, entry.clone());
        self.path.pop();

        self.path.push(guard.negate());
        if let Some(block) = else_block {
            self.convert_block(&block.node);
        }
        let else_env = std::mem::replace(&mut self.env, entry.clone());
        self.path.pop();

        // Names written in either branch, in deterministic order. A
        // version-0 entry only records a free read, not a write.
        let mut written: BTreeSet<&String> = BTreeSet::new();
        for (name, version) in then_env.iter().chain(else_env.iter()) {
            if *version > 0 && entry.get(name) != Some(version) {
                written.insert(name);
            }
        }

        let merges: Vec<(String, Term)> = written
            .into_iter()
            .map(|name| {
                let then_var = self.branch_exit(name, &then_env);
                let else_var = self.branch_exit(name, &else_env);
                let value = Term::ite(guard.clone(), Term::Var(then_var), Term::Var(else_var));
                (name.clone(), value)
            })
            .collect();
        for (name, value) in merges {
            let var = self.define(&name);
            self.stmts.push(SsaStmt::Define { var, value });
        }
    }

    /// The version of `name` visible at a branch exit. A branch that never
    /// wrote the name falls back to its entry version, or to the free
    /// version 0 if it was never written at all.
    fn branch_exit(&mut self, name: &str, branch_env: &BTreeMap<String, u32>) -> SsaVar {
        match branch_env.get(name) {
            Some(version) => SsaVar::new(name, *version),
            None => {
                self.free.insert(name.to_string());
                SsaVar::new(name, 0)
            }
        }
    }

    /// Issue the next version of `name` and make it the visible one.
    fn define(&mut self, name: &str) -> SsaVar {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        let version = *counter;
        self.env.insert(name.to_string(), version);
        SsaVar::new(name, version)
    }

    /// The currently visible version of `name`, registering it as free on
    /// first read-before-write.
    fn read(&mut self, name: &str) -> SsaVar {
        match self.env.get(name) {
            Some(version) => SsaVar::new(name, *version),
            None => {
                self.free.insert(name.to_string());
                self.env.insert(name.to_string(), 0);
                SsaVar::new(name, 0)
            }
        }
    }

    fn convert_expr(&mut self, expr: &Expr) -> Term {
        match expr {
            Expr::Number(n) => Term::Const(*n),
            Expr::Var(name) => Term::Var(self.read(name)),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.convert_expr(&lhs.node);
                let rhs = self.convert_expr(&rhs.node);
                if *op == BinOp::Div {
                    // Every division carries a nonzero-divisor obligation
                    // under the current branch guards.
                    self.stmts.push(SsaStmt::Obligation {
                        path: self.path.clone(),
                        cond: Term::cmp(CmpOp::Ne, rhs.clone(), Term::Const(0)),
                    });
                }
                Term::bin(*op, lhs, rhs)
            }
            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.convert_expr(&lhs.node);
                let rhs = self.convert_expr(&rhs.node);
                Term::cmp(*op, lhs, rhs)
            }
        }
    }

    /// Convert an expression used in boolean position. Arithmetic terms
    /// are taken as `t != 0`.
    fn convert_condition(&mut self, expr: &Expr) -> Term {
        let term = self.convert_expr(expr);
        match term {
            Term::Cmp { .. } => term,
            other => Term::cmp(CmpOp::Ne, other, Term::Const(0)),
        }
    }
}
