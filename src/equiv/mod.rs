//! Equivalence checking of two programs.
//!
//! Both programs are lowered to SSA over a shared input space: a free
//! variable `x` names the same unknown in both. The checker then asks a
//! single satisfiability query: is there an input on which the programs
//! disagree, either in a common output or in whether their assertions
//! hold? `Unsat` means equivalent within the unroll bound; a model is a
//! counterexample; `Unknown` stays `Unknown`.

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;

use crate::ast::{CmpOp, Program};
use crate::smt::{self, SmtConfig, SmtStatus};
use crate::solve::{self, search, Formula, Model, Outcome, Query, SolverConfig};
use crate::ssa::{self, SsaProgram, SsaStmt, Term, DEFAULT_UNROLL_BOUND};

#[derive(Clone, Debug)]
pub enum Backend {
    /// The built-in simplify-and-search procedure.
    Search,
    /// An external SMT solver process.
    Smt(SmtConfig),
}

#[derive(Clone, Debug)]
pub struct EquivConfig {
    /// Loop unroll depth for both programs.
    pub bound: u32,
    pub solver: SolverConfig,
    pub backend: Backend,
}

impl Default for EquivConfig {
    fn default() -> Self {
        Self {
            bound: DEFAULT_UNROLL_BOUND,
            solver: SolverConfig::default(),
            backend: Backend::Search,
        }
    }
}

/// A concrete input on which the two programs disagree.
#[derive(Clone, Debug)]
pub struct Counterexample {
    pub inputs: BTreeMap<String, i64>,
    /// Final value per common output, `None` when execution hits an
    /// undefined operation on this input.
    pub outputs_a: BTreeMap<String, Option<i64>>,
    pub outputs_b: BTreeMap<String, Option<i64>>,
    /// Whether each program's obligations hold on this input. `None`
    /// when an obligation itself is undefined.
    pub ok_a: Option<bool>,
    pub ok_b: Option<bool>,
}

#[derive(Clone, Debug)]
pub enum Verdict {
    Equivalent,
    NotEquivalent(Counterexample),
    Unknown(String),
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Equivalent => write!(f, "EQUIVALENT"),
            Verdict::NotEquivalent(_) => write!(f, "NOT EQUIVALENT"),
            Verdict::Unknown(_) => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum AssertionVerdict {
    /// Every assertion and division obligation holds on all inputs,
    /// within the unroll bound.
    Hold,
    /// Some input violates an obligation; the witness binds the free
    /// variables.
    Violated(BTreeMap<String, i64>),
    Unknown(String),
}

impl fmt::Display for AssertionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionVerdict::Hold => write!(f, "ASSERTIONS HOLD"),
            AssertionVerdict::Violated(_) => write!(f, "ASSERTION VIOLATED"),
            AssertionVerdict::Unknown(_) => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AssertionResult {
    pub verdict: AssertionVerdict,
    /// Which stage produced the verdict: `trivial`, `search`, or `smt`.
    pub method: String,
    /// Number of obligations checked (asserts plus division sites).
    pub obligations: usize,
    pub free_vars: BTreeSet<String>,
    pub bound: u32,
}

#[derive(Clone, Debug)]
pub struct EquivalenceResult {
    pub verdict: Verdict,
    /// Which stage produced the verdict: `ssa-hash`, `search`, or `smt`.
    pub method: String,
    /// Common outputs the verdict covers.
    pub outputs: Vec<String>,
    /// Shared input space of the two programs.
    pub free_vars: BTreeSet<String>,
    pub bound: u32,
}

/// Check two programs for equivalence within the unroll bound.
pub fn check_equivalence(
    a: &Program,
    b: &Program,
    config: &EquivConfig,
) -> io::Result<EquivalenceResult> {
    let ssa_a = ssa::convert(a, config.bound);
    let ssa_b = ssa::convert(b, config.bound);

    let outputs: Vec<String> = ssa_a
        .exit_versions
        .keys()
        .filter(|name| ssa_b.exit_versions.contains_key(*name))
        .cloned()
        .collect();
    let free_vars: BTreeSet<String> = ssa_a
        .free_vars
        .union(&ssa_b.free_vars)
        .cloned()
        .collect();

    // Identical SSA is equivalent without touching a solver.
    if check_hash_equivalence(&ssa_a, &ssa_b) {
        return Ok(EquivalenceResult {
            verdict: Verdict::Equivalent,
            method: "ssa-hash".to_string(),
            outputs,
            free_vars,
            bound: config.bound,
        });
    }

    let query = build_query(&ssa_a, &ssa_b, &outputs);

    let (verdict, method) = match &config.backend {
        Backend::Search => {
            let verdict = match solve::solve(&query, &config.solver) {
                Outcome::Unsat => Verdict::Equivalent,
                Outcome::Sat(model) => {
                    Verdict::NotEquivalent(build_counterexample(&query, &ssa_a, &ssa_b, model))
                }
                Outcome::Unknown(reason) => Verdict::Unknown(reason),
            };
            (verdict, "search")
        }
        Backend::Smt(smt_config) => {
            let script = smt::encode_query(&query);
            let result = smt::run_solver(&script, smt_config)?;
            let verdict = match result.status {
                SmtStatus::Unsat => Verdict::Equivalent,
                SmtStatus::Sat => Verdict::NotEquivalent(build_counterexample(
                    &query,
                    &ssa_a,
                    &ssa_b,
                    result.model,
                )),
                SmtStatus::Unknown => {
                    Verdict::Unknown("solver returned unknown".to_string())
                }
                SmtStatus::Error(message) => {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("solver error: {}", message),
                    ))
                }
            };
            (verdict, "smt")
        }
    };

    Ok(EquivalenceResult {
        verdict,
        method: method.to_string(),
        outputs,
        free_vars,
        bound: config.bound,
    })
}

/// Check a single program's assertions and division obligations: is
/// there an input under which some obligation fails within the unroll
/// bound? `Unsat` on the violation query means they always hold.
pub fn check_assertions(
    program: &Program,
    config: &EquivConfig,
) -> io::Result<AssertionResult> {
    let ssa = ssa::convert(program, config.bound);
    let obligations = ssa.obligations().count();
    let free_vars = ssa.free_vars.clone();

    if obligations == 0 {
        return Ok(AssertionResult {
            verdict: AssertionVerdict::Hold,
            method: "trivial".to_string(),
            obligations,
            free_vars,
            bound: config.bound,
        });
    }

    let mut defs = Vec::new();
    defs_of(&ssa, "p_", &mut defs);
    let query = Query {
        defs,
        goal: Formula::not(obligations_hold(&ssa, "p_")),
    };

    let (verdict, method) = match &config.backend {
        Backend::Search => {
            let verdict = match solve::solve(&query, &config.solver) {
                Outcome::Unsat => AssertionVerdict::Hold,
                Outcome::Sat(model) => {
                    AssertionVerdict::Violated(bind_inputs(&query, &model))
                }
                Outcome::Unknown(reason) => AssertionVerdict::Unknown(reason),
            };
            (verdict, "search")
        }
        Backend::Smt(smt_config) => {
            let script = smt::encode_query(&query);
            let result = smt::run_solver(&script, smt_config)?;
            let verdict = match result.status {
                SmtStatus::Unsat => AssertionVerdict::Hold,
                SmtStatus::Sat => {
                    AssertionVerdict::Violated(bind_inputs(&query, &result.model))
                }
                SmtStatus::Unknown => {
                    AssertionVerdict::Unknown("solver returned unknown".to_string())
                }
                SmtStatus::Error(message) => {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("solver error: {}", message),
                    ))
                }
            };
            (verdict, "smt")
        }
    };

    Ok(AssertionResult {
        verdict,
        method: method.to_string(),
        obligations,
        free_vars,
        bound: config.bound,
    })
}

/// The SMT-LIB2 script for the disagreement query, for offline use with
/// any SMT-LIB solver.
pub fn disagreement_script(a: &Program, b: &Program, bound: u32) -> String {
    let ssa_a = ssa::convert(a, bound);
    let ssa_b = ssa::convert(b, bound);
    let outputs: Vec<String> = ssa_a
        .exit_versions
        .keys()
        .filter(|name| ssa_b.exit_versions.contains_key(*name))
        .cloned()
        .collect();
    smt::encode_query(&build_query(&ssa_a, &ssa_b, &outputs))
}

/// Byte-identical SSA forms are trivially equivalent.
pub fn check_hash_equivalence(a: &SsaProgram, b: &SsaProgram) -> bool {
    blake3::hash(a.to_string().as_bytes()) == blake3::hash(b.to_string().as_bytes())
}

// ─── Query construction ──────────────────────────────────────────────

/// Map an SSA term to a formula. Free variables (version 0) keep their
/// bare name, so both programs read the same unknowns; defined versions
/// get the program prefix.
fn term_to_formula(term: &Term, prefix: &str) -> Formula {
    match term {
        Term::Const(n) => Formula::Int(*n),
        Term::Var(v) => {
            if v.is_free() {
                Formula::Sym(v.name.clone())
            } else {
                Formula::Sym(format!("{}{}", prefix, v))
            }
        }
        Term::Bin { op, lhs, rhs } => Formula::bin(
            *op,
            term_to_formula(lhs, prefix),
            term_to_formula(rhs, prefix),
        ),
        Term::Cmp { op, lhs, rhs } => Formula::cmp(
            *op,
            term_to_formula(lhs, prefix),
            term_to_formula(rhs, prefix),
        ),
        Term::Ite {
            cond,
            then_term,
            else_term,
        } => Formula::ite(
            term_to_formula(cond, prefix),
            term_to_formula(then_term, prefix),
            term_to_formula(else_term, prefix),
        ),
    }
}

fn defs_of(program: &SsaProgram, prefix: &str, out: &mut Vec<(String, Formula)>) {
    for stmt in &program.stmts {
        if let SsaStmt::Define { var, value } = stmt {
            out.push((
                format!("{}{}", prefix, var),
                term_to_formula(value, prefix),
            ));
        }
    }
}

/// The conjunction of a program's obligations, each weakened by its
/// branch guards: an assert only binds on paths that reach it.
fn obligations_hold(program: &SsaProgram, prefix: &str) -> Formula {
    let mut conjuncts = Vec::new();
    for (path, cond) in program.obligations() {
        let cond = term_to_formula(cond, prefix);
        let guarded = if path.is_empty() {
            cond
        } else {
            let guards: Vec<Formula> =
                path.iter().map(|g| term_to_formula(g, prefix)).collect();
            Formula::Or(vec![Formula::not(Formula::And(guards)), cond])
        };
        conjuncts.push(guarded);
    }
    if conjuncts.is_empty() {
        Formula::Bool(true)
    } else {
        Formula::And(conjuncts)
    }
}

fn exit_symbol(program: &SsaProgram, prefix: &str, name: &str) -> Formula {
    match program.exit_versions.get(name) {
        Some(version) => Formula::Sym(format!("{}{}__{}", prefix, name, version)),
        None => Formula::Sym(name.to_string()),
    }
}

/// The disagreement query: satisfiable iff some input makes the programs
/// differ in obligation status or in a common output.
fn build_query(ssa_a: &SsaProgram, ssa_b: &SsaProgram, outputs: &[String]) -> Query {
    let mut defs = Vec::new();
    defs_of(ssa_a, "a_", &mut defs);
    defs_of(ssa_b, "b_", &mut defs);

    let ok_a = obligations_hold(ssa_a, "a_");
    let ok_b = obligations_hold(ssa_b, "b_");

    let diffs: Vec<Formula> = outputs
        .iter()
        .map(|name| {
            Formula::cmp(
                CmpOp::Ne,
                exit_symbol(ssa_a, "a_", name),
                exit_symbol(ssa_b, "b_", name),
            )
        })
        .collect();

    let goal = Formula::Or(vec![
        Formula::And(vec![ok_a.clone(), Formula::not(ok_b.clone())]),
        Formula::And(vec![Formula::not(ok_a.clone()), ok_b.clone()]),
        Formula::And(vec![ok_a, ok_b, Formula::Or(diffs)]),
    ]);

    Query { defs, goal }
}

// ─── Counterexample reconstruction ───────────────────────────────────

/// Bind every free symbol of the query from the model, defaulting to 0
/// for symbols the solver left unconstrained.
fn bind_inputs(query: &Query, model: &Model) -> Model {
    query
        .free_symbols()
        .into_iter()
        .map(|name| {
            let value = model.get(&name).copied().unwrap_or(0);
            (name, value)
        })
        .collect()
}

/// Replay a model through both programs: bind the free symbols, evaluate
/// the defines in order, and read off outputs and obligation status.
fn build_counterexample(
    query: &Query,
    ssa_a: &SsaProgram,
    ssa_b: &SsaProgram,
    model: Model,
) -> Counterexample {
    let mut env: Model = bind_inputs(query, &model);
    let inputs = env.clone();

    for (name, formula) in &query.defs {
        if let Some(value) = search::eval_int(formula, &env) {
            env.insert(name.clone(), value);
        }
    }

    let read_outputs = |program: &SsaProgram, prefix: &str| -> BTreeMap<String, Option<i64>> {
        program
            .exit_versions
            .iter()
            .map(|(name, version)| {
                let sym = format!("{}{}__{}", prefix, name, version);
                (name.clone(), env.get(&sym).copied())
            })
            .collect()
    };

    let outputs_a = read_outputs(ssa_a, "a_");
    let outputs_b = read_outputs(ssa_b, "b_");
    let ok_a = search::eval_bool(&obligations_hold(ssa_a, "a_"), &env);
    let ok_b = search::eval_bool(&obligations_hold(ssa_b, "b_"), &env);

    Counterexample {
        inputs,
        outputs_a,
        outputs_b,
        ok_a,
        ok_b,
    }
}

// ─── Reporting ───────────────────────────────────────────────────────

fn format_value(value: &Option<i64>) -> String {
    match value {
        Some(n) => n.to_string(),
        None => "undefined".to_string(),
    }
}

fn format_ok(ok: &Option<bool>) -> &'static str {
    match ok {
        Some(true) => "assertions hold",
        Some(false) => "assertion violated",
        None => "assertion undefined",
    }
}

/// Human-readable summary of a single-program assertion check.
pub fn format_assertion_report(result: &AssertionResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("verdict: {}\n", result.verdict));
    out.push_str(&format!(
        "method: {} (unroll bound {})\n",
        result.method, result.bound
    ));
    out.push_str(&format!("obligations checked: {}\n", result.obligations));

    match &result.verdict {
        AssertionVerdict::Hold => {}
        AssertionVerdict::Unknown(reason) => {
            out.push_str(&format!("reason: {}\n", reason));
        }
        AssertionVerdict::Violated(witness) => {
            if witness.is_empty() {
                out.push_str("violated on every input\n");
            } else {
                let inputs: Vec<String> = witness
                    .iter()
                    .map(|(name, value)| format!("{} = {}", name, value))
                    .collect();
                out.push_str(&format!("violated at: {}\n", inputs.join(", ")));
            }
        }
    }
    out
}

/// Human-readable summary of a check.
pub fn format_report(result: &EquivalenceResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("verdict: {}\n", result.verdict));
    out.push_str(&format!(
        "method: {} (unroll bound {})\n",
        result.method, result.bound
    ));
    if !result.outputs.is_empty() {
        out.push_str(&format!("outputs compared: {}\n", result.outputs.join(", ")));
    }

    match &result.verdict {
        Verdict::Equivalent => {}
        Verdict::Unknown(reason) => {
            out.push_str(&format!("reason: {}\n", reason));
        }
        Verdict::NotEquivalent(cex) => {
            if cex.inputs.is_empty() {
                out.push_str("programs differ on every input\n");
            } else {
                let inputs: Vec<String> = cex
                    .inputs
                    .iter()
                    .map(|(name, value)| format!("{} = {}", name, value))
                    .collect();
                out.push_str(&format!("counterexample: {}\n", inputs.join(", ")));
            }
            for (label, outputs, ok) in [
                ("program a", &cex.outputs_a, &cex.ok_a),
                ("program b", &cex.outputs_b, &cex.ok_b),
            ] {
                let values: Vec<String> = outputs
                    .iter()
                    .map(|(name, value)| format!("{} = {}", name, format_value(value)))
                    .collect();
                if values.is_empty() {
                    out.push_str(&format!("{}: {}\n", label, format_ok(ok)));
                } else {
                    out.push_str(&format!(
                        "{}: {} ({})\n",
                        label,
                        values.join(", "),
                        format_ok(ok)
                    ));
                }
            }
        }
    }
    out
}
