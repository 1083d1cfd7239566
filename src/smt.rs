//! SMT-LIB2 encoding and the external `z3` backend.
//!
//! The built-in solver is incomplete by design; piping the same query to
//! z3 trades hermeticity for completeness. The encoding mirrors the query
//! shape directly: free symbols become constants, defines become
//! zero-argument functions, the goal becomes the single assertion.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use crate::ast::{BinOp, CmpOp};
use crate::solve::{Formula, Model, Query};

#[derive(Clone, Debug)]
pub struct SmtConfig {
    /// Solver binary to invoke.
    pub cmd: String,
    pub timeout_ms: u64,
}

impl Default for SmtConfig {
    fn default() -> Self {
        Self {
            cmd: "z3".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SmtStatus {
    Sat,
    Unsat,
    Unknown,
    Error(String),
}

#[derive(Clone, Debug)]
pub struct SmtResult {
    pub status: SmtStatus,
    pub model: Model,
}

/// Render a query as a complete SMT-LIB2 script.
pub fn encode_query(query: &Query) -> String {
    let mut script = String::new();
    script.push_str("(set-option :produce-models true)\n");
    script.push_str("(set-logic ALL)\n");
    for name in query.free_symbols() {
        script.push_str(&format!("(declare-const {} Int)\n", name));
    }
    for (name, formula) in &query.defs {
        script.push_str(&format!("(define-fun {} () Int {})\n", name, to_smt(formula)));
    }
    script.push_str(&format!("(assert {})\n", to_smt(&query.goal)));
    script.push_str("(check-sat)\n");
    script.push_str("(get-model)\n");
    script
}

fn to_smt(formula: &Formula) -> String {
    match formula {
        Formula::Bool(b) => b.to_string(),
        Formula::Int(n) => {
            if *n < 0 {
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        Formula::Sym(name) => name.clone(),
        Formula::Bin { op, lhs, rhs } => {
            let op = match op {
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
                BinOp::Div => "div",
            };
            format!("({} {} {})", op, to_smt(lhs), to_smt(rhs))
        }
        Formula::Cmp { op, lhs, rhs } => match op {
            CmpOp::Eq => format!("(= {} {})", to_smt(lhs), to_smt(rhs)),
            CmpOp::Ne => format!("(not (= {} {}))", to_smt(lhs), to_smt(rhs)),
            CmpOp::Lt => format!("(< {} {})", to_smt(lhs), to_smt(rhs)),
            CmpOp::Le => format!("(<= {} {})", to_smt(lhs), to_smt(rhs)),
            CmpOp::Gt => format!("(> {} {})", to_smt(lhs), to_smt(rhs)),
            CmpOp::Ge => format!("(>= {} {})", to_smt(lhs), to_smt(rhs)),
        },
        Formula::Ite {
            cond,
            then_branch,
            else_branch,
        } => format!(
            "(ite {} {} {})",
            to_smt(cond),
            to_smt(then_branch),
            to_smt(else_branch)
        ),
        Formula::Not(inner) => format!("(not {})", to_smt(inner)),
        Formula::And(items) => {
            if items.is_empty() {
                "true".to_string()
            } else {
                let parts: Vec<String> = items.iter().map(to_smt).collect();
                format!("(and {})", parts.join(" "))
            }
        }
        Formula::Or(items) => {
            if items.is_empty() {
                "false".to_string()
            } else {
                let parts: Vec<String> = items.iter().map(to_smt).collect();
                format!("(or {})", parts.join(" "))
            }
        }
    }
}

/// Pipe a script to the solver and interpret its output.
pub fn run_solver(script: &str, config: &SmtConfig) -> io::Result<SmtResult> {
    let timeout_secs = config.timeout_ms.div_ceil(1000).max(1);
    let mut child = Command::new(&config.cmd)
        .arg("-in")
        .arg(format!("-T:{}", timeout_secs))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(script.as_bytes())?;
    }
    let output = child.wait_with_output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(interpret_output(&stdout))
}

fn interpret_output(output: &str) -> SmtResult {
    let status = match output.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => match line.trim() {
            "sat" => SmtStatus::Sat,
            "unsat" => SmtStatus::Unsat,
            "unknown" | "timeout" => SmtStatus::Unknown,
            other => SmtStatus::Error(other.to_string()),
        },
        None => SmtStatus::Error("empty solver output".to_string()),
    };

    let model = if status == SmtStatus::Sat {
        parse_model(output)
    } else {
        Model::new()
    };

    SmtResult { status, model }
}

/// Pull `(define-fun name () Int value)` bindings out of a model dump.
/// Negative values come wrapped as `(- n)`.
fn parse_model(output: &str) -> Model {
    let padded = output.replace('(', " ( ").replace(')', " ) ");
    let tokens: Vec<&str> = padded.split_whitespace().collect();
    let mut model = Model::new();

    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] != "define-fun" {
            i += 1;
            continue;
        }
        let Some(name) = tokens.get(i + 1) else { break };
        // Skip forward to the sort, then read the value after it.
        let mut j = i + 2;
        while j < tokens.len() && tokens[j] != "Int" {
            j += 1;
        }
        let value = match tokens.get(j + 1) {
            Some(&"(") => match (tokens.get(j + 2), tokens.get(j + 3)) {
                (Some(&"-"), Some(n)) => n.parse::<i64>().ok().and_then(i64::checked_neg),
                _ => None,
            },
            Some(n) => n.parse::<i64>().ok(),
            None => None,
        };
        if let Some(v) = value {
            model.insert(name.to_string(), v);
        }
        i = j + 1;
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solve::Formula;

    fn sym(name: &str) -> Formula {
        Formula::Sym(name.to_string())
    }

    #[test]
    fn test_encode_declares_free_symbols() {
        let query = Query {
            defs: vec![(
                "a_y__1".to_string(),
                Formula::bin(BinOp::Add, sym("x"), Formula::Int(1)),
            )],
            goal: Formula::cmp(CmpOp::Gt, sym("a_y__1"), Formula::Int(0)),
        };
        let script = encode_query(&query);
        assert!(script.contains("(declare-const x Int)"));
        assert!(script.contains("(define-fun a_y__1 () Int (+ x 1))"));
        assert!(script.contains("(assert (> a_y__1 0))"));
        assert!(script.ends_with("(check-sat)\n(get-model)\n"));
    }

    #[test]
    fn test_encode_negative_literal() {
        let query = Query {
            defs: vec![],
            goal: Formula::cmp(CmpOp::Eq, sym("x"), Formula::Int(-5)),
        };
        assert!(encode_query(&query).contains("(assert (= x (- 5)))"));
    }

    #[test]
    fn test_encode_ne_as_negated_equality() {
        let query = Query {
            defs: vec![],
            goal: Formula::cmp(CmpOp::Ne, sym("x"), Formula::Int(0)),
        };
        assert!(encode_query(&query).contains("(assert (not (= x 0)))"));
    }

    #[test]
    fn test_interpret_unsat() {
        let result = interpret_output("unsat\n");
        assert_eq!(result.status, SmtStatus::Unsat);
        assert!(result.model.is_empty());
    }

    #[test]
    fn test_interpret_sat_with_model() {
        let output = "sat\n(\n  (define-fun x () Int 3)\n  (define-fun y () Int (- 2))\n)\n";
        let result = interpret_output(output);
        assert_eq!(result.status, SmtStatus::Sat);
        assert_eq!(result.model.get("x"), Some(&3));
        assert_eq!(result.model.get("y"), Some(&-2));
    }

    #[test]
    fn test_interpret_timeout_as_unknown() {
        assert_eq!(interpret_output("timeout\n").status, SmtStatus::Unknown);
        assert_eq!(interpret_output("unknown\n").status, SmtStatus::Unknown);
    }

    #[test]
    fn test_interpret_garbage_as_error() {
        let result = interpret_output("(error \"line 1: unexpected token\")\n");
        assert!(matches!(result.status, SmtStatus::Error(_)));
    }
}
