use super::*;
use crate::parser::parse_program;

fn ssa(source: &str, bound: u32) -> SsaProgram {
    let program = parse_program(source, 0).expect("test program should parse");
    convert(&program, bound)
}

fn defines(program: &SsaProgram) -> Vec<(String, String)> {
    program
        .stmts
        .iter()
        .filter_map(|s| match s {
            SsaStmt::Define { var, value } => Some((var.to_string(), value.to_string())),
            SsaStmt::Obligation { .. } => None,
        })
        .collect()
}

#[test]
fn test_versions_increase_per_assignment() {
    let program = ssa("x := 1; x := x + 1;", 3);
    let defs = defines(&program);
    assert_eq!(defs[0], ("x__1".to_string(), "1".to_string()));
    assert_eq!(defs[1], ("x__2".to_string(), "(x__1 + 1)".to_string()));
    assert_eq!(program.exit_versions.get("x"), Some(&2));
    assert!(program.free_vars.is_empty());
}

#[test]
fn test_read_before_write_is_free() {
    let program = ssa("y := x + 1;", 3);
    assert!(program.free_vars.contains("x"));
    assert_eq!(defines(&program)[0].1, "(x__0 + 1)");
    // x is never written, so it has no exit version
    assert!(!program.exit_versions.contains_key("x"));
}

#[test]
fn test_if_merge_emits_ite() {
    let program = ssa("if (x > 0) { y := 1; } else { y := 2; }", 3);
    let defs = defines(&program);
    assert_eq!(defs.len(), 3);
    assert_eq!(defs[2].0, "y__3");
    assert_eq!(defs[2].1, "ite((x__0 > 0), y__1, y__2)");
    assert_eq!(program.exit_versions.get("y"), Some(&3));
}

#[test]
fn test_if_without_else_falls_back_to_entry_version() {
    let program = ssa("y := 0; if (x > 0) { y := 1; }", 3);
    let defs = defines(&program);
    assert_eq!(defs[2].0, "y__3");
    assert_eq!(defs[2].1, "ite((x__0 > 0), y__2, y__1)");
}

#[test]
fn test_if_merge_unwritten_side_is_free() {
    let program = ssa("if (x > 0) { y := 1; }", 3);
    let defs = defines(&program);
    assert_eq!(defs[1].1, "ite((x__0 > 0), y__1, y__0)");
    assert!(program.free_vars.contains("y"));
}

#[test]
fn test_division_emits_obligation() {
    let program = ssa("z := x / y;", 3);
    let obligations: Vec<_> = program.obligations().collect();
    assert_eq!(obligations.len(), 1);
    let (path, cond) = obligations[0];
    assert!(path.is_empty());
    assert_eq!(cond.to_string(), "(y__0 != 0)");
}

#[test]
fn test_assert_in_branch_carries_guard() {
    let program = ssa("if (x > 0) { assert(x > 1); }", 3);
    let obligations: Vec<_> = program.obligations().collect();
    assert_eq!(obligations.len(), 1);
    let (path, cond) = obligations[0];
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].to_string(), "(x__0 > 0)");
    assert_eq!(cond.to_string(), "(x__0 > 1)");
}

#[test]
fn test_assert_in_else_carries_negated_guard() {
    let program = ssa("if (x > 0) { y := 1; } else { assert(x == 0); }", 3);
    let (path, _) = program.obligations().next().expect("one obligation");
    assert_eq!(path[0].to_string(), "(x__0 <= 0)");
}

#[test]
fn test_while_unrolls_to_bound() {
    let program = ssa("i := 0; while (i < 10) { i := i + 1; }", 2);
    // i__1 := 0, then two guarded increments and two merges
    assert_eq!(program.exit_versions.get("i"), Some(&5));
    let defs = defines(&program);
    assert_eq!(defs[0], ("i__1".to_string(), "0".to_string()));
    // innermost increment sees the first one
    assert!(defs.iter().any(|(v, t)| v == "i__3" && t == "(i__2 + 1)"));
}

#[test]
fn test_zero_bound_drops_loop_body() {
    let program = ssa("i := 0; while (i < 10) { i := i + 1; }", 0);
    let defs = defines(&program);
    assert_eq!(defs.len(), 1);
    assert_eq!(program.exit_versions.get("i"), Some(&1));
}

#[test]
fn test_for_loop_runs_init_once() {
    let program = ssa("x := 0; for (i := 0; i < 3; i := i + 1) { x := x + 1; }", 3);
    let defs = defines(&program);
    assert_eq!(defs[0], ("x__1".to_string(), "0".to_string()));
    assert_eq!(defs[1], ("i__1".to_string(), "0".to_string()));
    assert!(program.free_vars.is_empty());
    assert!(program.exit_versions.contains_key("x"));
    assert!(program.exit_versions.contains_key("i"));
}

#[test]
fn test_arithmetic_condition_wrapped_as_nonzero() {
    let program = ssa("assert(x);", 3);
    let (_, cond) = program.obligations().next().expect("one obligation");
    assert_eq!(cond.to_string(), "(x__0 != 0)");
}

#[test]
fn test_nested_block_is_plain_sequencing() {
    let program = ssa("{ x := 1; } x := x + 1;", 3);
    assert_eq!(program.exit_versions.get("x"), Some(&2));
}

#[test]
fn test_display_is_deterministic() {
    let a = ssa("x := 1; if (x > 0) { y := x; }", 3).to_string();
    let b = ssa("x := 1; if (x > 0) { y := x; }", 3).to_string();
    assert_eq!(a, b);
    assert!(a.contains("x__1 := 1"));
}
