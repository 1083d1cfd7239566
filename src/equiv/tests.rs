use super::*;
use crate::parser::parse_program;

fn parse(source: &str, file_id: u16) -> Program {
    parse_program(source, file_id).expect("test program should parse")
}

fn check(a: &str, b: &str) -> EquivalenceResult {
    let config = EquivConfig::default();
    check_equivalence(&parse(a, 0), &parse(b, 1), &config).expect("search backend cannot fail")
}

fn check_bounded(a: &str, b: &str, bound: u32) -> EquivalenceResult {
    let config = EquivConfig {
        bound,
        ..EquivConfig::default()
    };
    check_equivalence(&parse(a, 0), &parse(b, 1), &config).expect("search backend cannot fail")
}

fn expect_counterexample(result: &EquivalenceResult) -> &Counterexample {
    match &result.verdict {
        Verdict::NotEquivalent(cex) => cex,
        other => panic!("expected NOT EQUIVALENT, got {}", other),
    }
}

#[test]
fn test_program_equivalent_to_itself() {
    let source = "x := 0; if (y > 0) { x := y; } assert(x >= 0);";
    let result = check(source, source);
    assert!(matches!(result.verdict, Verdict::Equivalent));
    assert_eq!(result.method, "ssa-hash");
}

#[test]
fn test_constant_folding_equivalence() {
    let result = check("x := 1; x := x + 1;", "x := 2;");
    assert!(matches!(result.verdict, Verdict::Equivalent));
    assert_eq!(result.method, "search");
}

#[test]
fn test_strict_vs_nonstrict_guard_equivalence() {
    let a = "if (x > 0) { y := 1; } else { y := 2; }";
    let b = "if (x >= 1) { y := 1; } else { y := 2; }";
    let result = check(a, b);
    assert!(matches!(result.verdict, Verdict::Equivalent));
}

#[test]
fn test_diverging_guards_found_at_boundary() {
    let a = "if (x > 0) { y := 1; } else { y := 2; }";
    let b = "if (x > 1) { y := 1; } else { y := 2; }";
    let result = check(a, b);
    let cex = expect_counterexample(&result);
    assert_eq!(cex.inputs.get("x"), Some(&1));
    assert_eq!(cex.outputs_a.get("y"), Some(&Some(1)));
    assert_eq!(cex.outputs_b.get("y"), Some(&Some(2)));
    assert_eq!(cex.ok_a, Some(true));
    assert_eq!(cex.ok_b, Some(true));
}

#[test]
fn test_loop_iteration_counts_differ() {
    let a = "x := 0; i := 0; while (i < 3) { x := x + 1; i := i + 1; }";
    let b = "x := 0; i := 0; while (i < 2) { x := x + 1; i := i + 1; }";
    let result = check(a, b);
    let cex = expect_counterexample(&result);
    assert!(cex.inputs.is_empty());
    assert_eq!(cex.outputs_a.get("x"), Some(&Some(3)));
    assert_eq!(cex.outputs_b.get("x"), Some(&Some(2)));
}

#[test]
fn test_low_bound_truncates_both_loops() {
    // With only two unrollings the loops cannot be told apart.
    let a = "x := 0; i := 0; while (i < 3) { x := x + 1; i := i + 1; }";
    let b = "x := 0; i := 0; while (i < 2) { x := x + 1; i := i + 1; }";
    let result = check_bounded(a, b, 2);
    assert!(matches!(result.verdict, Verdict::Equivalent));
}

#[test]
fn test_for_loop_against_straightline() {
    let a = "x := 0; for (i := 0; i < 3; i := i + 1) { x := x + 1; }";
    let b = "x := 3; i := 3;";
    let result = check(a, b);
    assert!(matches!(result.verdict, Verdict::Equivalent));
}

#[test]
fn test_assertion_asymmetry_is_inequivalence() {
    let a = "y := x; assert(x >= 0);";
    let b = "y := x;";
    let result = check(a, b);
    let cex = expect_counterexample(&result);
    let x = cex.inputs.get("x").copied().expect("x is an input");
    assert!(x < 0);
    assert_eq!(cex.ok_a, Some(false));
    assert_eq!(cex.ok_b, Some(true));
}

#[test]
fn test_division_by_zero_distinguishes() {
    // y := x / x equals 1 except at x == 0, where the division
    // obligation fails.
    let result = check("y := x / x;", "y := 1;");
    let cex = expect_counterexample(&result);
    assert_eq!(cex.inputs.get("x"), Some(&0));
    assert_eq!(cex.ok_a, Some(false));
    assert_eq!(cex.ok_b, Some(true));
    assert_eq!(cex.outputs_a.get("y"), Some(&None));
    assert_eq!(cex.outputs_b.get("y"), Some(&Some(1)));
}

#[test]
fn test_unknown_is_not_coerced() {
    // x * x >= 0 always holds, but the built-in backend cannot prove a
    // nonlinear fact and must say so.
    let result = check("assert(x * x >= 0);", "y := 0;");
    assert!(matches!(result.verdict, Verdict::Unknown(_)));
}

#[test]
fn test_no_common_outputs_is_vacuously_equivalent() {
    let result = check("x := 1;", "y := 2;");
    assert!(matches!(result.verdict, Verdict::Equivalent));
    assert!(result.outputs.is_empty());
}

#[test]
fn test_branch_order_swap_with_negated_guard() {
    let a = "if (x > 0) { y := 1; } else { y := 2; }";
    let b = "if (x <= 0) { y := 2; } else { y := 1; }";
    let result = check(a, b);
    assert!(matches!(result.verdict, Verdict::Equivalent));
}

#[test]
fn test_counterexample_replays_through_both_programs() {
    let a = "y := 2 * x;";
    let b = "y := x + x + 1;";
    let result = check(a, b);
    let cex = expect_counterexample(&result);
    let x = cex.inputs.get("x").copied().expect("x is an input");
    assert_eq!(cex.outputs_a.get("y"), Some(&Some(2 * x)));
    assert_eq!(cex.outputs_b.get("y"), Some(&Some(2 * x + 1)));
}

#[test]
fn test_report_mentions_counterexample() {
    let result = check("y := x;", "y := x + 1;");
    let report = format_report(&result);
    assert!(report.contains("NOT EQUIVALENT"));
    assert!(report.contains("counterexample"));
    assert!(report.contains("program a"));
}

#[test]
fn test_report_for_equivalent_pair() {
    let result = check("x := 1;", "x := 2 - 1;");
    let report = format_report(&result);
    assert!(report.contains("verdict: EQUIVALENT"));
    assert!(report.contains("outputs compared: x"));
}

// ─── Single-program assertion checks ─────────────────────────────────

fn check_asserts(source: &str) -> AssertionResult {
    let config = EquivConfig::default();
    check_assertions(&parse(source, 0), &config).expect("search backend cannot fail")
}

#[test]
fn test_assertion_violated_with_witness() {
    let result = check_asserts("assert(x >= 0);");
    match result.verdict {
        AssertionVerdict::Violated(witness) => {
            let x = witness.get("x").copied().expect("x is an input");
            assert!(x < 0);
        }
        other => panic!("expected ASSERTION VIOLATED, got {}", other),
    }
    assert_eq!(result.obligations, 1);
}

#[test]
fn test_assertion_proved_by_folding() {
    let result = check_asserts("x := 1; assert(x == 1);");
    assert!(matches!(result.verdict, AssertionVerdict::Hold));
    assert_eq!(result.method, "search");
}

#[test]
fn test_division_obligation_violated_at_zero() {
    let result = check_asserts("y := x / x;");
    match result.verdict {
        AssertionVerdict::Violated(witness) => {
            assert_eq!(witness.get("x"), Some(&0));
        }
        other => panic!("expected ASSERTION VIOLATED, got {}", other),
    }
}

#[test]
fn test_no_obligations_hold_trivially() {
    let result = check_asserts("x := 1; y := x + 2;");
    assert!(matches!(result.verdict, AssertionVerdict::Hold));
    assert_eq!(result.method, "trivial");
    assert_eq!(result.obligations, 0);
}

#[test]
fn test_assertion_in_untaken_branch_does_not_bind() {
    // The guard rules out the violating input, so the assert holds.
    let result = check_asserts("if (x > 0) { assert(x >= 1); }");
    assert!(matches!(result.verdict, AssertionVerdict::Hold));
}

#[test]
fn test_nonlinear_assertion_stays_unknown() {
    let result = check_asserts("assert(x * x >= 0);");
    assert!(matches!(result.verdict, AssertionVerdict::Unknown(_)));
}

#[test]
fn test_assertion_report_mentions_witness() {
    let report = format_assertion_report(&check_asserts("assert(x > 10);"));
    assert!(report.contains("ASSERTION VIOLATED"));
    assert!(report.contains("violated at: x ="));
}
