//! minicheck: semantic equivalence checking for a small imperative
//! language.
//!
//! Two programs are parsed, lowered to SSA with bounded loop unrolling,
//! and compared by a single satisfiability query over linear integer
//! arithmetic: is there an input on which they disagree? The query goes
//! to a built-in simplify-and-search procedure by default, or to an
//! external SMT solver for completeness.

pub mod ast;
pub mod diagnostic;
pub mod equiv;
pub mod lexeme;
pub mod lexer;
pub mod parser;
pub mod report;
pub mod smt;
pub mod solve;
pub mod span;
pub mod ssa;

pub use equiv::{
    check_assertions, check_equivalence, format_assertion_report, format_report, AssertionResult,
    AssertionVerdict, Backend, Counterexample, EquivConfig, EquivalenceResult, Verdict,
};
pub use ssa::DEFAULT_UNROLL_BOUND;

use ast::Program;
use diagnostic::{render_diagnostics, Diagnostic};

/// Parse a source file, rendering any diagnostics to stderr.
pub fn parse_source(source: &str, filename: &str, file_id: u16) -> Option<Program> {
    match parser::parse_program(source, file_id) {
        Ok(program) => Some(program),
        Err(diagnostics) => {
            render_diagnostics(&diagnostics, filename, source);
            None
        }
    }
}

/// Parse without printing; callers handle the diagnostics.
pub fn parse_source_silent(source: &str, file_id: u16) -> Result<Program, Vec<Diagnostic>> {
    parser::parse_program(source, file_id)
}
