use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use minicheck::equiv::{self, Backend, EquivConfig};
use minicheck::smt::SmtConfig;
use minicheck::solve::SolverConfig;
use minicheck::ssa::{self, DEFAULT_UNROLL_BOUND};
use minicheck::{parse_source, report};

#[derive(Parser)]
#[command(name = "minicheck", version, about = "Semantic equivalence checker for MiniLang programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check two programs for semantic equivalence
    Equiv {
        /// First program
        a: PathBuf,
        /// Second program
        b: PathBuf,
        /// Loop unroll bound
        #[arg(long, default_value_t = DEFAULT_UNROLL_BOUND)]
        bound: u32,
        /// Solver wall-clock budget in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        /// Use an external z3 process instead of the built-in solver
        #[arg(long)]
        z3: bool,
        /// Write the SMT-LIB2 query to this path and continue
        #[arg(long, value_name = "PATH")]
        smt_out: Option<PathBuf>,
        /// Emit the result as JSON on stdout
        #[arg(long)]
        json: bool,
        /// Print the SSA forms of both programs to stderr
        #[arg(long)]
        verbose: bool,
    },
    /// Print the SSA form of a program
    Ssa {
        input: PathBuf,
        /// Loop unroll bound
        #[arg(long, default_value_t = DEFAULT_UNROLL_BOUND)]
        bound: u32,
    },
    /// Check a single program's assertions for violations
    Check {
        input: PathBuf,
        /// Loop unroll bound
        #[arg(long, default_value_t = DEFAULT_UNROLL_BOUND)]
        bound: u32,
        /// Solver wall-clock budget in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        /// Use an external z3 process instead of the built-in solver
        #[arg(long)]
        z3: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Equiv {
            a,
            b,
            bound,
            timeout_ms,
            z3,
            smt_out,
            json,
            verbose,
        } => run_equiv(&a, &b, bound, timeout_ms, z3, smt_out.as_deref(), json, verbose),
        Command::Ssa { input, bound } => run_ssa(&input, bound),
        Command::Check {
            input,
            bound,
            timeout_ms,
            z3,
        } => run_check(&input, bound, timeout_ms, z3),
    }
}

fn load_program(path: &Path, file_id: u16) -> Option<minicheck::ast::Program> {
    let filename = path.display().to_string();
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {}", filename, err);
            return None;
        }
    };
    parse_source(&source, &filename, file_id)
}

#[allow(clippy::too_many_arguments)]
fn run_equiv(
    a: &Path,
    b: &Path,
    bound: u32,
    timeout_ms: u64,
    z3: bool,
    smt_out: Option<&Path>,
    json: bool,
    verbose: bool,
) -> ExitCode {
    let Some(program_a) = load_program(a, 0) else {
        return ExitCode::from(1);
    };
    let Some(program_b) = load_program(b, 1) else {
        return ExitCode::from(1);
    };

    if verbose {
        eprintln!("--- {} (ssa, bound {}) ---", a.display(), bound);
        eprint!("{}", ssa::convert(&program_a, bound));
        eprintln!("--- {} (ssa, bound {}) ---", b.display(), bound);
        eprint!("{}", ssa::convert(&program_b, bound));
    }

    if let Some(path) = smt_out {
        let script = equiv::disagreement_script(&program_a, &program_b, bound);
        if let Err(err) = fs::write(path, script) {
            eprintln!("error: cannot write {}: {}", path.display(), err);
            return ExitCode::from(1);
        }
    }

    let config = EquivConfig {
        bound,
        solver: SolverConfig {
            timeout_ms,
            ..SolverConfig::default()
        },
        backend: if z3 {
            Backend::Smt(SmtConfig {
                timeout_ms,
                ..SmtConfig::default()
            })
        } else {
            Backend::Search
        },
    };

    let result = match equiv::check_equivalence(&program_a, &program_b, &config) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::from(1);
        }
    };

    if json {
        println!("{}", report::json_report(&result));
    } else {
        print!("{}", equiv::format_report(&result));
    }

    // Any produced verdict is a successful run, inequivalence included.
    ExitCode::SUCCESS
}

fn run_ssa(input: &Path, bound: u32) -> ExitCode {
    let Some(program) = load_program(input, 0) else {
        return ExitCode::from(1);
    };
    print!("{}", ssa::convert(&program, bound));
    ExitCode::SUCCESS
}

fn run_check(input: &Path, bound: u32, timeout_ms: u64, z3: bool) -> ExitCode {
    let Some(program) = load_program(input, 0) else {
        return ExitCode::from(1);
    };

    let config = EquivConfig {
        bound,
        solver: SolverConfig {
            timeout_ms,
            ..SolverConfig::default()
        },
        backend: if z3 {
            Backend::Smt(SmtConfig {
                timeout_ms,
                ..SmtConfig::default()
            })
        } else {
            Backend::Search
        },
    };

    let result = match equiv::check_assertions(&program, &config) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::from(1);
        }
    };

    print!("{}", equiv::format_assertion_report(&result));
    ExitCode::SUCCESS
}
