use crate::ast::{BinOp, Block, CmpOp, Expr, Program, Stmt};
use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::lexer::Lexer;
use crate::span::{Span, Spanned};

/// Hard cap on expression/block nesting, to keep recursion bounded on
/// adversarial inputs.
const MAX_NESTING_DEPTH: usize = 128;

pub struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    depth: usize,
    diagnostics: Vec<Diagnostic>,
}

/// Parse a MiniLang source file into a program, or a list of diagnostics.
pub fn parse_program(source: &str, file_id: u16) -> Result<Program, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source, file_id).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    Parser::new(tokens).parse()
}

impl Parser {
    fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Program, Vec<Diagnostic>> {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            match self.parse_stmt() {
                Some(stmt) => stmts.push(stmt),
                None => self.recover_to_stmt_boundary(),
            }
        }
        if self.diagnostics.is_empty() {
            Ok(Program { stmts })
        } else {
            Err(self.diagnostics)
        }
    }

    // ─── Statements ──────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Option<Spanned<Stmt>> {
        match &self.peek().node {
            Lexeme::Ident(_) => self.parse_assign(true),
            Lexeme::If => self.parse_if(),
            Lexeme::While => self.parse_while(),
            Lexeme::For => self.parse_for(),
            Lexeme::Assert => self.parse_assert(),
            Lexeme::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                Some(Spanned::new(Stmt::Block(block), span))
            }
            other => {
                let msg = format!("expected a statement, found {}", other.describe());
                let span = self.peek().span;
                self.error(msg, span);
                // Skip the offending token so recovery always progresses.
                self.advance();
                None
            }
        }
    }

    /// `x := expr` with a trailing `;` when `terminated` (for-loop init and
    /// step clauses come unterminated).
    fn parse_assign(&mut self, terminated: bool) -> Option<Spanned<Stmt>> {
        let name_tok = self.advance();
        let name = match name_tok.node {
            Lexeme::Ident(name) => Spanned::new(name, name_tok.span),
            other => {
                let msg = format!("expected a variable name, found {}", other.describe());
                self.error(msg, name_tok.span);
                return None;
            }
        };

        match &self.peek().node {
            Lexeme::Walrus => {
                self.advance();
            }
            Lexeme::Eq => {
                let span = self.peek().span;
                self.diagnostics.push(
                    Diagnostic::error("assignment uses ':=', not '='".to_string(), span)
                        .with_help(format!("write `{} := ...`", name.node)),
                );
                self.advance();
            }
            other => {
                let msg = format!("expected ':=' after variable name, found {}", other.describe());
                let span = self.peek().span;
                self.error(msg, span);
                return None;
            }
        }

        let value = self.parse_expr()?;
        let mut span = name.span.merge(value.span);
        if terminated {
            let semi = self.expect(&Lexeme::Semicolon)?;
            span = span.merge(semi);
        }
        Some(Spanned::new(Stmt::Assign { name, value }, span))
    }

    fn parse_if(&mut self) -> Option<Spanned<Stmt>> {
        let if_span = self.expect(&Lexeme::If)?;
        self.expect(&Lexeme::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Lexeme::RParen)?;
        let then_block = self.parse_block()?;

        let (else_block, end_span) = if self.peek().node == Lexeme::Else {
            self.advance();
            let block = self.parse_block()?;
            let span = block.span;
            (Some(block), span)
        } else {
            (None, then_block.span)
        };

        let span = if_span.merge(end_span);
        Some(Spanned::new(
            Stmt::If {
                cond,
                then_block,
                else_block,
            },
            span,
        ))
    }

    fn parse_while(&mut self) -> Option<Spanned<Stmt>> {
        let while_span = self.expect(&Lexeme::While)?;
        self.expect(&Lexeme::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Lexeme::RParen)?;
        let body = self.parse_block()?;
        let span = while_span.merge(body.span);
        Some(Spanned::new(Stmt::While { cond, body }, span))
    }

    fn parse_for(&mut self) -> Option<Spanned<Stmt>> {
        let for_span = self.expect(&Lexeme::For)?;
        self.expect(&Lexeme::LParen)?;
        let init = self.parse_assign(false)?;
        self.expect(&Lexeme::Semicolon)?;
        let cond = self.parse_expr()?;
        self.expect(&Lexeme::Semicolon)?;
        let step = self.parse_assign(false)?;
        self.expect(&Lexeme::RParen)?;
        let body = self.parse_block()?;
        let span = for_span.merge(body.span);
        Some(Spanned::new(
            Stmt::For {
                init: Box::new(init),
                cond,
                step: Box::new(step),
                body,
            },
            span,
        ))
    }

    fn parse_assert(&mut self) -> Option<Spanned<Stmt>> {
        let assert_span = self.expect(&Lexeme::Assert)?;
        self.expect(&Lexeme::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Lexeme::RParen)?;
        let semi = self.expect(&Lexeme::Semicolon)?;
        let span = assert_span.merge(semi);
        Some(Spanned::new(Stmt::Assert { cond }, span))
    }

    fn parse_block(&mut self) -> Option<Spanned<Block>> {
        self.enter_nesting()?;
        let open = self.expect(&Lexeme::LBrace);
        let open = match open {
            Some(span) => span,
            None => {
                self.depth -= 1;
                return None;
            }
        };

        let mut stmts = Vec::new();
        while self.peek().node != Lexeme::RBrace && !self.at_eof() {
            match self.parse_stmt() {
                Some(stmt) => stmts.push(stmt),
                None => {
                    self.recover_to_stmt_boundary();
                    if self.diagnostics.len() > 32 {
                        break;
                    }
                }
            }
        }
        let close = self.expect(&Lexeme::RBrace);
        self.depth -= 1;
        let close = close?;
        Some(Spanned::new(Block { stmts }, open.merge(close)))
    }

    // ─── Expressions ─────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Option<Spanned<Expr>> {
        self.parse_expr_bp(0)
    }

    /// Pratt expression parser.
    fn parse_expr_bp(&mut self, min_bp: u8) -> Option<Spanned<Expr>> {
        self.enter_nesting()?;
        let mut lhs = match self.parse_atom() {
            Some(atom) => atom,
            None => {
                self.depth -= 1;
                return None;
            }
        };

        loop {
            let op = match op_binding_power(&self.peek().node) {
                Some((op, bp)) if bp >= min_bp => {
                    self.advance();
                    (op, bp)
                }
                _ => break,
            };

            let (op, bp) = op;
            let rhs = match self.parse_expr_bp(bp + 1) {
                Some(rhs) => rhs,
                None => {
                    self.depth -= 1;
                    return None;
                }
            };
            let span = lhs.span.merge(rhs.span);
            lhs = match op {
                Op::Bin(op) => Spanned::new(
                    Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    span,
                ),
                Op::Cmp(op) => {
                    // Comparisons do not chain: `a < b < c` is an error.
                    if let Some((Op::Cmp(_), _)) = op_binding_power(&self.peek().node) {
                        let chain_span = self.peek().span;
                        self.diagnostics.push(
                            Diagnostic::error(
                                "comparison operators cannot be chained".to_string(),
                                chain_span,
                            )
                            .with_help(
                                "split into two comparisons joined by separate asserts"
                                    .to_string(),
                            ),
                        );
                        self.depth -= 1;
                        return None;
                    }
                    Spanned::new(
                        Expr::Compare {
                            op,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        span,
                    )
                }
            };
        }

        self.depth -= 1;
        Some(lhs)
    }

    fn parse_atom(&mut self) -> Option<Spanned<Expr>> {
        let tok = self.advance();
        match tok.node {
            Lexeme::Integer(n) => Some(Spanned::new(Expr::Number(n), tok.span)),
            Lexeme::Ident(name) => Some(Spanned::new(Expr::Var(name), tok.span)),
            Lexeme::Minus => {
                // Negation recurses, so it counts against the nesting
                // depth like any other nested expression.
                self.enter_nesting()?;
                let inner = self.parse_atom();
                self.depth -= 1;
                let inner = inner?;
                let span = tok.span.merge(inner.span);
                // Fold literal negation; otherwise encode as 0 - e.
                let expr = match inner.node {
                    Expr::Number(n) => Expr::Number(-n),
                    other => Expr::Binary {
                        op: BinOp::Sub,
                        lhs: Box::new(Spanned::new(Expr::Number(0), tok.span)),
                        rhs: Box::new(Spanned::new(other, inner.span)),
                    },
                };
                Some(Spanned::new(expr, span))
            }
            Lexeme::LParen => {
                let inner = self.parse_expr()?;
                let close = self.expect(&Lexeme::RParen)?;
                Some(Spanned::new(inner.node, tok.span.merge(close)))
            }
            other => {
                let msg = format!("expected an expression, found {}", other.describe());
                self.error(msg, tok.span);
                None
            }
        }
    }

    // ─── Token plumbing ──────────────────────────────────────────────

    fn peek(&self) -> &Spanned<Lexeme> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned<Lexeme> {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        self.peek().node == Lexeme::Eof
    }

    fn expect(&mut self, expected: &Lexeme) -> Option<Span> {
        if &self.peek().node == expected {
            Some(self.advance().span)
        } else {
            let msg = format!(
                "expected {}, found {}",
                expected.describe(),
                self.peek().node.describe()
            );
            let span = self.peek().span;
            self.error(msg, span);
            None
        }
    }

    fn enter_nesting(&mut self) -> Option<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            let span = self.peek().span;
            self.error("nesting too deep".to_string(), span);
            self.depth -= 1;
            None
        } else {
            Some(())
        }
    }

    /// Skip forward to the next plausible statement start after an error.
    fn recover_to_stmt_boundary(&mut self) {
        while !self.at_eof() {
            match self.peek().node {
                Lexeme::Semicolon => {
                    self.advance();
                    return;
                }
                // An identifier can open the next assignment, so stop
                // before it instead of swallowing it.
                Lexeme::RBrace
                | Lexeme::If
                | Lexeme::While
                | Lexeme::For
                | Lexeme::Assert
                | Lexeme::Ident(_) => {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn error(&mut self, message: String, span: Span) {
        self.diagnostics.push(Diagnostic::error(message, span));
    }
}

enum Op {
    Bin(BinOp),
    Cmp(CmpOp),
}

/// Binding power table. Comparisons bind loosest, then additive, then
/// multiplicative.
fn op_binding_power(lexeme: &Lexeme) -> Option<(Op, u8)> {
    let entry = match lexeme {
        Lexeme::EqEq => (Op::Cmp(CmpOp::Eq), 1),
        Lexeme::NotEq => (Op::Cmp(CmpOp::Ne), 1),
        Lexeme::Lt => (Op::Cmp(CmpOp::Lt), 1),
        Lexeme::Le => (Op::Cmp(CmpOp::Le), 1),
        Lexeme::Gt => (Op::Cmp(CmpOp::Gt), 1),
        Lexeme::Ge => (Op::Cmp(CmpOp::Ge), 1),
        Lexeme::Plus => (Op::Bin(BinOp::Add), 3),
        Lexeme::Minus => (Op::Bin(BinOp::Sub), 3),
        Lexeme::Star => (Op::Bin(BinOp::Mul), 5),
        Lexeme::Slash => (Op::Bin(BinOp::Div), 5),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, CmpOp, Expr, Stmt};

    fn parse_ok(source: &str) -> Program {
        match parse_program(source, 0) {
            Ok(program) => program,
            Err(errors) => panic!("unexpected parse errors: {:?}", errors),
        }
    }

    fn parse_err(source: &str) -> Vec<Diagnostic> {
        match parse_program(source, 0) {
            Ok(_) => panic!("expected parse errors"),
            Err(errors) => errors,
        }
    }

    #[test]
    fn test_simple_assignment() {
        let program = parse_ok("x := 1 + 2 * 3;");
        assert_eq!(program.stmts.len(), 1);
        let Stmt::Assign { name, value } = &program.stmts[0].node else {
            panic!("expected assignment");
        };
        assert_eq!(name.node, "x");
        // * binds tighter than +
        let Expr::Binary { op: BinOp::Add, rhs, .. } = &value.node else {
            panic!("expected addition at the top");
        };
        assert!(matches!(rhs.node, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_parens_override_precedence() {
        let program = parse_ok("x := (1 + 2) * 3;");
        let Stmt::Assign { value, .. } = &program.stmts[0].node else {
            panic!("expected assignment");
        };
        assert!(matches!(value.node, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_if_else() {
        let program = parse_ok("if (x > 0) { y := 1; } else { y := 2; }");
        let Stmt::If {
            cond, else_block, ..
        } = &program.stmts[0].node
        else {
            panic!("expected if");
        };
        assert!(matches!(cond.node, Expr::Compare { op: CmpOp::Gt, .. }));
        assert!(else_block.is_some());
    }

    #[test]
    fn test_if_without_else() {
        let program = parse_ok("if (x == 0) { y := 1; }");
        let Stmt::If { else_block, .. } = &program.stmts[0].node else {
            panic!("expected if");
        };
        assert!(else_block.is_none());
    }

    #[test]
    fn test_while_loop() {
        let program = parse_ok("while (i < 10) { i := i + 1; }");
        assert!(matches!(program.stmts[0].node, Stmt::While { .. }));
    }

    #[test]
    fn test_for_loop() {
        let program = parse_ok("for (i := 0; i < 3; i := i + 1) { x := x + i; }");
        let Stmt::For { init, step, .. } = &program.stmts[0].node else {
            panic!("expected for");
        };
        assert!(matches!(init.node, Stmt::Assign { .. }));
        assert!(matches!(step.node, Stmt::Assign { .. }));
    }

    #[test]
    fn test_assert_statement() {
        let program = parse_ok("assert(x >= 3);");
        let Stmt::Assert { cond } = &program.stmts[0].node else {
            panic!("expected assert");
        };
        assert!(matches!(cond.node, Expr::Compare { op: CmpOp::Ge, .. }));
    }

    #[test]
    fn test_unary_minus_literal_folds() {
        let program = parse_ok("x := -5;");
        let Stmt::Assign { value, .. } = &program.stmts[0].node else {
            panic!("expected assignment");
        };
        assert!(matches!(value.node, Expr::Number(-5)));
    }

    #[test]
    fn test_unary_minus_variable() {
        let program = parse_ok("x := -y;");
        let Stmt::Assign { value, .. } = &program.stmts[0].node else {
            panic!("expected assignment");
        };
        let Expr::Binary { op: BinOp::Sub, lhs, .. } = &value.node else {
            panic!("expected subtraction from zero");
        };
        assert!(matches!(lhs.node, Expr::Number(0)));
    }

    #[test]
    fn test_single_equals_suggests_walrus() {
        let errors = parse_err("x = 1;");
        assert!(errors.iter().any(|d| d.message.contains("':='")));
        assert!(errors
            .iter()
            .any(|d| d.help.as_deref() == Some("write `x := ...`")));
    }

    #[test]
    fn test_chained_comparison_rejected() {
        let errors = parse_err("assert(1 < x < 3);");
        assert!(errors
            .iter()
            .any(|d| d.message.contains("cannot be chained")));
    }

    #[test]
    fn test_missing_semicolon() {
        let errors = parse_err("x := 1");
        assert!(errors.iter().any(|d| d.message.contains("';'")));
    }

    #[test]
    fn test_nested_blocks() {
        let program = parse_ok("{ x := 1; { y := 2; } }");
        let Stmt::Block(outer) = &program.stmts[0].node else {
            panic!("expected block");
        };
        assert_eq!(outer.node.stmts.len(), 2);
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let mut source = String::new();
        for _ in 0..200 {
            source.push('(');
        }
        source.push('1');
        for _ in 0..200 {
            source.push(')');
        }
        let errors = parse_err(&format!("x := {};", source));
        assert!(errors.iter().any(|d| d.message.contains("nesting too deep")));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let errors = parse_err("x := ;\ny := ;\n");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_recovery_resumes_at_identifier() {
        // The unclosed paren error fires at `y`, so recovery must stop
        // there and let the (also broken) second statement report its
        // own error rather than be swallowed.
        let errors = parse_err("x := (1\ny := ;\n");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_deep_negation_rejected() {
        let mut source = String::from("x := ");
        for _ in 0..500 {
            source.push('-');
        }
        source.push_str("5;");
        let errors = parse_err(&source);
        assert!(errors.iter().any(|d| d.message.contains("nesting too deep")));
    }
}
