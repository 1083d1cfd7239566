use crate::span::Span;

/// A front-end diagnostic (error or warning) with source location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        let _ = report.finish().eprint((filename, Source::from(source)));
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(0, 4, 9);
        let d = Diagnostic::error("expected ':='".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "expected ':='");
        assert_eq!(d.span.start, 4);
        assert_eq!(d.span.end, 9);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::error("comparisons cannot be chained".to_string(), Span::dummy())
            .with_note("found a second comparison operator".to_string())
            .with_help("split into two asserts".to_string());
        assert_eq!(d.notes.len(), 1);
        assert_eq!(d.help.as_deref(), Some("split into two asserts"));
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "x = 1;\n";
        let d = Diagnostic::error("assignment uses ':='".to_string(), Span::new(0, 2, 3))
            .with_help("write `x := 1;`".to_string());
        d.render("a.mini", source);
    }

    #[test]
    fn test_render_diagnostics_multiple() {
        let source = "x := 1;\ny := 2;\n";
        let diagnostics = vec![
            Diagnostic::warning("unused x".to_string(), Span::new(0, 0, 1)),
            Diagnostic::warning("unused y".to_string(), Span::new(0, 8, 9)),
        ];
        render_diagnostics(&diagnostics, "a.mini", source);
    }
}
