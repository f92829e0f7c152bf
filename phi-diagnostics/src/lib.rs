// Error reporting for the Phi compiler.
// Rust-style diagnostics with spans, colors, notes, and suggestions.

use colored::Colorize;
use std::fmt;

pub mod suggest;

/// Source code location (line, column, file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl Span {
    pub fn new(file: String, line: usize, column: usize, length: usize) -> Self {
        Self {
            file,
            line,
            column,
            length,
        }
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Level::Error => write!(f, "{}", "error".red().bold()),
            Level::Warning => write!(f, "{}", "warning".yellow().bold()),
            Level::Note => write!(f, "{}", "note".cyan().bold()),
            Level::Help => write!(f, "{}", "help".green().bold()),
        }
    }
}

/// One structured diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub code: &'static str,
    pub message: String,
    pub span: Span,
    /// Secondary notes, each optionally with its own span ("first defined
    /// here" points at the earlier declaration).
    pub notes: Vec<(String, Option<Span>)>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn new(level: Level, code: &'static str, message: String, span: Span) -> Self {
        Self {
            level,
            code,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(code: &'static str, message: String, span: Span) -> Self {
        Self::new(Level::Error, code, message, span)
    }

    pub fn warning(code: &'static str, message: String, span: Span) -> Self {
        Self::new(Level::Warning, code, message, span)
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push((note, None));
        self
    }

    pub fn with_note_at(mut self, note: String, span: Span) -> Self {
        self.notes.push((note, Some(span)));
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    fn render(&self) -> String {
        let mut out = String::new();

        if self.code.is_empty() {
            out.push_str(&format!("{}: {}\n", self.level, self.message.bold()));
        } else {
            out.push_str(&format!(
                "{}[{}]: {}\n",
                self.level,
                self.code,
                self.message.bold()
            ));
        }

        if self.span.is_known() {
            out.push_str(&format!(" {} {}\n", "-->".cyan().bold(), self.span));
        }

        for (note, span) in &self.notes {
            match span {
                Some(span) if span.is_known() => {
                    out.push_str(&format!(
                        " {} {} ({})\n",
                        "=".cyan().bold(),
                        note.cyan(),
                        span
                    ));
                }
                _ => out.push_str(&format!(" {} {}\n", "=".cyan().bold(), note.cyan())),
            }
        }

        if let Some(help) = &self.help {
            out.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }

        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Collection and reporting sink, threaded through every pipeline stage.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            Level::Error => self.error_count += 1,
            Level::Warning => self.warning_count += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn emit_error(&mut self, code: &'static str, message: String, span: Span) {
        self.emit(Diagnostic::error(code, message, span));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print everything to stderr.
    pub fn print_all(&self) {
        for diag in &self.diagnostics {
            eprintln!("{}", diag);
        }
    }

    pub fn print_summary(&self) {
        if self.error_count > 0 {
            eprintln!(
                "{}: {} error{} emitted",
                "error".red().bold(),
                self.error_count,
                if self.error_count == 1 { "" } else { "s" }
            );
        }
        if self.warning_count > 0 {
            eprintln!(
                "{}: {} warning{} emitted",
                "warning".yellow().bold(),
                self.warning_count,
                if self.warning_count == 1 { "" } else { "s" }
            );
        }
    }
}

/// Shorthands for the compiler's recurring error shapes.
impl DiagnosticEngine {
    pub fn redefinition(&mut self, name: &str, span: Span, first: Span) {
        self.emit(
            Diagnostic::error(
                codes::DUPLICATE_DEFINITION,
                format!("`{}` is defined multiple times", name),
                span,
            )
            .with_note_at("first defined here".to_string(), first),
        );
    }

    pub fn unknown_name(
        &mut self,
        what: &str,
        name: &str,
        span: Span,
        suggestion: Option<String>,
    ) {
        let mut diag = Diagnostic::error(
            codes::UNDEFINED_NAME,
            format!("cannot find {} `{}` in this scope", what, name),
            span,
        );
        if let Some(candidate) = suggestion {
            diag = diag.with_help(format!("did you mean `{}`?", candidate));
        }
        self.emit(diag);
    }

    pub fn unknown_type(&mut self, name: &str, span: Span, suggestion: Option<String>) {
        let mut diag = Diagnostic::error(
            codes::UNDEFINED_TYPE,
            format!("cannot find type `{}`", name),
            span,
        );
        if let Some(candidate) = suggestion {
            diag = diag.with_help(format!("did you mean `{}`?", candidate));
        }
        self.emit(diag);
    }

    pub fn cannot_unify(&mut self, left: &str, right: &str, span: Span) {
        self.emit(Diagnostic::error(
            codes::TYPE_MISMATCH,
            format!("cannot unify `{}` with `{}`", left, right),
            span,
        ));
    }

    pub fn arity_mismatch(&mut self, expected: usize, found: usize, span: Span) {
        self.emit(Diagnostic::error(
            codes::ARGUMENT_COUNT,
            format!("expected {} arguments, got {}", expected, found),
            span,
        ));
    }
}

/// Stable error codes; the table mirrors the compiler's error-kind catalog.
pub mod codes {
    // Name resolution
    pub const DUPLICATE_DEFINITION: &str = "E0428";
    pub const UNDEFINED_NAME: &str = "E0425";
    pub const UNDEFINED_TYPE: &str = "E0412";
    pub const BREAK_OUTSIDE_LOOP: &str = "E0268";
    pub const RETURN_OUTSIDE_FUNCTION: &str = "E0572";

    // Inference
    pub const TYPE_MISMATCH: &str = "E0308";
    pub const OCCURS_CHECK: &str = "E0275";
    pub const CONSTRAINT_VIOLATION: &str = "E0277";
    pub const ARGUMENT_COUNT: &str = "E0061";
    pub const CANNOT_INFER: &str = "E0282";
    pub const NO_SUCH_FIELD: &str = "E0609";
    pub const NO_SUCH_METHOD: &str = "E0599";

    // Type checking
    pub const RETURN_MISMATCH: &str = "E0308";
    pub const INVALID_PATTERN: &str = "E0004";
    pub const PAYLOAD_ARITY: &str = "E0023";
    pub const MISSING_FIELD: &str = "E0063";
    pub const UNKNOWN_FIELD: &str = "E0560";
    pub const INVALID_ASSIGN_TARGET: &str = "E0070";
    pub const NOT_IMPLEMENTED: &str = "E0658";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_renders_header_location_and_notes() {
        let span = Span::new("test.phi".to_string(), 2, 21, 7);
        let first = Span::new("test.phi".to_string(), 1, 1, 7);
        let diag = Diagnostic::error(
            codes::DUPLICATE_DEFINITION,
            "`add` is defined multiple times".to_string(),
            span,
        )
        .with_note_at("first defined here".to_string(), first)
        .with_help("rename one of the definitions".to_string());

        let rendered = format!("{}", diag);
        assert!(rendered.contains("E0428"));
        assert!(rendered.contains("`add` is defined multiple times"));
        assert!(rendered.contains("test.phi:2:21"));
        assert!(rendered.contains("first defined here"));
        assert!(rendered.contains("test.phi:1:1"));
    }

    #[test]
    fn engine_counts_by_level() {
        let mut engine = DiagnosticEngine::new();
        engine.emit_error(codes::TYPE_MISMATCH, "bad".to_string(), Span::unknown());
        engine.emit(Diagnostic::warning(
            "W0001",
            "meh".to_string(),
            Span::unknown(),
        ));
        assert!(engine.has_errors());
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.warning_count(), 1);
        assert_eq!(engine.diagnostics().len(), 2);
    }

    #[test]
    fn unknown_name_carries_suggestion() {
        let mut engine = DiagnosticEngine::new();
        engine.unknown_name("value", "lenght", Span::unknown(), Some("length".to_string()));
        let diag = &engine.diagnostics()[0];
        assert_eq!(diag.help.as_deref(), Some("did you mean `length`?"));
    }
}
