use color_print::cprintln;
use thiserror::Error;

use crate::lexer::Line;

// ----------------------------------------------------------------------------
// Error kinds

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsmError {
    #[error("malformed line: {0}")]
    Lex(String),

    #[error("{0}")]
    Parse(String),

    #[error("unknown opcode: `{0}`")]
    UnknownOpcode(String),

    #[error("unresolved symbol: {0}")]
    UnresolvedSymbol(String),

    #[error("macro reference cycle: {0}")]
    Cycle(String),

    #[error("{kind} `{a}` (line {a_line}) overlaps {kind} `{b}` (line {b_line}) at 0x{lo:X}..0x{hi:X}")]
    Overlap {
        kind: &'static str,
        a: String,
        a_line: u32,
        b: String,
        b_line: u32,
        lo: u32,
        hi: u32,
    },

    #[error("{field} value 0x{value:X} exceeds its {width}-bit field")]
    FieldOverflow { field: String, value: i64, width: u32 },

    #[error("field widths must sum to {expected}, got {got}")]
    WidthConfig { expected: u32, got: u64 },

    #[error("{namespace} `{name}` redefined; the last definition wins")]
    Redefinition { namespace: &'static str, name: String },
}

impl AsmError {
    pub fn kind(&self) -> &'static str {
        match self {
            AsmError::Lex(_) => "lex_error",
            AsmError::Parse(_) => "parse_error",
            AsmError::UnknownOpcode(_) => "unknown_opcode",
            AsmError::UnresolvedSymbol(_) => "unresolved_symbol",
            AsmError::Cycle(_) => "cycle",
            AsmError::Overlap { .. } => "overlap",
            AsmError::FieldOverflow { .. } => "field_overflow",
            AsmError::WidthConfig { .. } => "width_config",
            AsmError::Redefinition { .. } => "redefinition",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AsmError::Redefinition { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

// ----------------------------------------------------------------------------
// Collector

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub err: AsmError,
    pub line: Option<u32>,
    pub pass: u32,
}

/// Accumulates diagnostics across the whole pipeline run. Every component
/// takes this as an explicit argument instead of reaching for ambient state.
#[derive(Debug, Default)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics { list: Vec::new() }
    }

    pub fn report(&mut self, err: AsmError, line: u32) {
        self.list.push(Diagnostic {
            err,
            line: Some(line),
            pass: 0,
        });
    }

    pub fn report_global(&mut self, err: AsmError) {
        self.list.push(Diagnostic {
            err,
            line: None,
            pass: 0,
        });
    }

    pub fn report_in_pass(&mut self, err: AsmError, line: u32, pass: u32) {
        self.list.push(Diagnostic {
            err,
            line: Some(line),
            pass,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.list.iter().any(|d| d.err.severity() == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.list
            .iter()
            .filter(|d| d.err.severity() == Severity::Error)
            .count()
    }

    /// Diagnostics ordered by source line, then pass number. Global
    /// diagnostics (no line) sort first. The sort is stable, so reports on
    /// the same line keep their emission order.
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut list: Vec<&Diagnostic> = self.list.iter().collect();
        list.sort_by_key(|d| (d.line.unwrap_or(0), d.pass));
        list
    }

    /// Print every diagnostic with its source location and offending line.
    pub fn print(&self, file: &str, lines: &[Line]) {
        for diag in self.sorted() {
            match diag.err.severity() {
                Severity::Error => cprintln!("<red,bold>error</>: {}", diag.err),
                Severity::Warning => cprintln!("<yellow,bold>warning</>: {}", diag.err),
            }
            if let Some(number) = diag.line {
                cprintln!("     <blue>--></> <underline>{}:{}</>", file, number);
                cprintln!("      <blue>|</>");
                let content = lines
                    .get(number as usize - 1)
                    .map(|l| l.raw())
                    .unwrap_or("");
                cprintln!(" <blue>{:>4} |</> {}", number, content);
                cprintln!("      <blue>|</>");
            }
        }
    }

    /// Flat log file body: one record per diagnostic, stable order.
    pub fn to_log(&self) -> String {
        let mut out = String::new();
        for diag in self.sorted() {
            let severity = match diag.err.severity() {
                Severity::Error => "ERROR",
                Severity::Warning => "WARNING",
            };
            match diag.line {
                Some(number) => {
                    out.push_str(&format!("[{}] line {}: {}\n", severity, number, diag.err))
                }
                None => out.push_str(&format!("[{}] {}\n", severity, diag.err)),
            }
        }
        out
    }
}
