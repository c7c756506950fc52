use crate::config::Config;
use crate::diag::Diagnostics;
use crate::emit;
use crate::encoder::{self, Record};
use crate::layout;
use crate::lexer::Line;
use crate::parser::{self, Program};
use crate::resolver;
use crate::symbols::SymbolTable;

// ----------------------------------------------------------------------------
// Pipeline
//
// A pure function from scanned lines and config to emitted records. All
// failure modes land in the diagnostics collector; no I/O happens here.

#[derive(Debug)]
pub struct Assembly {
    pub records: Vec<Record>,
    pub symbols: SymbolTable,
    pub program: Program,
    /// Resolver passes taken to reach the fixed point.
    pub passes: u32,
}

pub fn assemble(lines: &[Line], config: &Config, diags: &mut Diagnostics) -> Assembly {
    let mut program = parser::parse_program(lines, diags);
    let mut symbols = SymbolTable::new();
    resolver::resolve_macros(&program.macros, &mut symbols, diags);
    layout::allocate(&mut program, config, &mut symbols, diags);
    let passes = resolver::resolve_cells(&mut program, &symbols, diags);
    let mut records = encoder::encode(&program, &config.widths, diags);
    emit::sort_records(&mut records);
    Assembly {
        records,
        symbols,
        program,
        passes,
    }
}
