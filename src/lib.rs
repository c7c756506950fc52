mod config;
mod diag;
mod emit;
mod encoder;
mod expr;
mod isa;
mod layout;
mod lexer;
mod parser;
mod pipeline;
mod resolver;
mod symbols;

pub use config::{Config, FieldWidths, SectionOffsets, FIELD_BITS, WORD_BITS};
pub use diag::{AsmError, Diagnostic, Diagnostics, Severity};
pub use emit::{bitstring, format_word, readable, sort_records, ParamFormat};
pub use encoder::{encode, pack_word, Record};
pub use expr::{parse_with_prefix, BinOp, Expr, Reference};
pub use isa::{OpKind, OpSpec};
pub use layout::{allocate, find_overlaps, report_overlaps, Span};
pub use lexer::{Line, LineKind};
pub use parser::{
    parse_program, Block, Cell, DataRow, FunctionBlock, InstructionStmt, MacroDecl, MemoryBlock,
    Program,
};
pub use pipeline::{assemble, Assembly};
pub use resolver::{resolve_cells, resolve_macros, unresolved_count};
pub use symbols::{AliasEntry, FuncEntry, MacroEntry, MemEntry, SymbolTable};
