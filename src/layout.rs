use crate::config::Config;
use crate::diag::{AsmError, Diagnostics};
use crate::parser::{Block, Program};
use crate::symbols::SymbolTable;

// ----------------------------------------------------------------------------
// Address allocation
//
// Runs once, after parsing and before resolution. Functions are laid out
// sequentially from the code offset, memory blocks from the data offset,
// both in source order. Aliases name addresses, which are fixed here, so
// they are published into the symbol table immediately.

pub fn allocate(
    program: &mut Program,
    config: &Config,
    symbols: &mut SymbolTable,
    diags: &mut Diagnostics,
) {
    let mut code_cursor = config.offsets.code;
    let mut data_cursor = config.offsets.data;

    for block in &mut program.blocks {
        match block {
            Block::Function(f) => {
                f.start = Some(code_cursor);
                symbols.define_function(f.name.clone(), code_cursor, f.insts.len() as u32);
                for (idx, inst) in f.insts.iter().enumerate() {
                    if let Some(alias) = &inst.alias {
                        symbols.define_alias(
                            alias.clone(),
                            code_cursor + idx as u32,
                            inst.line,
                            diags,
                        );
                    }
                }
                code_cursor += f.insts.len() as u32;
            }
            Block::Memory(m) => {
                m.start = Some(data_cursor);
                symbols.define_memory(m.name.clone(), data_cursor, m.rows.len() as u32);
                for (idx, row) in m.rows.iter().enumerate() {
                    if let Some(alias) = &row.alias {
                        symbols.define_alias(
                            alias.clone(),
                            data_cursor + idx as u32,
                            row.line,
                            diags,
                        );
                    }
                }
                data_cursor += m.rows.len() as u32;
            }
        }
    }

    check_namespace(program, diags, true);
    check_namespace(program, diags, false);
}

fn check_namespace(program: &Program, diags: &mut Diagnostics, code: bool) {
    let spans: Vec<Span> = program
        .blocks
        .iter()
        .filter(|b| matches!(b, Block::Function(_)) == code)
        .map(|b| Span {
            name: b.name().to_string(),
            line: b.line(),
            start: match b {
                Block::Function(f) => f.start.unwrap_or(0),
                Block::Memory(m) => m.start.unwrap_or(0),
            },
            len: b.len(),
        })
        .collect();
    let kind = match code {
        true => "function",
        false => "memory block",
    };
    report_overlaps(&spans, kind, diags);
}

// ----------------------------------------------------------------------------
// Overlap detection
//
// Total over half-open `[start, start + len)` ranges within one namespace.
// Code and data sections index independent output streams, so a function and
// a memory block may share numeric addresses.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub name: String,
    pub line: u32,
    pub start: u32,
    pub len: u32,
}

impl Span {
    fn end(&self) -> u32 {
        self.start + self.len
    }
}

/// Every intersecting pair, in source order. Zero-length spans occupy no
/// addresses and never overlap.
pub fn find_overlaps(spans: &[Span]) -> Vec<(usize, usize)> {
    let mut hits = Vec::new();
    for i in 0..spans.len() {
        for j in i + 1..spans.len() {
            let (a, b) = (&spans[i], &spans[j]);
            if a.len > 0 && b.len > 0 && a.start < b.end() && b.start < a.end() {
                hits.push((i, j));
            }
        }
    }
    hits
}

pub fn report_overlaps(spans: &[Span], kind: &'static str, diags: &mut Diagnostics) {
    for (i, j) in find_overlaps(spans) {
        let (a, b) = (&spans[i], &spans[j]);
        diags.report(
            AsmError::Overlap {
                kind,
                a: a.name.clone(),
                a_line: a.line,
                b: b.name.clone(),
                b_line: b.line,
                lo: a.start.max(b.start),
                hi: a.end().min(b.end()),
            },
            b.line,
        );
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Line;
    use crate::parser::parse_program;

    fn span(name: &str, line: u32, start: u32, len: u32) -> Span {
        Span {
            name: name.to_string(),
            line,
            start,
            len,
        }
    }

    #[test]
    fn overlap_detection_is_total() {
        // Intersecting intervals are always reported.
        let spans = vec![span("a", 1, 0, 10), span("b", 5, 9, 4)];
        assert_eq!(find_overlaps(&spans), vec![(0, 1)]);
        // Adjacent half-open intervals are not.
        let spans = vec![span("a", 1, 0, 10), span("b", 5, 10, 4)];
        assert!(find_overlaps(&spans).is_empty());
        // Containment counts.
        let spans = vec![span("a", 1, 0, 10), span("b", 5, 2, 3)];
        assert_eq!(find_overlaps(&spans), vec![(0, 1)]);
        // Zero-length blocks occupy nothing.
        let spans = vec![span("a", 1, 4, 0), span("b", 5, 0, 10)];
        assert!(find_overlaps(&spans).is_empty());
    }

    #[test]
    fn one_diagnostic_per_pair() {
        let spans = vec![span("f", 1, 0, 100), span("g", 9, 50, 100)];
        let mut diags = Diagnostics::new();
        report_overlaps(&spans, "function", &mut diags);
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.err.kind(), "overlap");
        let msg = diag.err.to_string();
        assert!(msg.contains("`f`") && msg.contains("`g`"));
    }

    #[test]
    fn sequential_layout() {
        let source = "function boot():\n\
                      \tjump []\n\
                      \tjump []\n\
                      \n\
                      function main():\n\
                      \tjump []   #alias LOOP\n\
                      \n\
                      #memory Data:\n\
                      \t\"1\", \"2\", \"3\", \"4\"   #alias ROW0\n\
                      \t\"5\", \"6\", \"7\", \"8\"\n";
        let lines = Line::scan(source);
        let mut diags = Diagnostics::new();
        let mut program = parse_program(&lines, &mut diags);
        let mut symbols = SymbolTable::new();
        allocate(&mut program, &Config::default(), &mut symbols, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(symbols.function_addr("boot"), Some(0));
        assert_eq!(symbols.function_addr("main"), Some(2));
        assert_eq!(symbols.memories.get("Data").unwrap().start, 0x50);
        // Aliases publish layout-time addresses.
        assert_eq!(symbols.alias_addr("LOOP"), Some(2));
        assert_eq!(symbols.alias_addr("ROW0"), Some(0x50));
        assert_eq!(symbols.code_size(), 3);
        assert_eq!(symbols.data_size(), 2);
    }
}
