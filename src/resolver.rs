use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::diag::{AsmError, Diagnostics};
use crate::expr::Reference;
use crate::parser::{Block, MacroDecl, Program};
use crate::symbols::SymbolTable;

// ----------------------------------------------------------------------------
// Macro resolution
//
// Macro values may reference other macros, including ones declared later, so
// they fold to integers by fixed point: keep retrying the pending set until a
// full sweep makes no progress. Termination is guaranteed because each
// progressing sweep shrinks the set.

pub fn resolve_macros(decls: &[MacroDecl], symbols: &mut SymbolTable, diags: &mut Diagnostics) {
    // Last declaration of a name wins; earlier ones only warn.
    let mut last: IndexMap<&str, &MacroDecl> = IndexMap::new();
    for decl in decls {
        if last.insert(decl.name.as_str(), decl).is_some() {
            diags.report(
                AsmError::Redefinition {
                    namespace: "macro",
                    name: decl.name.clone(),
                },
                decl.line,
            );
        }
    }

    let mut values: IndexMap<String, i64> = IndexMap::new();
    let mut pending: Vec<&MacroDecl> = last.values().copied().collect();
    let mut progress = true;
    while !pending.is_empty() && progress {
        progress = false;
        pending.retain(|decl| {
            let folded = decl.value.eval(&|r| match r {
                Reference::Macro(name) => values.get(name).copied(),
                _ => None,
            });
            match folded {
                Some(value) => {
                    values.insert(decl.name.clone(), value);
                    progress = true;
                    false
                }
                None => true,
            }
        });
    }

    if !pending.is_empty() {
        report_stuck_macros(&pending, &last, diags);
    }

    for (name, decl) in &last {
        if let Some(&value) = values.get(*name) {
            symbols.define_macro(decl.name.clone(), value, decl.line);
        }
    }
}

fn report_stuck_macros(
    pending: &[&MacroDecl],
    declared: &IndexMap<&str, &MacroDecl>,
    diags: &mut Diagnostics,
) {
    let edges: HashMap<&str, Vec<&str>> = pending
        .iter()
        .map(|decl| {
            let refs = decl
                .value
                .refs()
                .into_iter()
                .filter_map(|r| match r {
                    Reference::Macro(name) => Some(name),
                    _ => None,
                })
                .collect();
            (decl.name.as_str(), refs)
        })
        .collect();

    let mut cycle: Vec<&MacroDecl> = Vec::new();
    for decl in pending {
        let mut missing: Vec<String> = Vec::new();
        for reference in decl.value.refs() {
            match reference {
                Reference::Macro(name) => {
                    if !declared.contains_key(name) {
                        missing.push(format!("#{}", name));
                    }
                }
                Reference::Alias(name) => missing.push(format!("@{}", name)),
                Reference::Func(name) => missing.push(format!("{}():", name)),
            }
        }
        if !missing.is_empty() {
            diags.report(
                AsmError::UnresolvedSymbol(format!(
                    "macro `{}` references undefined {}",
                    decl.name,
                    missing.join(", ")
                )),
                decl.line,
            );
        } else if on_cycle(decl.name.as_str(), &edges) {
            cycle.push(*decl);
        } else {
            diags.report(
                AsmError::UnresolvedSymbol(format!(
                    "macro `{}` depends on an unresolvable macro",
                    decl.name
                )),
                decl.line,
            );
        }
    }

    if !cycle.is_empty() {
        let mut chain: Vec<&str> = cycle.iter().map(|d| d.name.as_str()).collect();
        chain.push(cycle[0].name.as_str());
        diags.report(AsmError::Cycle(chain.join(" -> ")), cycle[0].line);
    }
}

fn on_cycle<'a>(name: &'a str, edges: &HashMap<&'a str, Vec<&'a str>>) -> bool {
    let mut stack: Vec<&str> = edges.get(name).cloned().unwrap_or_default();
    let mut seen: HashSet<&str> = HashSet::new();
    while let Some(next) = stack.pop() {
        if next == name {
            return true;
        }
        if seen.insert(next) {
            if let Some(successors) = edges.get(next) {
                stack.extend(successors.iter().copied());
            }
        }
    }
    false
}

// ----------------------------------------------------------------------------
// Cell resolution
//
// Every unresolved instruction parameter and data-row cell is retried each
// pass; a pass that resolves nothing new ends the loop. Whatever is left is
// reported with its source line and the pass it died in. The unresolved
// count never grows across passes.

pub fn resolve_cells(
    program: &mut Program,
    symbols: &SymbolTable,
    diags: &mut Diagnostics,
) -> u32 {
    let mut pass: u32 = 0;
    loop {
        pass += 1;
        let mut progress = false;
        for block in &mut program.blocks {
            match block {
                Block::Function(f) => {
                    for inst in &mut f.insts {
                        for cell in &mut inst.cells {
                            if cell.value.is_none() {
                                if let Some(v) = cell.expr.eval(&|r| symbols.lookup(r)) {
                                    cell.value = Some(v);
                                    progress = true;
                                }
                            }
                        }
                    }
                }
                Block::Memory(m) => {
                    for row in &mut m.rows {
                        for cell in &mut row.cells {
                            if cell.value.is_none() {
                                if let Some(v) = cell.expr.eval(&|r| symbols.lookup(r)) {
                                    cell.value = Some(v);
                                    progress = true;
                                }
                            }
                        }
                    }
                }
            }
        }
        if !progress {
            break;
        }
    }

    for block in &program.blocks {
        match block {
            Block::Function(f) => {
                for inst in &f.insts {
                    for (idx, cell) in inst.cells.iter().enumerate() {
                        if cell.value.is_none() {
                            diags.report_in_pass(
                                AsmError::UnresolvedSymbol(format!(
                                    "param{} `{}` of `{}`",
                                    idx + 1,
                                    cell.expr,
                                    inst.op.print()
                                )),
                                inst.line,
                                pass,
                            );
                        }
                    }
                }
            }
            Block::Memory(m) => {
                for row in &m.rows {
                    for (idx, cell) in row.cells.iter().enumerate() {
                        if cell.value.is_none() {
                            diags.report_in_pass(
                                AsmError::UnresolvedSymbol(format!(
                                    "cell {} `{}` of a row in `{}`",
                                    idx + 1,
                                    cell.expr,
                                    m.name
                                )),
                                row.line,
                                pass,
                            );
                        }
                    }
                }
            }
        }
    }
    pass
}

/// Cells still holding symbolic expressions. Shrinks monotonically across
/// resolver passes.
pub fn unresolved_count(program: &Program) -> usize {
    program
        .blocks
        .iter()
        .map(|block| match block {
            Block::Function(f) => f
                .insts
                .iter()
                .flat_map(|i| i.cells.iter())
                .filter(|c| c.value.is_none())
                .count(),
            Block::Memory(m) => m
                .rows
                .iter()
                .flat_map(|r| r.cells.iter())
                .filter(|c| c.value.is_none())
                .count(),
        })
        .sum()
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layout;
    use crate::lexer::Line;
    use crate::parser::parse_program;

    fn front(source: &str) -> (Program, SymbolTable, Diagnostics) {
        let lines = Line::scan(source);
        let mut diags = Diagnostics::new();
        let mut program = parse_program(&lines, &mut diags);
        let mut symbols = SymbolTable::new();
        resolve_macros(&program.macros, &mut symbols, &mut diags);
        layout::allocate(&mut program, &Config::default(), &mut symbols, &mut diags);
        (program, symbols, diags)
    }

    #[test]
    fn macro_chains_fold() {
        let (_, symbols, diags) = front(
            "#macro A #B\n\
             #macro B C\n\
             #macro C 0x42\n",
        );
        assert!(diags.is_empty());
        assert_eq!(symbols.macro_value("A"), Some(0x42));
        assert_eq!(symbols.macro_value("B"), Some(0x42));
    }

    #[test]
    fn macro_redefinition_warns_last_wins() {
        let (_, symbols, diags) = front("#macro A 1\n#macro A 2\n");
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.err.kind(), "redefinition");
        assert!(!diags.has_errors());
        assert_eq!(symbols.macro_value("A"), Some(2));
    }

    #[test]
    fn macro_cycle_reported_once() {
        let (_, symbols, diags) = front("#macro X #Y\n#macro Y #X\n");
        let cycles: Vec<_> = diags.iter().filter(|d| d.err.kind() == "cycle").collect();
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].err.to_string().contains("X"));
        assert!(cycles[0].err.to_string().contains("Y"));
        assert_eq!(symbols.macro_value("X"), None);
    }

    #[test]
    fn macro_undefined_reference() {
        let (_, _, diags) = front("#macro A #NOPE\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().err.kind(), "unresolved_symbol");
    }

    #[test]
    fn forward_function_reference_resolves() {
        let (mut program, symbols, mut diags) = front(
            "function boot():\n\
             \tjump [main():]\n\
             \n\
             function main():\n\
             \tjump [main():]\n",
        );
        assert!(diags.is_empty());
        assert_eq!(unresolved_count(&program), 6);
        resolve_cells(&mut program, &symbols, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(unresolved_count(&program), 0);
        if let Block::Function(f) = &program.blocks[0] {
            assert_eq!(f.insts[0].cells[0].value, Some(1));
        }
    }

    #[test]
    fn leftover_cells_reported_with_lines() {
        let (mut program, symbols, mut diags) = front(
            "function f():\n\
             \tjump [@NOWHERE]\n\
             \tadd [1] [2] [3]\n",
        );
        let before = unresolved_count(&program);
        resolve_cells(&mut program, &symbols, &mut diags);
        let after = unresolved_count(&program);
        assert!(after < before);
        assert_eq!(after, 1);
        let unresolved: Vec<_> = diags
            .iter()
            .filter(|d| d.err.kind() == "unresolved_symbol")
            .collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].line, Some(2));
        assert!(unresolved[0].err.to_string().contains("@NOWHERE"));
    }

    #[test]
    fn alias_addresses_reach_cells() {
        let (mut program, symbols, mut diags) = front(
            "function f():\n\
             \tsetreg [1] [2]   #alias HERE\n\
             \tjump [@HERE]\n",
        );
        resolve_cells(&mut program, &symbols, &mut diags);
        assert!(diags.is_empty());
        if let Block::Function(f) = &program.blocks[0] {
            assert_eq!(f.insts[1].cells[0].value, Some(0));
        }
    }
}
