use crate::diag::AsmError;
use crate::expr::Expr;

// ----------------------------------------------------------------------------
// Line

/// One physical source line after comment stripping. Line numbers are
/// 1-based and never shift; blank lines are kept as block separators.
#[derive(Debug, Clone)]
pub struct Line {
    pub number: u32,
    raw: String,
    code: String,
}

impl Line {
    pub fn scan(source: &str) -> Vec<Line> {
        source
            .lines()
            .enumerate()
            .map(|(idx, raw)| {
                let code = raw.split_once("//").map_or(raw, |(code, _)| code);
                Line {
                    number: idx as u32 + 1,
                    raw: raw.to_string(),
                    code: code.trim().to_string(),
                }
            })
            .collect()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

// ----------------------------------------------------------------------------
// Classification

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// Physically empty line; terminates the current block.
    Blank,
    /// Comment-only line; ignored entirely.
    Comment,
    MacroDef {
        name: String,
        value: Expr,
    },
    MemoryHeader {
        name: String,
    },
    FunctionHeader {
        name: String,
    },
    DataRow {
        cells: [Expr; 4],
        alias: Option<String>,
    },
    Instruction {
        opcode: String,
        cells: [Expr; 3],
        alias: Option<String>,
    },
}

impl Line {
    pub fn classify(&self) -> Result<LineKind, AsmError> {
        let code = self.code.as_str();
        if code.is_empty() {
            return Ok(match self.raw.trim().is_empty() {
                true => LineKind::Blank,
                false => LineKind::Comment,
            });
        }

        let first = code.split_whitespace().next().unwrap_or("");
        match first {
            "#macro" => return classify_macro(code),
            "#memory" => return classify_memory(code),
            "function" => return classify_function(code),
            _ => {}
        }

        let (body, alias) = split_alias(code)?;
        match body.trim_start().starts_with('"') {
            true => classify_data_row(body, alias),
            false => classify_instruction(body, alias),
        }
    }
}

// `#macro NAME VALUE`
fn classify_macro(code: &str) -> Result<LineKind, AsmError> {
    let rest = code["#macro".len()..].trim();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_string();
    let value = parts.next().unwrap_or("").trim();
    if name.is_empty() || value.is_empty() {
        return Err(AsmError::Lex("invalid macro definition".to_string()));
    }
    let value = Expr::parse(value).map_err(AsmError::Lex)?;
    Ok(LineKind::MacroDef { name, value })
}

// `#memory NAME:`
fn classify_memory(code: &str) -> Result<LineKind, AsmError> {
    let name = code["#memory".len()..]
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_string();
    match name.is_empty() {
        true => Err(AsmError::Parse("memory block name missing".to_string())),
        false => Ok(LineKind::MemoryHeader { name }),
    }
}

// `function NAME():`
fn classify_function(code: &str) -> Result<LineKind, AsmError> {
    let after = code["function".len()..].trim();
    let name = after
        .split('(')
        .next()
        .unwrap_or("")
        .trim_end_matches(':')
        .trim()
        .to_string();
    match name.is_empty() {
        true => Err(AsmError::Parse("function name missing".to_string())),
        false => Ok(LineKind::FunctionHeader { name }),
    }
}

// Exactly four cells, each `"expr"` or a bare literal token, comma separated.
fn classify_data_row(body: &str, alias: Option<String>) -> Result<LineKind, AsmError> {
    let cells = split_data_cells(body)?;
    let cells = match <[String; 4]>::try_from(cells) {
        Ok(cells) => cells,
        Err(cells) => {
            return Err(AsmError::Lex(format!(
                "expected 4 data cells, got {}",
                cells.len()
            )))
        }
    };
    let mut parsed = Vec::with_capacity(4);
    for cell in cells {
        parsed.push(Expr::parse(&cell).map_err(AsmError::Lex)?);
    }
    let cells = match <[Expr; 4]>::try_from(parsed) {
        Ok(cells) => cells,
        Err(_) => unreachable!("arity checked above"),
    };
    Ok(LineKind::DataRow { cells, alias })
}

// `<opcode> [<cell>] [<cell>] [<cell>]`
fn classify_instruction(body: &str, alias: Option<String>) -> Result<LineKind, AsmError> {
    let body = body.trim();
    let (opcode, rest) = match body.split_once(char::is_whitespace) {
        Some((opcode, rest)) => (opcode, rest),
        None => (body, ""),
    };
    let cells = split_param_cells(rest)?;
    if cells.len() > 3 {
        return Err(AsmError::Lex(format!(
            "too many parameter cells: expected at most 3, got {}",
            cells.len()
        )));
    }
    let mut iter = cells.into_iter();
    let cells = [
        next_cell(&mut iter)?,
        next_cell(&mut iter)?,
        next_cell(&mut iter)?,
    ];
    Ok(LineKind::Instruction {
        opcode: opcode.to_string(),
        cells,
        alias,
    })
}

fn next_cell(iter: &mut impl Iterator<Item = String>) -> Result<Expr, AsmError> {
    match iter.next() {
        Some(text) => Expr::parse(&text).map_err(AsmError::Lex),
        None => Ok(Expr::Literal(0)),
    }
}

/// Split a trailing `#alias NAME` off a statement. The sigil only counts at
/// a token boundary, so macro references like `[#aliasing]` stay intact.
fn split_alias(code: &str) -> Result<(&str, Option<String>), AsmError> {
    if let Some(pos) = code.rfind("#alias") {
        let before = &code[..pos];
        let after = &code[pos + "#alias".len()..];
        let boundary = before.is_empty()
            || before.ends_with(char::is_whitespace)
            || before.ends_with(']')
            || before.ends_with('"');
        if boundary && after.starts_with(char::is_whitespace) {
            let name = after.trim();
            if name.is_empty() || name.split_whitespace().count() != 1 {
                return Err(AsmError::Lex("expected one alias name".to_string()));
            }
            return Ok((before, Some(name.to_string())));
        }
        if boundary {
            return Err(AsmError::Lex("empty alias name".to_string()));
        }
    }
    Ok((code, None))
}

fn split_data_cells(body: &str) -> Result<Vec<String>, AsmError> {
    if body.contains(',') {
        // Comma-separated cells, each `"expr"` or a bare literal token.
        body.split(',').map(|cell| unquote(cell.trim())).collect()
    } else {
        // Whitespace-separated quoted entries.
        let parts: Vec<&str> = body.split('"').collect();
        if parts.len() % 2 == 0 {
            return Err(AsmError::Lex("unterminated quoted cell".to_string()));
        }
        let mut cells = Vec::new();
        for (idx, part) in parts.iter().enumerate() {
            if idx % 2 == 1 {
                cells.push(part.to_string());
            } else if !part.trim().is_empty() {
                return Err(AsmError::Lex(format!(
                    "unexpected text between data cells: `{}`",
                    part.trim()
                )));
            }
        }
        Ok(cells)
    }
}

fn unquote(cell: &str) -> Result<String, AsmError> {
    if let Some(inner) = cell.strip_prefix('"') {
        match inner.strip_suffix('"') {
            Some(inner) => Ok(inner.to_string()),
            None => Err(AsmError::Lex("unterminated quoted cell".to_string())),
        }
    } else if cell.contains('"') {
        Err(AsmError::Lex(format!("stray quote in data cell `{}`", cell)))
    } else {
        Ok(cell.to_string())
    }
}

fn split_param_cells(rest: &str) -> Result<Vec<String>, AsmError> {
    let mut cells = Vec::new();
    let mut remaining = rest.trim();
    while !remaining.is_empty() {
        if !remaining.starts_with('[') {
            return Err(AsmError::Lex(format!(
                "expected `[` before `{}`",
                remaining
            )));
        }
        let close = remaining
            .find(']')
            .ok_or_else(|| AsmError::Lex("missing `]` in parameter cell".to_string()))?;
        cells.push(remaining[1..close].to_string());
        remaining = remaining[close + 1..].trim_start();
    }
    Ok(cells)
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn classify(code: &str) -> Result<LineKind, AsmError> {
        let lines = Line::scan(code);
        lines[0].classify()
    }

    #[test]
    fn scan_keeps_line_numbers() {
        let lines = Line::scan("a\n\n// only comment\nb");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[3].number, 4);
        assert_eq!(lines[2].code(), "");
        assert_eq!(lines[2].raw(), "// only comment");
    }

    #[test]
    fn blank_vs_comment() {
        assert_eq!(classify("   ").unwrap(), LineKind::Blank);
        assert_eq!(classify("// note").unwrap(), LineKind::Comment);
    }

    #[test]
    fn headers() {
        assert_eq!(
            classify("function boot():").unwrap(),
            LineKind::FunctionHeader { name: "boot".into() }
        );
        assert_eq!(
            classify("#memory BootSection:").unwrap(),
            LineKind::MemoryHeader { name: "BootSection".into() }
        );
        assert!(classify("function ():").is_err());
        assert!(classify("#memory").is_err());
    }

    #[test]
    fn macro_def() {
        match classify("#macro BOOT_ADDR 0x100").unwrap() {
            LineKind::MacroDef { name, value } => {
                assert_eq!(name, "BOOT_ADDR");
                assert_eq!(value, Expr::Literal(0x100));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(classify("#macro ONLY_NAME").is_err());
    }

    #[test]
    fn instruction_cells() {
        match classify("setreg [#STACK_TOP] [2]  #alias INIT").unwrap() {
            LineKind::Instruction { opcode, cells, alias } => {
                assert_eq!(opcode, "setreg");
                assert_eq!(cells[0], Expr::MacroRef("STACK_TOP".into()));
                assert_eq!(cells[1], Expr::Literal(2));
                assert_eq!(cells[2], Expr::Literal(0));
                assert_eq!(alias.as_deref(), Some("INIT"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        // An empty cell is zero, missing cells pad with zero.
        match classify("jump []").unwrap() {
            LineKind::Instruction { cells, .. } => {
                assert_eq!(cells, [Expr::Literal(0), Expr::Literal(0), Expr::Literal(0)]);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(classify("add [1] [2] [3] [4]").is_err());
        assert!(classify("add 1 2").is_err());
    }

    #[test]
    fn data_rows() {
        match classify("\"0x18\", \"0x23\", \"0x12\", \"0x11\"").unwrap() {
            LineKind::DataRow { cells, alias } => {
                assert_eq!(cells[0], Expr::Literal(0x18));
                assert_eq!(cells[3], Expr::Literal(0x11));
                assert_eq!(alias, None);
            }
            other => panic!("unexpected: {:?}", other),
        }
        match classify("\"#A | #B\", \"0\", \"0\", \"0\"  #alias ROW").unwrap() {
            LineKind::DataRow { alias, .. } => assert_eq!(alias.as_deref(), Some("ROW")),
            other => panic!("unexpected: {:?}", other),
        }
        // Whitespace-separated quoted entries and mixed bare literals.
        match classify("\"0b00010010\" \"0x11\" \"32\" \"0\"").unwrap() {
            LineKind::DataRow { cells, .. } => assert_eq!(cells[0], Expr::Literal(0b00010010)),
            other => panic!("unexpected: {:?}", other),
        }
        match classify("\"0x18\", 0x23, \"0x12\", 0x11").unwrap() {
            LineKind::DataRow { cells, .. } => assert_eq!(cells[1], Expr::Literal(0x23)),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(classify("\"1\", \"2\", \"3\"").is_err());
        assert!(classify("\"1\", \"2\", \"3\", \"4").is_err());
    }

    #[test]
    fn comments_strip_mid_line() {
        let lines = Line::scan("jump [main():] // to entry");
        match lines[0].classify().unwrap() {
            LineKind::Instruction { opcode, cells, .. } => {
                assert_eq!(opcode, "jump");
                assert_eq!(cells[0], Expr::FuncRef("main".into()));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
