use crate::config::FieldWidths;
use crate::diag::{AsmError, Diagnostics};
use crate::isa::{OpKind, OpSpec};
use crate::parser::{Block, Program};

// ----------------------------------------------------------------------------
// Records
//
// One emitted word plus the provenance the report writer needs.

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Inst {
        addr: u32,
        word: u32,
        func: String,
        op: OpKind,
        params: [i64; 3],
        alias: Option<String>,
    },
    Data {
        addr: u32,
        word: u32,
        mem: String,
        bytes: [u8; 4],
        alias: Option<String>,
    },
}

impl Record {
    pub fn addr(&self) -> u32 {
        match self {
            Record::Inst { addr, .. } | Record::Data { addr, .. } => *addr,
        }
    }

    pub fn word(&self) -> u32 {
        match self {
            Record::Inst { word, .. } | Record::Data { word, .. } => *word,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Record::Inst { .. })
    }
}

// ----------------------------------------------------------------------------
// Word packing
//
// Layout from MSB to LSB: p (1) | c (1) | opcode | p3 | p2 | p1, with the
// widths taken from the validated config.

pub fn pack_word(spec: OpSpec, params: [u32; 3], w: &FieldWidths) -> u32 {
    let p2_shift = w.param1;
    let p3_shift = w.param1 + w.param2;
    let op_shift = w.param1 + w.param2 + w.param3;
    (spec.p() << 31)
        | (spec.c() << 30)
        | (spec.bits << op_shift)
        | (params[2] << p3_shift)
        | (params[1] << p2_shift)
        | params[0]
}

/// Encode every laid-out block. Cells that failed to resolve were already
/// reported and their statements are skipped; field overflows are reported
/// here, naming the parameter and source line.
pub fn encode(program: &Program, widths: &FieldWidths, diags: &mut Diagnostics) -> Vec<Record> {
    let mut records = Vec::new();
    for block in &program.blocks {
        match block {
            Block::Function(f) => {
                let Some(start) = f.start else { continue };
                for (idx, inst) in f.insts.iter().enumerate() {
                    let spec = inst.op.spec();
                    if widths.opcode >= 32 || spec.bits >= 1u32 << widths.opcode {
                        diags.report(
                            AsmError::FieldOverflow {
                                field: "opcode".to_string(),
                                value: spec.bits as i64,
                                width: widths.opcode,
                            },
                            inst.line,
                        );
                        continue;
                    }
                    let field_widths = [widths.param1, widths.param2, widths.param3];
                    let mut params = [0u32; 3];
                    let mut values = [0i64; 3];
                    let mut ok = true;
                    for (k, cell) in inst.cells.iter().enumerate() {
                        let Some(value) = cell.value else {
                            ok = false;
                            continue;
                        };
                        values[k] = value;
                        if value < 0 || value >= 1i64 << field_widths[k] {
                            diags.report(
                                AsmError::FieldOverflow {
                                    field: format!("param{}", k + 1),
                                    value,
                                    width: field_widths[k],
                                },
                                inst.line,
                            );
                            ok = false;
                        } else {
                            params[k] = value as u32;
                        }
                    }
                    if !ok {
                        continue;
                    }
                    records.push(Record::Inst {
                        addr: start + idx as u32,
                        word: pack_word(spec, params, widths),
                        func: f.name.clone(),
                        op: inst.op,
                        params: values,
                        alias: inst.alias.clone(),
                    });
                }
            }
            Block::Memory(m) => {
                let Some(start) = m.start else { continue };
                for (idx, row) in m.rows.iter().enumerate() {
                    let mut bytes = [0u8; 4];
                    let mut ok = true;
                    for (k, cell) in row.cells.iter().enumerate() {
                        let Some(value) = cell.value else {
                            ok = false;
                            continue;
                        };
                        if !(0..=0xFF).contains(&value) {
                            diags.report(
                                AsmError::FieldOverflow {
                                    field: format!("byte{}", k),
                                    value,
                                    width: 8,
                                },
                                row.line,
                            );
                            ok = false;
                        } else {
                            bytes[k] = value as u8;
                        }
                    }
                    if !ok {
                        continue;
                    }
                    // Row cell 0 is the most significant byte.
                    let word = u32::from_be_bytes(bytes);
                    records.push(Record::Data {
                        addr: start + idx as u32,
                        word,
                        mem: m.name.clone(),
                        bytes,
                        alias: row.alias.clone(),
                    });
                }
            }
        }
    }
    records
}

// ----------------------------------------------------------------------------
