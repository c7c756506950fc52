use crate::diag::AsmError;
use crate::expr::parse_with_prefix;

pub const WORD_BITS: u32 = 32;
pub const FLAG_BITS: u32 = 2;
/// Bits left for opcode + parameters once the two flag bits are taken.
pub const FIELD_BITS: u32 = WORD_BITS - FLAG_BITS;

// ----------------------------------------------------------------------------
// Field widths

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWidths {
    pub opcode: u32,
    pub param1: u32,
    pub param2: u32,
    pub param3: u32,
}

impl Default for FieldWidths {
    fn default() -> Self {
        FieldWidths {
            opcode: 5,
            param1: 14,
            param2: 5,
            param3: 6,
        }
    }
}

impl FieldWidths {
    pub fn sum(&self) -> u64 {
        self.opcode as u64 + self.param1 as u64 + self.param2 as u64 + self.param3 as u64
    }

    /// The widths must fill the word exactly; anything else is fatal before
    /// parsing even starts.
    pub fn validate(&self) -> Result<(), AsmError> {
        match self.sum() == FIELD_BITS as u64 {
            true => Ok(()),
            false => Err(AsmError::WidthConfig {
                expected: FIELD_BITS,
                got: self.sum(),
            }),
        }
    }

    /// Parse a `-w opcode=5,param1=14,param2=5,param3=6` override. Unnamed
    /// keys keep their defaults. Malformed input is CLI misuse, not a
    /// pipeline diagnostic.
    pub fn parse(spec: &str) -> Result<FieldWidths, String> {
        let mut widths = FieldWidths::default();
        for part in spec.split(',') {
            let (key, value) = split_assign(part)?;
            let slot = match key {
                "opcode" => &mut widths.opcode,
                "param1" => &mut widths.param1,
                "param2" => &mut widths.param2,
                "param3" => &mut widths.param3,
                other => {
                    return Err(format!(
                        "unknown field key `{}`; expected opcode, param1, param2 or param3",
                        other
                    ))
                }
            };
            *slot = value;
        }
        Ok(widths)
    }
}

// ----------------------------------------------------------------------------
// Section offsets

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOffsets {
    pub code: u32,
    pub data: u32,
}

impl Default for SectionOffsets {
    fn default() -> Self {
        SectionOffsets { code: 0, data: 0x50 }
    }
}

impl SectionOffsets {
    /// Parse a `-m code=0,data=0x50` override.
    pub fn parse(spec: &str) -> Result<SectionOffsets, String> {
        let mut offsets = SectionOffsets::default();
        for part in spec.split(',') {
            let (key, value) = split_assign(part)?;
            match key {
                "code" => offsets.code = value,
                "data" => offsets.data = value,
                other => {
                    return Err(format!(
                        "unknown section key `{}`; expected code or data",
                        other
                    ))
                }
            }
        }
        Ok(offsets)
    }
}

fn split_assign(part: &str) -> Result<(&str, u32), String> {
    let (key, value) = part
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", part))?;
    let key = key.trim();
    let value = parse_with_prefix(value.trim())
        .ok()
        .filter(|v| (0..=u32::MAX as i64).contains(v))
        .ok_or_else(|| format!("invalid value `{}` for `{}`", value.trim(), key))?;
    Ok((key, value as u32))
}

// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub offsets: SectionOffsets,
    pub widths: FieldWidths,
}
