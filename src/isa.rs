use bimap::BiMap;
use once_cell::sync::Lazy;

// ----------------------------------------------------------------------------
// Instruction set
//
// The set is closed and known at build time. Mnemonics are lowercase.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Setreg,
    Jump,
    Add,
}

static OP_STR: Lazy<BiMap<OpKind, &'static str>> = Lazy::new(|| {
    let mut map: BiMap<OpKind, &'static str> = BiMap::new();
    map.insert(OpKind::Setreg, "setreg");
    map.insert(OpKind::Jump, "jump");
    map.insert(OpKind::Add, "add");
    map
});

/// Encoding facts for one mnemonic: the opcode field value, which parameter
/// slots the instruction reads, and the two leading flag bits packed as
/// `0b<p><c>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpSpec {
    pub bits: u32,
    pub uses: [bool; 3],
    pub flags: u8,
}

impl OpSpec {
    pub fn p(&self) -> u32 {
        (self.flags >> 1 & 1) as u32
    }

    pub fn c(&self) -> u32 {
        (self.flags & 1) as u32
    }
}

impl OpKind {
    pub fn parse(s: &str) -> Option<OpKind> {
        OP_STR.get_by_right(s).copied()
    }

    pub fn print(self) -> &'static str {
        OP_STR.get_by_left(&self).unwrap()
    }

    pub fn spec(self) -> OpSpec {
        match self {
            OpKind::Setreg => OpSpec {
                bits: 0b00001,
                uses: [true, true, false],
                flags: 0b00,
            },
            // jump raises the p flag on its word.
            OpKind::Jump => OpSpec {
                bits: 0b00010,
                uses: [true, false, false],
                flags: 0b10,
            },
            OpKind::Add => OpSpec {
                bits: 0b00011,
                uses: [true, true, true],
                flags: 0b00,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_round_trip() {
        for kind in [OpKind::Setreg, OpKind::Jump, OpKind::Add] {
            assert_eq!(OpKind::parse(kind.print()), Some(kind));
        }
        assert_eq!(OpKind::parse("nop"), None);
        // Mnemonics are lowercase only.
        assert_eq!(OpKind::parse("JUMP"), None);
    }

    #[test]
    fn flag_bits() {
        assert_eq!(OpKind::Jump.spec().p(), 1);
        assert_eq!(OpKind::Jump.spec().c(), 0);
        assert_eq!(OpKind::Setreg.spec().p(), 0);
        assert_eq!(OpKind::Add.spec().p(), 0);
    }

    #[test]
    fn opcode_values() {
        assert_eq!(OpKind::Setreg.spec().bits, 1);
        assert_eq!(OpKind::Jump.spec().bits, 2);
        assert_eq!(OpKind::Add.spec().bits, 3);
    }
}
