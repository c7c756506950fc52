use indexmap::IndexMap;
use serde::Serialize;

use crate::diag::{AsmError, Diagnostics};
use crate::expr::Reference;

// ----------------------------------------------------------------------------
// Symbol table
//
// Four name-spaces with distinct sigils at reference sites. Names are unique
// within a namespace; collisions across name-spaces are allowed. Iteration
// order is declaration order, which the emitters rely on for determinism.

#[derive(Debug, Clone, Serialize)]
pub struct MacroEntry {
    pub value: i64,
    pub defined_at: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AliasEntry {
    pub address: u32,
    pub defined_at: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FuncEntry {
    pub start: u32,
    pub len: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemEntry {
    pub start: u32,
    pub len: u32,
}

#[derive(Debug, Default, Serialize)]
pub struct SymbolTable {
    pub macros: IndexMap<String, MacroEntry>,
    pub aliases: IndexMap<String, AliasEntry>,
    pub functions: IndexMap<String, FuncEntry>,
    pub memories: IndexMap<String, MemEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Macro redefinition warnings are emitted by the resolver, which sees
    /// the declarations in source order; this is a plain insert.
    pub fn define_macro(&mut self, name: String, value: i64, defined_at: u32) {
        self.macros.insert(name, MacroEntry { value, defined_at });
    }

    /// Aliases warn on redefinition; the last definition wins.
    pub fn define_alias(
        &mut self,
        name: String,
        address: u32,
        defined_at: u32,
        diags: &mut Diagnostics,
    ) {
        if self
            .aliases
            .insert(name.clone(), AliasEntry { address, defined_at })
            .is_some()
        {
            diags.report(
                AsmError::Redefinition {
                    namespace: "alias",
                    name,
                },
                defined_at,
            );
        }
    }

    /// Duplicate block names are screened as parse errors, so function and
    /// memory entries insert unconditionally.
    pub fn define_function(&mut self, name: String, start: u32, len: u32) {
        self.functions.insert(name, FuncEntry { start, len });
    }

    pub fn define_memory(&mut self, name: String, start: u32, len: u32) {
        self.memories.insert(name, MemEntry { start, len });
    }

    pub fn macro_value(&self, name: &str) -> Option<i64> {
        self.macros.get(name).map(|e| e.value)
    }

    pub fn alias_addr(&self, name: &str) -> Option<u32> {
        self.aliases.get(name).map(|e| e.address)
    }

    pub fn function_addr(&self, name: &str) -> Option<u32> {
        self.functions.get(name).map(|e| e.start)
    }

    /// Environment adapter for expression folding.
    pub fn lookup(&self, reference: Reference) -> Option<i64> {
        match reference {
            Reference::Macro(name) => self.macro_value(name),
            Reference::Alias(name) => self.alias_addr(name).map(i64::from),
            Reference::Func(name) => self.function_addr(name).map(i64::from),
        }
    }

    pub fn code_size(&self) -> u32 {
        self.functions.values().map(|e| e.len).sum()
    }

    pub fn data_size(&self) -> u32 {
        self.memories.values().map(|e| e.len).sum()
    }

    /// YAML dump of all four name-spaces for the `-d` flag.
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_else(|e| format!("# symbol dump failed: {}\n", e))
    }
}

// ----------------------------------------------------------------------------
