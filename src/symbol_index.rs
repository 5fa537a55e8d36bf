//! `SymbolIndex`: an opaque view over the program's debug symbols (spec
//! §1 — DWARF/ELF reading is explicitly out of scope here).
//!
//! Grounded on `dap_server/server/configuration.rs`'s trait-shaped seam
//! between session sequencing and data that a different subsystem owns.

/// One named function's address range, as needed by `run-to-entry-point`
/// (spec §4.4) and the `load-function-symbols` custom request (spec §6).
#[derive(Debug, Clone)]
pub struct FunctionRange {
    pub name: String,
    pub low_pc: u64,
    pub high_pc: u64,
}

/// One named global or static variable's storage address and size.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    pub name: String,
    pub address: u64,
    pub size: u64,
}

/// Supplied by the embedding application; `Session` never parses DWARF
/// or ELF itself.
pub trait SymbolIndex: Send + Sync {
    fn globals(&self) -> Vec<MemoryRegion>;
    fn statics(&self) -> Vec<MemoryRegion>;
    fn memory_regions(&self) -> Vec<MemoryRegion>;
    fn function_ranges(&self) -> Vec<FunctionRange>;

    /// Look up the entry address for `run-to-entry-point` (spec §4.4).
    fn function_range(&self, name: &str) -> Option<FunctionRange> {
        self.function_ranges().into_iter().find(|f| f.name == name)
    }
}
