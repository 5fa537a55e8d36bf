//! One scope's accumulated breakpoints, replaced wholesale on every
//! `set_*_breakpoints` call (spec §4.3).

/// One entry previously inserted into GDB: its assigned id and the
/// request that produced it.
#[derive(Debug, Clone)]
pub struct BookEntry<S> {
    pub gdb_id: u32,
    pub requested: S,
}

#[derive(Debug, Clone)]
pub struct BreakpointBook<S> {
    entries: Vec<BookEntry<S>>,
}

impl<S> Default for BreakpointBook<S> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<S> BreakpointBook<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// GDB ids currently held, in insertion order — the argument to the
    /// `-break-delete` sweep that precedes a replace.
    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.gdb_id).collect()
    }

    /// Replace the whole book's contents (only the successfully-inserted
    /// entries are passed in; failures never reach the book).
    pub fn replace(&mut self, entries: Vec<BookEntry<S>>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[BookEntry<S>] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
