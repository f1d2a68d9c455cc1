/// Which per-stream metadata table an index or append targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Host,
    Source,
    SourceType,
}

impl Scope {
    pub fn name(self) -> &'static str {
        match self {
            Scope::Host => "host",
            Scope::Source => "source",
            Scope::SourceType => "sourcetype",
        }
    }
}

/// Three independent append-only ordered sequences of byte strings.
/// Entries are assigned monotonically increasing indices starting at
/// 0; nothing is ever deleted, replaced, or reordered. Lifetime is tied to
/// the owning decoder.
#[derive(Debug, Default)]
pub struct DictionaryTable {
    host: Vec<Vec<u8>>,
    source: Vec<Vec<u8>>,
    sourcetype: Vec<Vec<u8>>,
}

impl DictionaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, scope: Scope) -> &Vec<Vec<u8>> {
        match scope {
            Scope::Host => &self.host,
            Scope::Source => &self.source,
            Scope::SourceType => &self.sourcetype,
        }
    }

    fn table_mut(&mut self, scope: Scope) -> &mut Vec<Vec<u8>> {
        match scope {
            Scope::Host => &mut self.host,
            Scope::Source => &mut self.source,
            Scope::SourceType => &mut self.sourcetype,
        }
    }

    /// Appends `bytes` to `scope`'s table, returning its new index (the
    /// table's previous length).
    pub fn append(&mut self, scope: Scope, bytes: Vec<u8>) -> u64 {
        let table = self.table_mut(scope);
        let idx = table.len() as u64;
        table.push(bytes);
        idx
    }

    /// Resolves `idx` in `scope`'s table, or `None` if out of range.
    pub fn get(&self, scope: Scope, idx: u64) -> Option<&[u8]> {
        self.table(scope).get(idx as usize).map(Vec::as_slice)
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.table(scope).len()
    }

    pub fn is_empty(&self, scope: Scope) -> bool {
        self.len(scope) == 0
    }
}
