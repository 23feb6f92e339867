#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use reclist_contracts::record::{RecordFactory, RecordKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSetError {
    NotFound { key: RecordKey },
    KeySpaceExhausted,
}

impl fmt::Display for RecordSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "record key {key} not found"),
            Self::KeySpaceExhausted => write!(f, "record key space exhausted"),
        }
    }
}

impl std::error::Error for RecordSetError {}

/// Ordered mapping from record key to the editable binding for that record.
///
/// New keys are always `max + 1`, so a key freed by a removal is never handed out again while
/// a higher key exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet<B> {
    entries: BTreeMap<RecordKey, B>,
}

impl<B> Default for RecordSet<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> RecordSet<B> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert_at(&mut self, key: RecordKey, binding: B) -> Option<B> {
        self.entries.insert(key, binding)
    }

    /// Inserts `make()` at `key` unless an entry is already there; returns true on insert.
    pub fn ensure_at(&mut self, key: RecordKey, make: impl FnOnce() -> B) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, make());
        true
    }

    pub fn remove_at(&mut self, key: RecordKey) -> Result<B, RecordSetError> {
        self.entries
            .remove(&key)
            .ok_or(RecordSetError::NotFound { key })
    }

    pub fn next_key(&self) -> Result<RecordKey, RecordSetError> {
        match self.entries.keys().next_back() {
            None => Ok(RecordKey::FIRST),
            Some(max) => max.successor().ok_or(RecordSetError::KeySpaceExhausted),
        }
    }

    /// Clears the set and re-inserts each record at keys `0, 1, 2, ...` in input order.
    pub fn replace_all<F>(
        &mut self,
        factory: &F,
        records: &[F::Record],
    ) -> Result<(), RecordSetError>
    where
        F: RecordFactory<Binding = B>,
    {
        let mut rebuilt = BTreeMap::new();
        for (idx, record) in records.iter().enumerate() {
            let key = u32::try_from(idx)
                .map(RecordKey)
                .map_err(|_| RecordSetError::KeySpaceExhausted)?;
            let mut binding = factory.new_empty_record();
            factory.populate_binding(&mut binding, record);
            rebuilt.insert(key, binding);
        }
        self.entries = rebuilt;
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = (RecordKey, &B)> {
        self.entries.iter().map(|(key, binding)| (*key, binding))
    }

    pub fn keys(&self) -> impl Iterator<Item = RecordKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn get(&self, key: RecordKey) -> Option<&B> {
        self.entries.get(&key)
    }

    pub fn get_mut(&mut self, key: RecordKey) -> Option<&mut B> {
        self.entries.get_mut(&key)
    }

    pub fn contains_key(&self, key: RecordKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
