use super::ModelError;
use super::record::Record;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The flavour of a result collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    #[serde(rename = "OptimizationResultCollection")]
    Optimization,
    #[serde(rename = "TorsionDriveResultCollection")]
    TorsionDrive,
}

impl CollectionKind {
    /// The dataset/record type name used by the archive REST API.
    pub fn archive_type(&self) -> &'static str {
        match self {
            Self::Optimization => "optimization",
            Self::TorsionDrive => "torsiondrive",
        }
    }

    pub fn entry_type(&self) -> EntryType {
        match self {
            Self::Optimization => EntryType::Optimization,
            Self::TorsionDrive => EntryType::Torsiondrive,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.archive_type())
    }
}

#[derive(Debug, Error)]
#[error("Invalid collection kind '{0}' (expected 'optimization' or 'torsiondrive')")]
pub struct ParseCollectionKindError(String);

impl FromStr for CollectionKind {
    type Err = ParseCollectionKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optimization" | "opt" => Ok(Self::Optimization),
            "torsiondrive" | "torsion-drive" | "td" => Ok(Self::TorsionDrive),
            _ => Err(ParseCollectionKindError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Optimization,
    Torsiondrive,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Optimization => "optimization",
            Self::Torsiondrive => "torsiondrive",
        })
    }
}

/// A dataset's reference to one record plus the identity of its molecule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub record_id: u64,
    pub cmiles: String,
    #[serde(default)]
    pub inchi_key: String,
}

impl Entry {
    /// The key used to group entries of the same molecule: the InChIKey when the archive
    /// supplied one, the CMILES otherwise.
    pub fn molecule_key(&self) -> &str {
        if self.inchi_key.is_empty() {
            &self.cmiles
        } else {
            &self.inchi_key
        }
    }
}

/// Dataset key to entries, kept in insertion (or document) order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryMap(Vec<(String, Vec<Entry>)>);

impl EntryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn first_key(&self) -> Option<&str> {
        self.0.first().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Vec<Entry>> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Vec<Entry>> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the entry list for `key`, appending an empty one at the end if absent.
    pub fn get_or_insert(&mut self, key: &str) -> &mut Vec<Entry> {
        let position = match self.0.iter().position(|(k, _)| k == key) {
            Some(position) => position,
            None => {
                self.0.push((key.to_string(), Vec::new()));
                self.0.len() - 1
            }
        };
        &mut self.0[position].1
    }

    /// Replaces the entries stored under `key`, keeping its position; new keys are appended.
    pub fn insert(&mut self, key: &str, entries: Vec<Entry>) {
        *self.get_or_insert(key) = entries;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Vec<Entry>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Vec<Entry>> {
        self.0.iter_mut().map(|(_, v)| v)
    }
}

impl Serialize for EntryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de> Deserialize<'de> for EntryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryMapVisitor;

        impl<'de> Visitor<'de> for EntryMapVisitor {
            type Value = EntryMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from dataset key to a list of entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EntryMap, A::Error> {
                let mut pairs: Vec<(String, Vec<Entry>)> = Vec::new();
                while let Some((key, entries)) = access.next_entry::<String, Vec<Entry>>()? {
                    if pairs.iter().any(|(k, _)| *k == key) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate dataset key '{key}'"
                        )));
                    }
                    pairs.push((key, entries));
                }
                Ok(EntryMap(pairs))
            }
        }

        deserializer.deserialize_map(EntryMapVisitor)
    }
}

/// A filter that has been applied to a collection, with the parameters it ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFilter {
    pub name: String,
    pub parameters: serde_json::Value,
}

/// A dataset of optimization or torsion-drive results together with every record its
/// entries reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultCollection {
    #[serde(rename = "type")]
    pub kind: CollectionKind,
    pub entries: EntryMap,
    #[serde(default)]
    records: BTreeMap<u64, Record>,
    #[serde(default)]
    pub provenance: Vec<AppliedFilter>,
}

impl ResultCollection {
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            entries: EntryMap::new(),
            records: BTreeMap::new(),
            provenance: Vec::new(),
        }
    }

    /// Adds an entry under `key` along with the record it points to.
    pub fn add_entry(&mut self, key: &str, entry: Entry, record: Record) {
        self.records.insert(record.id, record);
        self.entries.get_or_insert(key).push(entry);
    }

    pub fn record(&self, id: u64) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Every `(dataset key, entry)` pair in order.
    pub fn iter_entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries
            .iter()
            .flat_map(|(key, entries)| entries.iter().map(move |e| (key, e)))
    }

    pub fn n_results(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len()).sum()
    }

    pub fn n_molecules(&self) -> usize {
        self.iter_entries()
            .map(|(_, e)| e.molecule_key())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn record_ids(&self) -> BTreeSet<u64> {
        self.iter_entries().map(|(_, e)| e.record_id).collect()
    }

    /// Removes denylisted entries from the first dataset key only, returning the ids that
    /// were removed. Entries under any further key are left untouched.
    pub fn remove_denylisted(&mut self, denylist: &HashSet<u64>) -> Vec<u64> {
        let Some(key) = self.entries.first_key().map(str::to_string) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        if let Some(entries) = self.entries.get_mut(&key) {
            entries.retain(|entry| {
                let deny = denylist.contains(&entry.record_id);
                if deny {
                    removed.push(entry.record_id);
                }
                !deny
            });
        }
        self.prune_records();
        removed
    }

    /// Drops every entry (under any key) whose record id is in `record_ids`.
    pub fn remove_records(&mut self, record_ids: &BTreeSet<u64>) {
        for entries in self.entries.values_mut() {
            entries.retain(|entry| !record_ids.contains(&entry.record_id));
        }
        self.prune_records();
    }

    /// Removes records that no entry references any more.
    pub fn prune_records(&mut self) {
        let referenced = self.record_ids();
        self.records.retain(|id, _| referenced.contains(id));
    }

    /// Checks that every entry has a record of the right type and that every record is
    /// internally consistent.
    pub fn validate(&self) -> Result<(), ModelError> {
        let expected = self.kind.entry_type();
        for (_, entry) in self.iter_entries() {
            if entry.entry_type != expected {
                return Err(ModelError::EntryTypeMismatch {
                    record_id: entry.record_id,
                    expected: expected.to_string(),
                    found: entry.entry_type.to_string(),
                });
            }
            let record = self
                .records
                .get(&entry.record_id)
                .ok_or(ModelError::MissingRecord(entry.record_id))?;
            record.validate()?;
        }
        Ok(())
    }
}
