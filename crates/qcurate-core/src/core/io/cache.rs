use super::traits::DatasetFile;
use crate::core::models::ModelError;
use crate::core::models::collection::ResultCollection;
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Inconsistent collection: {0}")]
    Invalid(#[from] ModelError),
}

/// The JSON cache format: a [`ResultCollection`] serialized with two-space indentation.
///
/// Entry keys keep their document order across a read/write cycle. Records that no entry
/// references are dropped on read.
pub struct JsonCache;

impl DatasetFile for JsonCache {
    type Error = CacheError;

    fn read_from(reader: &mut impl BufRead) -> Result<ResultCollection, Self::Error> {
        let mut collection: ResultCollection = serde_json::from_reader(reader)?;
        collection.validate()?;
        collection.prune_records();
        debug!(
            results = collection.n_results(),
            molecules = collection.n_molecules(),
            "Read collection from JSON cache."
        );
        Ok(collection)
    }

    fn write_to(
        collection: &ResultCollection,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        serde_json::to_writer_pretty(&mut *writer, collection)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

pub fn load_collection(path: &Path) -> Result<ResultCollection, CacheError> {
    JsonCache::read_from_path(path)
}

pub fn save_collection(collection: &ResultCollection, path: &Path) -> Result<(), CacheError> {
    JsonCache::write_to_path(collection, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::collection::tests::entry;
    use crate::core::models::collection::CollectionKind;
    use crate::core::models::molecule::tests::water;
    use crate::core::models::record::{Record, RecordStatus};
    use std::fs;
    use tempfile::tempdir;

    fn collection() -> ResultCollection {
        let mut collection = ResultCollection::new(CollectionKind::Optimization);
        collection.add_entry(
            "zulu",
            entry(CollectionKind::Optimization, 2, "KEY-A"),
            Record::new(2, RecordStatus::Complete, water()),
        );
        collection.add_entry(
            "alpha",
            entry(CollectionKind::Optimization, 1, "KEY-A"),
            Record::new(1, RecordStatus::Error, water()),
        );
        collection
    }

    #[test]
    fn round_trip_preserves_content_and_key_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let original = collection();
        save_collection(&original, &path).unwrap();

        let loaded = load_collection(&path).unwrap();
        assert_eq!(loaded, original);
        let keys: Vec<_> = loaded.entries.keys().collect();
        assert_eq!(keys, vec!["zulu", "alpha"]);
    }

    #[test]
    fn written_json_is_indented_and_tagged() {
        let mut buffer = Vec::new();
        JsonCache::write_to(&collection(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("{\n  \"type\": \"OptimizationResultCollection\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let result = load_collection(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(CacheError::Io(_))));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_collection(&path), Err(CacheError::Json(_))));
    }

    #[test]
    fn dangling_entry_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dangling.json");
        let json = r#"{
            "type": "OptimizationResultCollection",
            "entries": {"a": [{"type": "optimization", "record_id": 7, "cmiles": "O"}]},
            "records": {}
        }"#;
        fs::write(&path, json).unwrap();
        assert!(matches!(
            load_collection(&path),
            Err(CacheError::Invalid(ModelError::MissingRecord(7)))
        ));
    }
}
