use crate::core::models::collection::ResultCollection;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A file format that stores a whole [`ResultCollection`].
pub trait DatasetFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a collection from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the parsed collection is inconsistent.
    fn read_from(reader: &mut impl BufRead) -> Result<ResultCollection, Self::Error>;

    /// Writes a collection to a writer.
    fn write_to(collection: &ResultCollection, writer: &mut impl Write)
    -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<ResultCollection, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn write_to_path<P: AsRef<Path>>(
        collection: &ResultCollection,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(collection, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
