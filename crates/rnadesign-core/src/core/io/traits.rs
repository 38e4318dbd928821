use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Defines the interface for serializing an in-memory result into a file format.
///
/// Implementors handle the format-specific layout; the path helper takes care of
/// buffering.
pub trait OutputFile {
    /// The in-memory value this format renders.
    type Content: ?Sized;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Writes `content` to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(content: &Self::Content, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Writes `content` to a file path, creating or truncating the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(content: &Self::Content, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(content, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
