//! Delimited row sink
//!
//! Dataset rows are `;`-separated with no quoting. Every write and
//! flush error is returned to the caller: a partial dataset must fail
//! the whole run rather than silently truncate the output.

use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use std::fs::File;
use std::path::Path;

/// Field separator for dataset rows.
pub const FIELD_SEPARATOR: u8 = b';';

/// Row-oriented file writer for the extraction datasets.
pub struct RowSink {
    writer: csv::Writer<File>,
}

impl RowSink {
    /// Create the output file, along with any missing parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory {}", parent.display())
                })?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create output file {}", path.display()))?;
        let writer = WriterBuilder::new()
            .delimiter(FIELD_SEPARATOR)
            .quote_style(QuoteStyle::Never)
            .from_writer(file);
        Ok(Self { writer })
    }

    /// Append one row of fields in the given order.
    pub fn write_row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(fields)
            .context("failed to write dataset row")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush dataset")
    }
}
