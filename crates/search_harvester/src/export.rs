use std::path::{Path, PathBuf};

use crate::filename::csv_filename;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::record::NormalizedRecord;

/// Byte order mark; spreadsheet tools use it to detect UTF-8.
const UTF8_BOM: &str = "\u{feff}";

pub const CSV_COLUMNS: [&str; 5] = ["pub_date", "title", "author", "snippet", "web_url"];

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub primary_filename: String,
    pub secondary_filename: String,
}

impl ExportOptions {
    /// `{stem}.csv` and `{stem}_{secondary_label}.csv`.
    pub fn with_stem(stem: &str, secondary_label: &str) -> Self {
        Self {
            primary_filename: csv_filename(stem),
            secondary_filename: csv_filename(&format!("{stem}_{secondary_label}")),
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::with_stem("records", "sentinel")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub primary_count: usize,
    pub secondary_count: usize,
    pub primary_path: PathBuf,
    pub secondary_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Render records as CSV: BOM, header `pub_date,title,author,snippet,web_url`,
/// one row per record. A missing author is an empty field.
pub fn render_csv(records: &[NormalizedRecord]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = UTF8_BOM.as_bytes().to_vec();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buffer);
        writer.write_record(CSV_COLUMNS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

pub fn write_records_csv(
    output_dir: &Path,
    filename: &str,
    records: &[NormalizedRecord],
) -> Result<PathBuf, ExportError> {
    let content = render_csv(records)?;
    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    Ok(writer.write(filename, content)?)
}

/// One CSV per partition, both written even when empty.
pub fn export_partitions(
    output_dir: &Path,
    options: &ExportOptions,
    primary: &[NormalizedRecord],
    secondary: &[NormalizedRecord],
) -> Result<ExportSummary, ExportError> {
    let primary_path = write_records_csv(output_dir, &options.primary_filename, primary)?;
    let secondary_path = write_records_csv(output_dir, &options.secondary_filename, secondary)?;
    Ok(ExportSummary {
        primary_count: primary.len(),
        secondary_count: secondary.len(),
        primary_path,
        secondary_path,
    })
}
