use crate::storage::Storage;
use anyhow::{Context, Result};
use polars::prelude::*;

/// Encode a report to parquet in memory and upsert it by name into the
/// target folder: an existing file is overwritten in place (identifier
/// unchanged), otherwise a new one is created. The same logical output name
/// therefore maps to a stable identifier across runs.
pub fn save_report<S: Storage>(
    storage: &S,
    mut report: DataFrame,
    folder_id: &str,
    file_name: &str,
) -> Result<String> {
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut report)
        .with_context(|| format!("failed to encode {}", file_name))?;

    match storage.find_by_name(file_name, folder_id)? {
        Some(file_id) => {
            println!("  ♻️  {} exists, updating in place", file_name);
            storage.overwrite(&file_id, &buf)
        }
        None => {
            println!("  📦 {} not found, creating", file_name);
            storage.create(file_name, folder_id, &buf)
        }
    }
}
