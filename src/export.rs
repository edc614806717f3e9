use crate::types::TableSlice;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs;
use std::path::Path;

/// Serializes a table slice as CSV: header row first, empty cells for
/// missing rates.
pub fn table_to_csv(slice: &TableSlice) -> Result<Vec<u8>> {
    let mut wtr = Writer::from_writer(Vec::new());
    wtr.write_record(slice.headers())?;

    for row in &slice.rows {
        let mut fields = Vec::with_capacity(2 + row.values.len());
        fields.push(row.name.clone());
        fields.push(row.code.clone());
        fields.extend(
            row.values
                .iter()
                .map(|v| v.map(|rate| rate.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&fields)?;
    }

    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e.error()))
}

pub fn write_table_csv(slice: &TableSlice, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export directory: {:?}", parent))?;
    }
    let bytes = table_to_csv(slice)?;
    fs::write(path, bytes).with_context(|| format!("Failed to write CSV export: {:?}", path))?;
    Ok(())
}
