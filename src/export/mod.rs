//! CSV export of validated tables, one file per unit.

use crate::models::Table;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `{dir}/{table}_{unit}.csv`
pub fn csv_path(dir: &Path, table: &Table) -> PathBuf {
    dir.join(format!("{}_{}.csv", table.table_type, table.unit_id))
}

/// Write `unit_id` followed by the table's columns. Nulls are empty cells.
pub fn write_table_csv(dir: &Path, table: &Table) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Could not create dir {:?}", dir))?;
    let path = csv_path(dir, table);

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Could not open {:?} for writing", path))?;

    let mut header = vec!["unit_id"];
    header.extend(table.columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    for record in &table.records {
        let mut row = vec![table.unit_id.clone()];
        row.extend(
            table
                .columns
                .iter()
                .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }

    writer.flush()?;
    debug!("{} rows written to {:?}", table.len(), path);
    Ok(path)
}
