// 📦 Dataset Loader - CSV → in-memory inventory table
// Loaded once per process and shared read-only by every session

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One row of the frames inventory file
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InventoryRecord {
    #[serde(rename = "Brand")]
    pub brand: String,

    #[serde(rename = "Frame Type")]
    pub frame_type: String,

    #[serde(rename = "Inventory Count")]
    pub inventory_count: i64,

    #[serde(rename = "Price")]
    pub price: f64,
}

impl InventoryRecord {
    pub fn new(brand: &str, frame_type: &str, inventory_count: i64, price: f64) -> Self {
        Self {
            brand: brand.to_string(),
            frame_type: frame_type.to_string(),
            inventory_count,
            price,
        }
    }
}

/// Sum of any number of `i64` counts. Wide enough that adding up a table
/// can never overflow.
pub type InventoryTotal = i128;

/// Ordered, read-only sequence of records
///
/// Duplicated rows are allowed; nothing here enforces uniqueness.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryTable {
    records: Vec<InventoryRecord>,
}

impl InventoryTable {
    pub fn new(records: Vec<InventoryRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InventoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of `inventory_count` over every record
    pub fn total_inventory(&self) -> InventoryTotal {
        self.records
            .iter()
            .map(|r| InventoryTotal::from(r.inventory_count))
            .sum()
    }
}

impl FromIterator<InventoryRecord> for InventoryTable {
    fn from_iter<I: IntoIterator<Item = InventoryRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a InventoryTable {
    type Item = &'a InventoryRecord;
    type IntoIter = std::slice::Iter<'a, InventoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Read the whole CSV into memory. Any bad row is fatal.
pub fn load_csv(csv_path: &Path) -> Result<InventoryTable> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open inventory file {}", csv_path.display()))?;

    let mut records = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        // +2: header line, 1-based
        let record: InventoryRecord = result.with_context(|| {
            format!(
                "Failed to parse {} at line {}",
                csv_path.display(),
                index + 2
            )
        })?;
        records.push(record);
    }

    info!(path = %csv_path.display(), rows = records.len(), "inventory loaded");

    Ok(InventoryTable::new(records))
}

static SHARED_TABLE: OnceCell<InventoryTable> = OnceCell::new();

/// Process-wide cached table. The first successful load wins; later calls
/// return the same table regardless of `csv_path`. Failures are not cached.
pub fn shared_table(csv_path: &Path) -> Result<&'static InventoryTable> {
    SHARED_TABLE.get_or_try_init(|| load_csv(csv_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv_reads_all_rows() {
        let file = write_csv(
            "Brand,Frame Type,Inventory Count,Price\n\
             Acme,Round,10,50.00\n\
             Acme,Square,5,60.00\n\
             Zeta,Round,3,40.00\n",
        );

        let table = load_csv(file.path()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[0], InventoryRecord::new("Acme", "Round", 10, 50.0));
        assert_eq!(table.records()[2].brand, "Zeta");
        assert_eq!(table.total_inventory(), 18);
    }

    #[test]
    fn test_total_inventory_does_not_overflow() {
        let table = InventoryTable::new(vec![
            InventoryRecord::new("Acme", "Round", i64::MAX, 1.0),
            InventoryRecord::new("Acme", "Round", 1, 1.0),
        ]);

        assert_eq!(table.total_inventory(), i128::from(i64::MAX) + 1);
    }

    #[test]
    fn test_load_csv_keeps_empty_categories() {
        let file = write_csv(
            "Brand,Frame Type,Inventory Count,Price\n\
             ,Round,4,20.00\n\
             Acme,,6,30.00\n",
        );

        let table = load_csv(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].brand, "");
        assert_eq!(table.records()[1].frame_type, "");
    }

    #[test]
    fn test_load_csv_rejects_malformed_row() {
        let file = write_csv(
            "Brand,Frame Type,Inventory Count,Price\n\
             Acme,Round,lots,50.00\n",
        );

        let err = load_csv(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_load_csv_missing_file_is_fatal() {
        let result = load_csv(Path::new("/definitely/not/here.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_shared_table_loads_once() {
        let file = write_csv(
            "Brand,Frame Type,Inventory Count,Price\n\
             Acme,Round,1,10.00\n",
        );

        let first = shared_table(file.path()).unwrap();
        let second = shared_table(Path::new("/ignored/after/first/load.csv")).unwrap();

        assert!(std::ptr::eq(first, second));
    }
}
